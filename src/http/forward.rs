//! Request forwarding through the remote test-invoke call.
//!
//! # Responsibilities
//! - Buffer the inbound body (the invoke call needs it whole), 413 past the limit
//! - Translate request parts into an [`Invocation`]
//! - Translate the [`InvocationResult`] back into an HTTP response
//!
//! # Design Decisions
//! - The stage prefix is removed before the path reaches the remote API
//! - Every header value is forwarded, repeated names included
//! - Framing headers from the remote are dropped; hyper re-frames the body
//! - Dropping the handler future (client gone) drops the outbound call

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    response::Response,
};

use http_body_util::LengthLimitError;

use crate::http::response::ProxyError;
use crate::remote::{Invocation, InvocationResult, MultiValueHeaders, RemoteDescriptor};
use crate::routing::{normalize_path, Route, RouteEntry};

/// Forward a matched request and build the client response.
pub async fn forward(
    descriptor: &dyn RemoteDescriptor,
    route: &Route,
    request: Request<Body>,
    max_body_bytes: usize,
) -> Result<Response, ProxyError> {
    let entry = &route.entry;
    let (parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > max_body_bytes) {
        return Err(ProxyError::BodyTooLarge {
            limit: max_body_bytes,
        });
    }
    let body = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(|e| {
            if exceeds_limit(&e) {
                ProxyError::BodyTooLarge {
                    limit: max_body_bytes,
                }
            } else {
                ProxyError::BodyRead(e.to_string())
            }
        })?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        if let Some(params) = route.template.captures(normalize_path(parts.uri.path())) {
            if !params.is_empty() {
                tracing::debug!(resource_id = %entry.resource_id, params = ?params, "Path parameters bound");
            }
        }
    }

    let invocation = build_invocation(entry, &parts, body);
    let result = descriptor
        .invoke(&entry.context, invocation)
        .await
        .map_err(ProxyError::Upstream)?;

    into_response(result)
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Build the invoke call for a request matched by `entry`.
pub fn build_invocation(entry: &RouteEntry, parts: &Parts, body: Bytes) -> Invocation {
    let path = entry.upstream_path(parts.uri.path());
    let path_with_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    Invocation {
        resource_id: entry.resource_id.clone(),
        rest_api_id: entry.rest_api_id.clone(),
        method: parts.method.as_str().to_string(),
        path_with_query,
        body,
        headers: header_multimap(&parts.headers),
        stage_variables: entry.stage_variables.clone(),
    }
}

/// Collect every header value under its name, preserving order.
pub fn header_multimap(headers: &HeaderMap) -> MultiValueHeaders {
    let mut map = MultiValueHeaders::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    map
}

fn is_framing(name: &HeaderName) -> bool {
    name == header::CONTENT_LENGTH || name == header::TRANSFER_ENCODING || name == header::CONNECTION
}

/// Stage headers, then body, then status into one response value.
pub fn into_response(result: InvocationResult) -> Result<Response, ProxyError> {
    let mut headers = HeaderMap::new();
    for (name, values) in &result.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProxyError::ResponseCopy(format!("header name {name:?}: {e}")))?;
        if is_framing(&name) {
            continue;
        }
        for value in values {
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProxyError::ResponseCopy(format!("header {name}: {e}")))?;
            headers.append(name.clone(), value);
        }
    }

    let mut response = Response::new(Body::from(result.body));
    *response.headers_mut() = headers;
    *response.status_mut() = StatusCode::from_u16(result.status)
        .map_err(|_| ProxyError::ResponseCopy(format!("invalid status {}", result.status)))?;

    Ok(response)
}
