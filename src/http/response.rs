//! Error responses.
//!
//! # Responsibilities
//! - Map every request-time failure to a status code
//! - Render a uniform JSON error body
//!
//! # Design Decisions
//! - No route → 404, wrong method → 405 with `Allow`
//! - Remote failures → 502 with the remote error text
//! - Nothing partial: an error replaces the whole response

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::remote::DescriptorError;
use crate::routing::RouteError;

/// Prefix on every error message produced by the bridge itself.
pub const ERROR_PREFIX: &str = "Raised from gateway-bridge";

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("Handler not found for {path}")]
    NotFound { path: String },

    #[error("Method {method} not supported for {path}")]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<String>,
    },

    #[error("Error reading request body: {0}")]
    BodyRead(String),

    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Error calling remote API: {0}")]
    Upstream(#[source] DescriptorError),

    #[error("Error copying response: {0}")]
    ResponseCopy(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::NotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Upstream(_) | ProxyError::ResponseCopy(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable name, used in the body and in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::NotFound { .. } => "route_not_found",
            ProxyError::MethodNotAllowed { .. } => "method_not_allowed",
            ProxyError::BodyRead(_) => "body_read",
            ProxyError::BodyTooLarge { .. } => "body_too_large",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::ResponseCopy(_) => "response_copy",
        }
    }
}

impl From<RouteError> for ProxyError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::NotFound { path } => ProxyError::NotFound { path },
            RouteError::MethodNotAllowed {
                method,
                path,
                allowed,
            } => ProxyError::MethodNotAllowed {
                method,
                path,
                allowed,
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": format!("{ERROR_PREFIX}: {self}"),
            }
        });
        let mut response = (self.status_code(), Json(body)).into_response();

        if let ProxyError::MethodNotAllowed { allowed, .. } = &self {
            if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                response.headers_mut().insert(header::ALLOW, value);
            }
        }
        response
    }
}
