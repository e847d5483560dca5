//! HTTP/JSON client for the REST API Gateway management API.
//!
//! # Endpoints
//! ```text
//! GET  /restapis/{id}/resources?limit=500[&position=P]   → resource pages
//! GET  /restapis/{id}/stages/{stage}                      → stage variables
//! POST /restapis/{id}/resources/{rid}/methods/{METHOD}    → test invoke
//! GET  /identity                                          → caller identity
//! ```
//!
//! # Design Decisions
//! - One pooled `reqwest::Client` shared by every gateway
//! - Resource pages are followed until the remote stops returning a cursor
//! - Non-2xx answers keep the remote's body text for the error message

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{GatewayConfig, RemoteConfig, TimeoutConfig};
use crate::remote::descriptor::{
    ConnectionContext, DescriptorError, Identity, Invocation, InvocationResult,
    MultiValueHeaders, RemoteDescriptor, Resource, Variant,
};

/// Header carrying the credential profile a call is made under.
pub const PROFILE_HEADER: &str = "x-bridge-profile";

/// Page size requested when listing resources.
const PAGE_LIMIT: &str = "500";

/// [`RemoteDescriptor`] backed by the management API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDescriptor {
    client: reqwest::Client,
    remote: RemoteConfig,
    token: Option<String>,
}

impl HttpDescriptor {
    pub fn new(remote: &RemoteConfig, timeouts: &TimeoutConfig) -> Result<Self, DescriptorError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .build()?;

        Ok(Self {
            client,
            remote: remote.clone(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every call.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn url(ctx: &ConnectionContext, segments: &[&str]) -> Result<Url, DescriptorError> {
        let mut url = ctx.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| DescriptorError::InvalidEndpoint(ctx.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn headers(&self, ctx: &ConnectionContext) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(profile) = ctx.profile.as_deref() {
            if let Ok(value) = HeaderValue::from_str(profile) {
                headers.insert(PROFILE_HEADER, value);
            }
        }
        if let Some(token) = self.token.as_deref() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &ConnectionContext,
        url: Url,
    ) -> Result<T, DescriptorError> {
        let response = self.client.get(url).headers(self.headers(ctx)).send().await?;
        Ok(expect_success(response).await?.json().await?)
    }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, DescriptorError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DescriptorError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourcesPage {
    #[serde(default)]
    items: Vec<WireResource>,
    position: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResource {
    id: String,
    path: String,
    #[serde(default)]
    resource_methods: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStage {
    stage_name: Option<String>,
    #[serde(default)]
    variables: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireInvokeRequest<'a> {
    path_with_query_string: &'a str,
    body: String,
    multi_value_headers: &'a MultiValueHeaders,
    stage_variables: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInvokeResponse {
    status: u16,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    multi_value_headers: Option<MultiValueHeaders>,
}

impl WireInvokeResponse {
    /// Multi-value headers win; single-value headers only fill names the
    /// multi-value map doesn't carry.
    fn into_result(self) -> InvocationResult {
        let mut headers = self.multi_value_headers.unwrap_or_default();
        for (name, value) in self.headers.unwrap_or_default() {
            let present = headers.keys().any(|existing| existing.eq_ignore_ascii_case(&name));
            if !present {
                headers.insert(name, vec![value]);
            }
        }
        InvocationResult {
            status: self.status,
            headers,
            body: Bytes::from(self.body.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireIdentity {
    account: String,
    arn: String,
}

#[async_trait]
impl RemoteDescriptor for HttpDescriptor {
    async fn connect(&self, gateway: &GatewayConfig) -> Result<ConnectionContext, DescriptorError> {
        let region = gateway
            .region
            .clone()
            .unwrap_or_else(|| self.remote.default_region.clone());
        let endpoint = self
            .remote
            .endpoint_for(&region)
            .map_err(|e| DescriptorError::InvalidEndpoint(format!("{}: {e}", self.remote.endpoint)))?;
        if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
            return Err(DescriptorError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(ConnectionContext {
            profile: gateway.profile_name.clone(),
            region,
            endpoint,
        })
    }

    async fn list_resources(
        &self,
        ctx: &ConnectionContext,
        rest_api_id: &str,
    ) -> Result<Vec<Resource>, DescriptorError> {
        let mut resources = Vec::new();
        let mut position: Option<String> = None;

        loop {
            let mut url = Self::url(ctx, &["restapis", rest_api_id, "resources"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("limit", PAGE_LIMIT);
                if let Some(position) = position.as_deref() {
                    query.append_pair("position", position);
                }
            }

            let page: ResourcesPage = self.get_json(ctx, url).await?;
            tracing::debug!(
                rest_api_id,
                items = page.items.len(),
                more = page.position.is_some(),
                "Fetched resource page"
            );

            resources.extend(page.items.into_iter().map(|item| Resource {
                id: item.id,
                path: item.path,
                methods: item
                    .resource_methods
                    .map(|methods| methods.into_keys().collect())
                    .unwrap_or_else(BTreeSet::new),
            }));

            match page.position {
                Some(next) if Some(&next) != position.as_ref() => position = Some(next),
                Some(_) => {
                    return Err(DescriptorError::Decode(
                        "resource listing returned the same page cursor twice".to_string(),
                    ))
                }
                None => break,
            }
        }

        Ok(resources)
    }

    async fn describe_variant(
        &self,
        ctx: &ConnectionContext,
        rest_api_id: &str,
        stage: &str,
    ) -> Result<Variant, DescriptorError> {
        let url = Self::url(ctx, &["restapis", rest_api_id, "stages", stage])?;
        let wire: WireStage = self.get_json(ctx, url).await?;

        Ok(Variant {
            name: wire.stage_name.unwrap_or_else(|| stage.to_string()),
            variables: wire.variables.unwrap_or_default(),
        })
    }

    async fn invoke(
        &self,
        ctx: &ConnectionContext,
        invocation: Invocation,
    ) -> Result<InvocationResult, DescriptorError> {
        let url = Self::url(
            ctx,
            &[
                "restapis",
                &invocation.rest_api_id,
                "resources",
                &invocation.resource_id,
                "methods",
                &invocation.method,
            ],
        )?;
        let request = WireInvokeRequest {
            path_with_query_string: &invocation.path_with_query,
            body: String::from_utf8_lossy(&invocation.body).into_owned(),
            multi_value_headers: &invocation.headers,
            stage_variables: &invocation.stage_variables,
        };

        let response = self
            .client
            .post(url)
            .headers(self.headers(ctx))
            .json(&request)
            .send()
            .await?;
        let wire: WireInvokeResponse = expect_success(response).await?.json().await?;

        Ok(wire.into_result())
    }

    async fn identity(&self, ctx: &ConnectionContext) -> Result<Identity, DescriptorError> {
        let url = Self::url(ctx, &["identity"])?;
        let wire: WireIdentity = self.get_json(ctx, url).await?;

        Ok(Identity {
            account_id: wire.account,
            principal: wire.arn,
        })
    }
}
