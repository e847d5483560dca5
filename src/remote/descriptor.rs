//! The remote API seam consumed by the route builder and the forwarder.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use axum::body::Bytes;
use url::Url;

use crate::config::GatewayConfig;

/// Header name → every value sent under that name, in order.
pub type MultiValueHeaders = BTreeMap<String, Vec<String>>;

/// Everything needed to talk to the remote API on behalf of one gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionContext {
    pub profile: Option<String>,
    pub region: String,
    pub endpoint: Url,
}

/// One resource of a remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub path: String,
    pub methods: BTreeSet<String>,
}

/// A named stage of a remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub variables: BTreeMap<String, String>,
}

/// A test-invoke call against one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub resource_id: String,
    pub rest_api_id: String,
    pub method: String,
    pub path_with_query: String,
    pub body: Bytes,
    pub headers: MultiValueHeaders,
    pub stage_variables: BTreeMap<String, String>,
}

/// The HTTP-shaped outcome of an [`Invocation`].
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub status: u16,
    pub headers: MultiValueHeaders,
    pub body: Bytes,
}

/// Who the remote API sees us as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: String,
    pub principal: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("invalid remote endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("remote request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed remote response: {0}")]
    Decode(String),
}

/// Access to the remote API definitions and their invocation endpoint.
#[async_trait]
pub trait RemoteDescriptor: Send + Sync {
    /// Resolve the connection context for a gateway definition.
    async fn connect(&self, gateway: &GatewayConfig) -> Result<ConnectionContext, DescriptorError>;

    /// List every resource of a remote API.
    async fn list_resources(
        &self,
        ctx: &ConnectionContext,
        rest_api_id: &str,
    ) -> Result<Vec<Resource>, DescriptorError>;

    /// Describe a stage of a remote API.
    async fn describe_variant(
        &self,
        ctx: &ConnectionContext,
        rest_api_id: &str,
        stage: &str,
    ) -> Result<Variant, DescriptorError>;

    /// Execute a method against a resource and return the full response.
    async fn invoke(
        &self,
        ctx: &ConnectionContext,
        invocation: Invocation,
    ) -> Result<InvocationResult, DescriptorError>;

    /// Look up the caller identity for a context.
    async fn identity(&self, ctx: &ConnectionContext) -> Result<Identity, DescriptorError>;
}
