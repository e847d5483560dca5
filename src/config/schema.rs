//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use url::Url;

/// Placeholder substituted with the gateway region in [`RemoteConfig::endpoint`].
pub const REGION_PLACEHOLDER: &str = "{region}";

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Remote management API settings.
    pub remote: RemoteConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Startup and shutdown settings.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Remote API definitions whose resources make up the route table.
    pub gateways: Vec<GatewayConfig>,
}

impl BridgeConfig {
    /// Configuration built around a single gateway definition, everything
    /// else left at its default.
    pub fn single(gateway: GatewayConfig) -> Self {
        Self {
            gateways: vec![gateway],
            ..Self::default()
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Where the management and test-invoke API lives.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the management API. `{region}` is replaced by the
    /// gateway's region.
    pub endpoint: String,

    /// Region used for gateways that don't name one.
    pub default_region: String,
}

impl RemoteConfig {
    /// Resolve the endpoint for a region.
    pub fn endpoint_for(&self, region: &str) -> Result<Url, url::ParseError> {
        Url::parse(&self.endpoint.replace(REGION_PLACEHOLDER, region))
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://apigateway.{region}.amazonaws.com".to_string(),
            default_region: "us-east-1".to_string(),
        }
    }
}

/// One remote API definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Identifier of the remote API.
    pub rest_api_id: String,

    /// Credential profile used to reach it.
    #[serde(default)]
    pub profile_name: Option<String>,

    /// Region the API is deployed in.
    #[serde(default)]
    pub region: Option<String>,

    /// Stage whose name prefixes every path and whose variables are
    /// passed along with each call.
    #[serde(default)]
    pub stage_name: Option<String>,
}

impl GatewayConfig {
    pub fn new(rest_api_id: impl Into<String>) -> Self {
        Self {
            rest_api_id: rest_api_id.into(),
            profile_name: None,
            region: None,
            stage_name: None,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout to the remote API in seconds.
    pub connect_secs: u64,

    /// Timeout for a single remote call in seconds.
    pub upstream_secs: u64,

    /// Total time allowed for an inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 29,
            request_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB, the test-invoke payload cap
        }
    }
}

/// Startup and shutdown settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long in-flight requests may run after shutdown starts.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
