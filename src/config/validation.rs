//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Detect contradictory gateway definitions
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use crate::config::schema::{BridgeConfig, GatewayConfig, REGION_PLACEHOLDER};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.gateways.is_empty() {
        errors.push(ValidationError::new("gateways", "at least one gateway is required"));
    }

    let mut seen = HashSet::new();
    for (index, gateway) in config.gateways.iter().enumerate() {
        validate_gateway(index, gateway, &mut errors);

        let key = (&gateway.rest_api_id, &gateway.stage_name, &gateway.region);
        if !seen.insert(key) {
            errors.push(ValidationError::new(
                format!("gateways[{index}]"),
                format!("rest API {} is configured more than once", gateway.rest_api_id),
            ));
        }
    }

    let region = &config.remote.default_region;
    if region.is_empty() {
        errors.push(ValidationError::new("remote.default_region", "must not be empty"));
    }
    match config.remote.endpoint_for(region) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "remote.endpoint",
            format!("unsupported scheme {}", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "remote.endpoint",
            format!("not a valid URL after substituting {REGION_PLACEHOLDER}: {e}"),
        )),
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::new("timeouts.upstream_secs", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }
    if config.lifecycle.shutdown_grace_secs == 0 {
        errors.push(ValidationError::new(
            "lifecycle.shutdown_grace_secs",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_gateway(index: usize, gateway: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let field = |name: &str| format!("gateways[{index}].{name}");

    if gateway.rest_api_id.is_empty() {
        errors.push(ValidationError::new(field("rest_api_id"), "must not be empty"));
    } else if gateway.rest_api_id.contains('/') {
        errors.push(ValidationError::new(field("rest_api_id"), "must not contain '/'"));
    }

    if gateway.profile_name.as_deref() == Some("") {
        errors.push(ValidationError::new(field("profile_name"), "must not be empty when set"));
    }
    if gateway.region.as_deref() == Some("") {
        errors.push(ValidationError::new(field("region"), "must not be empty when set"));
    }
    match gateway.stage_name.as_deref() {
        Some("") => errors.push(ValidationError::new(field("stage_name"), "must not be empty when set")),
        Some(stage) if stage.contains('/') => {
            errors.push(ValidationError::new(field("stage_name"), "must not contain '/'"))
        }
        _ => {}
    }
}
