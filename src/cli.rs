//! Command-line interface.
//!
//! Two ways to define backends: a single gateway from flags, or a list
//! from a TOML file. The rules that tie the flags together live in
//! [`Cli::config_source`] so they can be tested without a process.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{BridgeConfig, ConfigError, GatewayConfig};
use crate::observability::logging::LOG_LEVELS;

/// Config file looked up in the working directory when no source is given.
pub const DEFAULT_CONFIG_FILE: &str = "gateway-bridge.toml";

/// Serve REST API Gateway resources on a local HTTP listener.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "gateway-bridge", version)]
pub struct Cli {
    /// TOML file listing the gateways to serve.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Credentials profile used for the gateway.
    #[arg(long)]
    pub profile_name: Option<String>,

    /// ID of the REST API to serve.
    #[arg(long)]
    pub rest_api_id: Option<String>,

    /// Region the REST API lives in.
    #[arg(long)]
    pub region: Option<String>,

    /// Stage whose variables are passed to the backend; also prefixes paths.
    #[arg(long)]
    pub stage_name: Option<String>,

    /// Log level.
    #[arg(long, value_parser = LOG_LEVELS)]
    pub log_level: Option<String>,

    /// Address to listen on, as `host:port` (`:8080` listens on all interfaces).
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Rebuild the route table when the config file changes.
    #[arg(long)]
    pub watch: bool,
}

/// Where the gateway definitions come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Flags(GatewayConfig),
    File(PathBuf),
}

impl Cli {
    /// Check flag combinations and pick the definition source.
    pub fn config_source(&self, cwd: &Path) -> Result<ConfigSource, ConfigError> {
        let definition_flags = self.rest_api_id.is_some()
            || self.profile_name.is_some()
            || self.region.is_some()
            || self.stage_name.is_some();

        if let Some(path) = &self.config {
            if definition_flags {
                return Err(ConfigError::Arguments(
                    "--config can't be combined with --rest-api-id, --profile-name, --region or --stage-name"
                        .to_string(),
                ));
            }
            return Ok(ConfigSource::File(path.clone()));
        }

        if self.profile_name.is_some() && (self.region.is_none() || self.rest_api_id.is_none()) {
            return Err(ConfigError::Arguments(
                "--profile-name requires --region and --rest-api-id".to_string(),
            ));
        }
        if self.region.is_some() && self.rest_api_id.is_none() {
            return Err(ConfigError::Arguments("--region requires --rest-api-id".to_string()));
        }
        if self.stage_name.is_some() && self.rest_api_id.is_none() {
            return Err(ConfigError::Arguments(
                "--stage-name requires --rest-api-id".to_string(),
            ));
        }

        match &self.rest_api_id {
            Some(id) => Ok(ConfigSource::Flags(GatewayConfig {
                rest_api_id: id.clone(),
                profile_name: self.profile_name.clone(),
                region: self.region.clone(),
                stage_name: self.stage_name.clone(),
            })),
            None => Ok(ConfigSource::File(cwd.join(DEFAULT_CONFIG_FILE))),
        }
    }

    /// `--listen-address` normalized to a bindable `host:port`.
    pub fn listen_address(&self) -> Result<Option<String>, ConfigError> {
        self.listen_address
            .as_deref()
            .map(normalize_listen_address)
            .transpose()
    }

    /// Apply `--listen-address` and `--log-level` on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut BridgeConfig) -> Result<(), ConfigError> {
        if let Some(address) = self.listen_address()? {
            config.listener.bind_address = address;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        Ok(())
    }
}

fn normalize_listen_address(raw: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::Arguments(format!("--listen-address must be host:port, got {raw:?}"));

    let (host, port) = raw.rsplit_once(':').ok_or_else(invalid)?;
    port.parse::<u16>().map_err(|_| invalid())?;

    // IPv6 hosts need brackets, as in `[::1]:8080`.
    let well_formed = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(inner) => !inner.is_empty() && !inner.contains(['[', ']']),
        None => !host.contains([':', '[', ']']),
    };
    if !well_formed {
        return Err(invalid());
    }

    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok(format!("{host}:{port}"))
}
