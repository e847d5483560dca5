//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Build the initial route table
//! - Start the config watcher and signal handler
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing is served
//! - Subsystems initialize in order, not concurrently
//! - Listener starts last (traffic only when the table is ready)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwap;
use tokio::net::TcpListener;

use crate::cli::{Cli, ConfigSource};
use crate::config::validation::validate_config;
use crate::config::watcher::ConfigWatcher;
use crate::config::{load_config, BridgeConfig, ConfigError};
use crate::http::{AppState, HttpServer, SharedRoutes};
use crate::lifecycle::reload::RouteReloader;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::observability::{logging, metrics, report};
use crate::remote::{HttpDescriptor, RemoteDescriptor};
use crate::routing::RouteTableBuilder;

/// Environment variable holding the bearer token for the management API.
pub const TOKEN_ENV: &str = "GATEWAY_BRIDGE_TOKEN";

/// Resolved configuration and the file it came from, if any.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: BridgeConfig,
    pub path: Option<PathBuf>,
}

/// Resolve the definition source, load it and apply flag overrides.
pub fn load(cli: &Cli, cwd: &Path) -> Result<LoadedConfig, ConfigError> {
    let (mut config, path) = match cli.config_source(cwd)? {
        ConfigSource::Flags(gateway) => {
            let config = BridgeConfig::single(gateway);
            validate_config(&config).map_err(ConfigError::Validation)?;
            (config, None)
        }
        ConfigSource::File(path) => (load_config(&path)?, Some(path)),
    };
    cli.apply_overrides(&mut config)?;
    Ok(LoadedConfig { config, path })
}

/// Run the bridge until a stop signal arrives.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("couldn't determine working directory")?;
    let LoadedConfig { config, path } = load(&cli, &cwd)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        gateways = config.gateways.len(),
        source = %path.as_deref().map_or_else(|| "flags".into(), |p| p.display().to_string()),
        "gateway-bridge starting"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .with_context(|| format!("invalid metrics address {}", config.observability.metrics_address))?;
        metrics::init_metrics(addr).context("couldn't start metrics exporter")?;
    }

    let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
    let descriptor: Arc<dyn RemoteDescriptor> = Arc::new(
        HttpDescriptor::new(&config.remote, &config.timeouts)?.with_token(token),
    );

    let builder = RouteTableBuilder::new(descriptor.clone());
    let table = builder.build(&config.gateways).await?;
    metrics::record_table(table.len());
    report::log_route_summary(&table, descriptor.as_ref()).await;
    let routes: SharedRoutes = Arc::new(ArcSwap::from_pointee(table));

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .with_context(|| format!("couldn't bind {}", config.listener.bind_address))?;

    let shutdown = Shutdown::new();

    // Kept alive until run returns.
    let _watcher = match (&path, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run().context("couldn't watch config file")?;
            let reloader = RouteReloader::new(builder, routes.clone(), config.gateways.clone());
            tokio::spawn(reloader.run(updates, shutdown.subscribe()));
            Some(handle)
        }
        (None, true) => {
            tracing::warn!("--watch has no effect without a config file");
            None
        }
        _ => None,
    };

    spawn_signal_handler(shutdown.clone());

    let state = AppState::new(routes, descriptor, config.limits.clone());
    let server = HttpServer::new(state, &config.timeouts);
    server
        .run(
            listener,
            shutdown.subscribe(),
            Duration::from_secs(config.lifecycle.shutdown_grace_secs),
        )
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["gateway-bridge"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_produce_single_gateway() {
        let loaded = load(&cli(&["--rest-api-id", "abc", "--stage-name", "v1"]), Path::new("/nowhere")).unwrap();
        assert!(loaded.path.is_none());
        assert_eq!(loaded.config.gateways.len(), 1);
        assert_eq!(loaded.config.gateways[0].stage_name.as_deref(), Some("v1"));
    }

    #[test]
    fn flag_definition_is_validated() {
        let err = load(&cli(&["--rest-api-id", "a/b"]), Path::new("/nowhere")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn default_file_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("gateway-bridge.toml")).unwrap();
        file.write_all(b"[[gateways]]\nrest_api_id = \"abc\"\n").unwrap();

        let loaded = load(&cli(&["--listen-address", ":7000"]), dir.path()).unwrap();
        assert_eq!(loaded.path, Some(dir.path().join("gateway-bridge.toml")));
        assert_eq!(loaded.config.gateways[0].rest_api_id, "abc");
        assert_eq!(loaded.config.listener.bind_address, "0.0.0.0:7000");
    }

    #[test]
    fn missing_default_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&cli(&[]), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
