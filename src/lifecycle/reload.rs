//! Route table hot reload.
//!
//! # Data Flow
//! ```text
//! ConfigWatcher → BridgeConfig
//!     → gateways unchanged? skip
//!     → RouteTableBuilder::build
//!         Ok  → ArcSwap::store (new requests see the new table)
//!         Err → log, keep the current table
//! ```
//!
//! In-flight requests keep the snapshot they loaded. Only the gateway list
//! is reloadable; listener, timeouts and limits need a restart.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::{BridgeConfig, GatewayConfig};
use crate::http::SharedRoutes;
use crate::observability::metrics;
use crate::routing::{BuildError, RouteTableBuilder};

pub struct RouteReloader {
    builder: RouteTableBuilder,
    routes: SharedRoutes,
    gateways: Vec<GatewayConfig>,
}

impl RouteReloader {
    pub fn new(builder: RouteTableBuilder, routes: SharedRoutes, gateways: Vec<GatewayConfig>) -> Self {
        Self {
            builder,
            routes,
            gateways,
        }
    }

    /// Rebuild from `config` and swap the table in on success.
    ///
    /// Returns the number of routes now active. A failed build leaves the
    /// current table and gateway list untouched.
    pub async fn apply(&mut self, config: &BridgeConfig) -> Result<usize, BuildError> {
        if config.gateways == self.gateways {
            tracing::debug!("Gateway list unchanged, skipping rebuild");
            return Ok(self.routes.load().len());
        }

        match self.builder.build(&config.gateways).await {
            Ok(table) => {
                let count = table.len();
                self.routes.store(Arc::new(table));
                self.gateways = config.gateways.clone();
                metrics::record_reload(true);
                metrics::record_table(count);
                tracing::info!(routes = count, "Route table reloaded");
                Ok(count)
            }
            Err(e) => {
                metrics::record_reload(false);
                Err(e)
            }
        }
    }

    /// Apply updates until the channel closes or shutdown fires.
    pub async fn run(
        mut self,
        mut updates: mpsc::UnboundedReceiver<BridgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(config) = update else { break };
                    if let Err(e) = self.apply(&config).await {
                        tracing::error!(error = %e, "Reload failed, keeping current route table");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Reloader stopped");
    }
}
