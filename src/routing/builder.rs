//! Route table construction.
//!
//! # Data Flow
//! ```text
//! [GatewayConfig; N]
//!     → spawn one worker per gateway (fan-out)
//!         connect → describe stage (optional) → list resources → compile
//!     → await every worker (fan-in barrier, no sibling cancellation)
//!     → first failure by gateway index, if any
//!     → sequential merge in gateway order with duplicate detection
//!     → RouteTable
//! ```
//!
//! # Design Decisions
//! - Workers share nothing; each returns its own route list
//! - Merge happens after the barrier, so no lock is held while workers run
//! - The reported error is the one from the lowest gateway index

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;

use crate::config::GatewayConfig;
use crate::remote::{DescriptorError, RemoteDescriptor, Resource};
use crate::routing::compiler::{compile, TemplateError};
use crate::routing::table::{Route, RouteEntry, RouteTable};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("couldn't connect for rest API {rest_api_id}: {source}")]
    Connect {
        rest_api_id: String,
        #[source]
        source: DescriptorError,
    },

    #[error("couldn't describe stage {stage} of rest API {rest_api_id}: {source}")]
    Variant {
        rest_api_id: String,
        stage: String,
        #[source]
        source: DescriptorError,
    },

    #[error("couldn't list resources of rest API {rest_api_id}: {source}")]
    Listing {
        rest_api_id: String,
        #[source]
        source: DescriptorError,
    },

    #[error("rest API {rest_api_id}: {source}")]
    Template {
        rest_api_id: String,
        #[source]
        source: TemplateError,
    },

    #[error("duplicate path {path} found in the configuration for rest API {rest_api_id}")]
    DuplicatePath { path: String, rest_api_id: String },

    #[error("worker for rest API {rest_api_id} did not finish: {reason}")]
    Worker { rest_api_id: String, reason: String },
}

/// Builds [`RouteTable`]s from gateway definitions.
#[derive(Clone)]
pub struct RouteTableBuilder {
    descriptor: Arc<dyn RemoteDescriptor>,
}

impl RouteTableBuilder {
    pub fn new(descriptor: Arc<dyn RemoteDescriptor>) -> Self {
        Self { descriptor }
    }

    /// Resolve every gateway concurrently and assemble one table.
    pub async fn build(&self, gateways: &[GatewayConfig]) -> Result<RouteTable, BuildError> {
        let started = Instant::now();

        let workers = gateways.iter().cloned().map(|gateway| {
            let descriptor = Arc::clone(&self.descriptor);
            tokio::spawn(async move { resolve_gateway(descriptor.as_ref(), &gateway).await })
        });
        let outcomes = join_all(workers).await;

        let mut failure: Option<BuildError> = None;
        let mut batches = Vec::with_capacity(gateways.len());
        for (gateway, outcome) in gateways.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|e| {
                Err(BuildError::Worker {
                    rest_api_id: gateway.rest_api_id.clone(),
                    reason: e.to_string(),
                })
            });
            match outcome {
                Ok(routes) => batches.push(routes),
                Err(e) => {
                    tracing::error!(rest_api_id = %gateway.rest_api_id, error = %e, "Gateway resolution failed");
                    failure.get_or_insert(e);
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        let table = merge(batches)?;

        tracing::info!(
            gateways = gateways.len(),
            routes = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Route table built"
        );
        Ok(table)
    }
}

/// One worker: everything needed for a single gateway, no shared state.
async fn resolve_gateway(
    descriptor: &dyn RemoteDescriptor,
    gateway: &GatewayConfig,
) -> Result<Vec<Route>, BuildError> {
    let rest_api_id = gateway.rest_api_id.clone();

    let context = descriptor
        .connect(gateway)
        .await
        .map_err(|source| BuildError::Connect {
            rest_api_id: rest_api_id.clone(),
            source,
        })?;

    let variables = match gateway.stage_name.as_deref() {
        Some(stage) => {
            let variant = descriptor
                .describe_variant(&context, &rest_api_id, stage)
                .await
                .map_err(|source| BuildError::Variant {
                    rest_api_id: rest_api_id.clone(),
                    stage: stage.to_string(),
                    source,
                })?;
            tracing::debug!(
                rest_api_id = %rest_api_id,
                stage,
                variables = variant.variables.len(),
                "Stage resolved"
            );
            variant.variables
        }
        None => BTreeMap::new(),
    };

    let resources = descriptor
        .list_resources(&context, &rest_api_id)
        .await
        .map_err(|source| BuildError::Listing {
            rest_api_id: rest_api_id.clone(),
            source,
        })?;

    let mut routes = Vec::with_capacity(resources.len());
    for Resource { id, path, methods } in resources {
        if methods.is_empty() {
            tracing::debug!(rest_api_id = %rest_api_id, path = %path, "Skipping resource without methods");
            continue;
        }

        let effective_path = effective_path(gateway.stage_name.as_deref(), &path);
        let template = compile(&effective_path).map_err(|source| BuildError::Template {
            rest_api_id: rest_api_id.clone(),
            source,
        })?;

        routes.push(Route {
            template,
            entry: RouteEntry {
                effective_path,
                original_path: path,
                resource_id: id,
                rest_api_id: rest_api_id.clone(),
                methods,
                context: context.clone(),
                stage: gateway.stage_name.clone(),
                stage_variables: variables.clone(),
            },
        });
    }

    Ok(routes)
}

/// `/{stage}{path}`; the root resource becomes `/{stage}`.
pub fn effective_path(stage: Option<&str>, path: &str) -> String {
    match stage {
        Some(stage) if path == "/" => format!("/{stage}"),
        Some(stage) => format!("/{stage}{path}"),
        None => path.to_string(),
    }
}

/// Concatenate worker results in gateway order, rejecting repeated effective paths.
fn merge(batches: Vec<Vec<Route>>) -> Result<RouteTable, BuildError> {
    let mut seen = HashSet::new();
    let mut routes = Vec::with_capacity(batches.iter().map(Vec::len).sum());

    for route in batches.into_iter().flatten() {
        if !seen.insert(route.entry.effective_path.clone()) {
            return Err(BuildError::DuplicatePath {
                path: route.entry.effective_path,
                rest_api_id: route.entry.rest_api_id,
            });
        }
        routes.push(route);
    }

    Ok(RouteTable::from_routes(routes))
}
