//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_requests_total` (counter): requests by method, status, route
//! - `bridge_request_duration_seconds` (histogram): latency by method, route
//! - `bridge_routes` (gauge): routes in the active table
//! - `bridge_route_reloads_total` (counter): rebuilds by outcome
//!
//! # Design Decisions
//! - Labels use the route template, never the raw path (bounded cardinality)
//! - Recording is a no-op until a recorder is installed

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    metrics::counter!(
        "bridge_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "bridge_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the size of a freshly installed route table.
pub fn record_table(routes: usize) {
    metrics::gauge!("bridge_routes").set(routes as f64);
}

/// Record a reload attempt.
pub fn record_reload(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("bridge_route_reloads_total", "outcome" => outcome).increment(1);
}
