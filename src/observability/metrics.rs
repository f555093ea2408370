//! Metrics collection and exposition.
//!
//! # Metrics
//! - `flow_proxy_operations_total` (counter): operations by kind and outcome
//! - `flow_proxy_replayed_services` (gauge): services in the last replay
//! - `flow_proxy_http_requests_total` (counter): control API requests by route, status

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one engine operation (`reconfigure`, `remove`, `replay`).
pub fn record_operation(operation: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("flow_proxy_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

pub fn record_replayed_services(count: usize) {
    gauge!("flow_proxy_replayed_services").set(count as f64);
}

pub fn record_request(route: &'static str, status: u16) {
    counter!("flow_proxy_http_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}
