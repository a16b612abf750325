//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_forwarder_requests_total` (counter): requests by method, status
//! - `edge_forwarder_request_duration_seconds` (histogram): time to response head
//! - `edge_forwarder_upstream_errors_total` (counter): transport failures

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one handled request.
pub fn record_request(method: &str, status: u16, start_time: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!(
        "edge_forwarder_requests_total",
        "method" => method.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "edge_forwarder_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(start_time.elapsed().as_secs_f64());
}

/// Record a transport failure towards the upstream.
pub fn record_upstream_error() {
    metrics::counter!("edge_forwarder_upstream_errors_total").increment(1);
}
