//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, rejections, dispatch outcomes)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_rate_limited_total` (counter): rejections by policy
//! - `gateway_idempotency_total` (counter): cache outcomes (execute/replay)
//! - `gateway_dispatch_total` (counter): broker send outcomes

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(policy: &'static str) {
    metrics::counter!("gateway_rate_limited_total", "policy" => policy).increment(1);
}

pub fn record_idempotency(outcome: &'static str) {
    metrics::counter!("gateway_idempotency_total", "outcome" => outcome).increment(1);
}

pub fn record_dispatch(outcome: &'static str) {
    metrics::counter!("gateway_dispatch_total", "outcome" => outcome).increment(1);
}
