//! Metrics collection and exposition.
//!
//! # Metrics
//! - `forwarder_requests_total` (counter): forwards by method and outcome
//! - `forwarder_upstream_status_total` (counter): upstream status class
//! - `forwarder_request_duration_seconds` (histogram): end-to-end latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are bounded (method, outcome, status class), never URLs or hosts

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// `2xx`, `4xx`, ... for an upstream status.
pub fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Record one pipeline invocation.
pub fn record_forward(method: &'static str, outcome: &'static str, status: Option<u16>, start: Instant) {
    metrics::counter!("forwarder_requests_total", "method" => method, "outcome" => outcome).increment(1);
    metrics::histogram!("forwarder_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
    if let Some(status) = status {
        metrics::counter!("forwarder_upstream_status_total", "class" => status_class(status)).increment(1);
    }
}
