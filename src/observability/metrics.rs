//! Metrics collection and exposition.
//!
//! # Metrics
//! - `static_cache_lookups_total` (counter): by `result` (hit, miss, coalesced)
//! - `static_compression_total` (counter): by `outcome` (compressed, skipped)
//! - `static_responses_total` (counter): responses leaving the middleware, by `status`
//! - `static_push_total` (counter): push attempts, by `outcome` (pushed, failed)

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("static_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_compression(outcome: &'static str) {
    metrics::counter!("static_compression_total", "outcome" => outcome).increment(1);
}

pub fn record_response(status: u16) {
    metrics::counter!("static_responses_total", "status" => status.to_string()).increment(1);
}

pub fn record_push(outcome: &'static str) {
    metrics::counter!("static_push_total", "outcome" => outcome).increment(1);
}
