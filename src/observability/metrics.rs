//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define edge metrics (requests, latency, cache events, errors)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `edge_requests_total` (counter): by method, status, origin
//! - `edge_request_duration_seconds` (histogram): by origin
//! - `edge_cache_events_total` (counter): by cache, outcome (hit/miss/store)
//! - `edge_upstream_errors_total` (counter): by origin
//! - `edge_rewrite_failures_total` (counter): by rewrite mode
//!
//! # Design Decisions
//! - The `metrics` facade is a no-op until a recorder is installed, so
//!   tests and library users pay nothing
//! - Labels are low-cardinality: no paths, no hosts

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "edge_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "edge_request_duration_seconds";
pub const CACHE_EVENTS_TOTAL: &str = "edge_cache_events_total";
pub const UPSTREAM_ERRORS_TOTAL: &str = "edge_upstream_errors_total";
pub const REWRITE_FAILURES_TOTAL: &str = "edge_rewrite_failures_total";

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(REQUESTS_TOTAL, "Requests answered by the edge");
    describe_histogram!(REQUEST_DURATION_SECONDS, "End-to-end request latency in seconds");
    describe_counter!(CACHE_EVENTS_TOTAL, "Cache lookups and stores");
    describe_counter!(UPSTREAM_ERRORS_TOTAL, "Failed origin calls");
    describe_counter!(REWRITE_FAILURES_TOTAL, "Responses returned unmodified after a rewrite error");

    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, origin: &str, start_time: Instant) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string(),
        "origin" => origin.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "origin" => origin.to_string())
        .record(start_time.elapsed().as_secs_f64());
}

/// Record a cache lookup (`hit`/`miss`) or a `store`.
pub fn record_cache_event(cache: &'static str, outcome: &'static str) {
    counter!(CACHE_EVENTS_TOTAL, "cache" => cache, "outcome" => outcome).increment(1);
}

pub fn record_upstream_error(origin: &str) {
    counter!(UPSTREAM_ERRORS_TOTAL, "origin" => origin.to_string()).increment(1);
}

pub fn record_rewrite_failure(mode: &'static str) {
    counter!(REWRITE_FAILURES_TOTAL, "mode" => mode).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("GET", 200, "headless", Instant::now());
        record_cache_event("responses", "hit");
        record_upstream_error("primary");
        record_rewrite_failure("alias");
    }
}
