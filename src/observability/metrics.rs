//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define client metrics (requests, retries, queue depth, replays, connectivity)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `client_requests_total` (counter): requests by method, outcome
//! - `client_retries_total` (counter): retries by reason (server_error, transport)
//! - `client_transport_duration_seconds` (histogram): single-attempt latency
//! - `client_offline_queue_depth` (gauge): entries waiting for replay
//! - `client_queue_replays_total` (counter): replay results
//! - `client_network_online` (gauge): 1=online, 0=offline
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so library users
//!   pay nothing unless they opt in
//! - Labels are low-cardinality (no endpoints, no ids)

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

/// Record a completed client request.
pub fn record_request(method: &str, outcome: &'static str) {
    metrics::counter!(
        "client_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Why the retry controller made another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    ServerError,
    Transport,
}

impl RetryReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryReason::ServerError => "server_error",
            RetryReason::Transport => "transport",
        }
    }
}

pub fn record_retry(reason: RetryReason) {
    metrics::counter!("client_retries_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_transport_duration(elapsed: Duration) {
    metrics::histogram!("client_transport_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("client_offline_queue_depth").set(depth as f64);
}

/// Record a replay result: delivered, rejected, requeued or dropped.
pub fn record_replay(result: &'static str) {
    metrics::counter!("client_queue_replays_total", "result" => result).increment(1);
}

pub fn record_network_state(online: bool) {
    metrics::gauge!("client_network_online").set(if online { 1.0 } else { 0.0 });
}
