//! Prometheus metrics.
//!
//! Nothing is exported unless [`init_metrics`] installs the recorder; until
//! then every call here is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use lpc_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", 200);
//! metrics::eliminations_total();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter with a scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Increment total WebSocket connections counter.
pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent() {
    metrics::counter!("websocket_messages_sent").increment(1);
}

// ============================================================================
// Live Operations Metrics
// ============================================================================

pub fn eliminations_total() {
    metrics::counter!("eliminations_total").increment(1);
}

pub fn reinstatements_total() {
    metrics::counter!("reinstatements_total").increment(1);
}

/// Score writes that failed after an elimination
pub fn scoring_failures_total() {
    metrics::counter!("scoring_failures_total").increment(1);
}

pub fn votes_total() {
    metrics::counter!("votes_total").increment(1);
}

/// Record the size of each placed bet.
pub fn bet_size(amount: i64) {
    metrics::histogram!("bet_size").record(amount as f64);
}

pub fn polls_resolved_total() {
    metrics::counter!("polls_resolved_total").increment(1);
}
