//! Metrics definitions for the API.
//!
//! This module defines all metrics used throughout waypoint.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "node_lookups_total",
        "Total number of node lookups by type and outcome"
    );
    describe_counter!(
        "id_decode_errors_total",
        "Total number of global IDs that failed to decode"
    );
    describe_counter!(
        "cursor_decode_errors_total",
        "Total number of cursors that failed to decode"
    );
    describe_counter!(
        "connections_served_total",
        "Total number of connection pages served"
    );
    describe_histogram!(
        "connection_page_duration_seconds",
        "Time taken to count and fetch a connection page in seconds"
    );
}

/// Record a node lookup.
///
/// # Arguments
/// * `type_tag` - The node type, or "unknown" if the ID did not decode
/// * `outcome` - "found", "missing", "invalid" or "error"
pub fn record_node_lookup(type_tag: &str, outcome: &'static str) {
    counter!("node_lookups_total", "type" => type_tag.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Record a global ID that failed to decode.
pub fn record_id_decode_error() {
    counter!("id_decode_errors_total").increment(1);
}

/// Record a cursor that failed to decode.
pub fn record_cursor_decode_error() {
    counter!("cursor_decode_errors_total").increment(1);
}

/// Record a served connection page.
///
/// # Arguments
/// * `type_tag` - The node type of the connection
pub fn record_connection_served(type_tag: &str) {
    counter!("connections_served_total", "type" => type_tag.to_string()).increment(1);
}

/// Record connection page duration.
pub fn record_connection_duration(type_tag: &str, duration_secs: f64) {
    histogram!("connection_page_duration_seconds", "type" => type_tag.to_string())
        .record(duration_secs);
}

/// A timer that records the page duration when dropped.
pub struct ConnectionTimer {
    type_tag: &'static str,
    start: Instant,
}

impl ConnectionTimer {
    /// Start a new timer for a connection of `type_tag` nodes.
    pub fn new(type_tag: &'static str) -> Self {
        Self {
            type_tag,
            start: Instant::now(),
        }
    }
}

impl Drop for ConnectionTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_connection_duration(self.type_tag, duration);
    }
}
