//! Metrics and observability utilities
//!
//! Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Foodgram metrics
pub const METRICS_PREFIX: &str = "foodgram";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Recipe metrics
    describe_counter!(
        format!("{}_recipe_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Recipes created, updated or deleted"
    );

    // Relationship metrics
    describe_counter!(
        format!("{}_membership_changes_total", METRICS_PREFIX),
        Unit::Count,
        "Favorite, cart and subscription changes"
    );

    // Shopping list metrics
    describe_counter!(
        format!("{}_shopping_lists_total", METRICS_PREFIX),
        Unit::Count,
        "Shopping lists rendered"
    );

    describe_histogram!(
        format!("{}_shopping_list_entries", METRICS_PREFIX),
        Unit::Count,
        "Aggregated entries per shopping list"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// `action` is one of `create`, `update`, `delete`
pub fn record_recipe_write(action: &'static str) {
    counter!(
        format!("{}_recipe_writes_total", METRICS_PREFIX),
        "action" => action
    )
    .increment(1);
}

/// `relation` is `favorite`, `cart` or `follow`; `action` is `add` or `remove`
pub fn record_membership(relation: &'static str, action: &'static str) {
    counter!(
        format!("{}_membership_changes_total", METRICS_PREFIX),
        "relation" => relation,
        "action" => action
    )
    .increment(1);
}

pub fn record_shopping_list(entries: usize) {
    counter!(format!("{}_shopping_lists_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_shopping_list_entries", METRICS_PREFIX)).record(entries as f64);
}
