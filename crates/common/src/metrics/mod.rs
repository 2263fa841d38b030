//! Metrics and observability utilities
//!
//! Provides metrics-rs counters and histograms with standardized naming
//! conventions. Recording is a no-op until a recorder is installed (the
//! gateway installs the Prometheus exporter).

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all MasterForge metrics
pub const METRICS_PREFIX: &str = "masterforge";

/// Buckets for upstream SPARQL latency (dblp queries are slow)
pub const QUERY_BUCKETS: &[f64] = &[
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
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

    // Upstream query metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total SPARQL queries sent to dblp"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "SPARQL query latency in seconds"
    );

    describe_counter!(
        format!("{}_rows_normalized_total", METRICS_PREFIX),
        Unit::Count,
        "Total result rows converted into collaboration rows"
    );

    describe_counter!(
        format!("{}_row_defaults_total", METRICS_PREFIX),
        Unit::Count,
        "Row fields replaced by their default value"
    );

    // Generation metrics
    describe_counter!(
        format!("{}_masterfiles_generated_total", METRICS_PREFIX),
        Unit::Count,
        "Total masterfiles generated"
    );

    describe_counter!(
        format!("{}_batch_items_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Batch items that failed"
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

/// Helper to record an upstream query
pub fn record_query(duration_secs: f64, service: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "service" => service.to_string(),
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        "service" => service.to_string()
    )
    .record(duration_secs);
}

/// Helper to record normalization results
pub fn record_normalized(rows: usize, defaulted_fields: usize) {
    counter!(format!("{}_rows_normalized_total", METRICS_PREFIX)).increment(rows as u64);
    if defaulted_fields > 0 {
        counter!(format!("{}_row_defaults_total", METRICS_PREFIX))
            .increment(defaulted_fields as u64);
    }
}

/// Helper to record a finished generation
pub fn record_generation(publications: usize, empty: bool) {
    let outcome = if empty { "empty" } else { "populated" };

    counter!(
        format!("{}_masterfiles_generated_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);

    tracing::debug!(publications, outcome, "Generation recorded");
}

/// Helper to record a failed batch item
pub fn record_batch_failure() {
    counter!(format!("{}_batch_items_failed_total", METRICS_PREFIX)).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_buckets_sorted() {
        let mut prev = 0.0;
        for &bucket in QUERY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_recording_without_recorder() {
        let metrics = RequestMetrics::start("POST", "/v1/masterfiles");
        metrics.finish(200);
        record_query(0.5, "dblp-sparql", true);
        record_normalized(3, 1);
        record_generation(3, false);
        record_batch_failure();
        // Just verify it runs without panic
    }
}
