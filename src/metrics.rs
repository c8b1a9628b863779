//! Metrics and telemetry for the chart engine
//!
//! Prometheus counters and histograms registered in the default registry.
//! The engine records into them on every request; exporting is left to the
//! embedding process (`gather_metrics`).

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::types::{AggregationMode, ChartResult, Diagnostic, Granularity};

lazy_static! {
    // === Request Counters ===

    /// Total aggregation requests
    pub static ref CHART_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "chart_requests_total",
        "Total chart aggregation requests",
        &["granularity", "status"]
    ).unwrap();

    /// Total series aggregated by mode
    pub static ref CHART_SERIES_TOTAL: CounterVec = register_counter_vec!(
        "chart_series_total",
        "Total series aggregated by mode",
        &["mode"]
    ).unwrap();

    /// Rows processed by outcome
    pub static ref CHART_ROWS_TOTAL: CounterVec = register_counter_vec!(
        "chart_rows_total",
        "Rows processed by outcome",
        &["outcome"]
    ).unwrap();

    /// Diagnostics emitted by kind
    pub static ref CHART_DIAGNOSTICS_TOTAL: CounterVec = register_counter_vec!(
        "chart_diagnostics_total",
        "Diagnostics emitted by kind",
        &["kind"]
    ).unwrap();

    // === Histograms ===

    /// Aggregation latency
    pub static ref AGGREGATION_DURATION: HistogramVec = register_histogram_vec!(
        "chart_aggregation_duration_seconds",
        "Aggregation latency in seconds",
        &["granularity"],
        vec![0.0001, 0.001, 0.01, 0.1, 1.0]
    ).unwrap();

    /// Buckets generated per request
    pub static ref BUCKETS_GENERATED: HistogramVec = register_histogram_vec!(
        "chart_buckets_generated",
        "Buckets generated per request",
        &["granularity"],
        vec![1.0, 7.0, 31.0, 100.0, 1000.0, 10000.0]
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a completed aggregation
pub fn record_aggregation(result: &ChartResult, duration_secs: f64) {
    let granularity = result.granularity.as_str();

    CHART_REQUESTS_TOTAL
        .with_label_values(&[granularity, "success"])
        .inc();
    AGGREGATION_DURATION
        .with_label_values(&[granularity])
        .observe(duration_secs);
    BUCKETS_GENERATED
        .with_label_values(&[granularity])
        .observe(result.buckets.len() as f64);

    for series in &result.series {
        let mode = match series.mode {
            AggregationMode::Count => "count",
            AggregationMode::Sum => "sum",
        };
        CHART_SERIES_TOTAL.with_label_values(&[mode]).inc();

        let summary = &series.summary;
        for (outcome, n) in [
            ("aggregated", summary.rows_aggregated),
            ("skipped", summary.rows_skipped),
            ("out_of_range", summary.rows_out_of_range),
            ("non_numeric", summary.rows_non_numeric),
        ] {
            if n > 0 {
                CHART_ROWS_TOTAL.with_label_values(&[outcome]).inc_by(n as f64);
            }
        }
    }

    for diagnostic in &result.diagnostics {
        let kind = match diagnostic {
            Diagnostic::NoNumericData { .. } => "no_numeric_data",
            Diagnostic::NoTimestamps { .. } => "no_timestamps",
        };
        CHART_DIAGNOSTICS_TOTAL.with_label_values(&[kind]).inc();
    }
}

/// Record a failed aggregation
#[inline]
pub fn record_failure(granularity: Granularity) {
    CHART_REQUESTS_TOTAL
        .with_label_values(&[granularity.as_str(), "error"])
        .inc();
}
