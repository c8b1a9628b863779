//! Chart engine and its builder
//!
//! `ChartEngine` runs the four aggregation stages for one request at a time.
//! It holds only immutable configuration, so a single engine can be shared
//! across threads and called concurrently.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::traits::{Clock, SystemClock};
use crate::aggregation::{
    generate_buckets, normalize, FillPolicy, MetricResolver, RangeHints, RangeResolver,
    SeriesAggregator, SeriesDescriptor, TimeField,
};
use crate::config::{ChartConfig, EngineConfig, OutputConfig};
use crate::error::Result;
use crate::metrics;
use crate::record::numeric_field_names;
use crate::types::{AggregatedSeries, AggregationMode, ChartRequest, ChartResult, Diagnostic};

/// Stateless aggregation engine
pub struct ChartEngine {
    engine: EngineConfig,
    output: OutputConfig,
    resolver: MetricResolver,
    clock: Arc<dyn Clock>,
}

impl Default for ChartEngine {
    fn default() -> Self {
        let config = ChartConfig::default();
        Self {
            engine: config.engine,
            output: config.output,
            resolver: MetricResolver::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl ChartEngine {
    /// Engine with default configuration and the system clock
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a customised engine
    pub fn builder() -> ChartEngineBuilder {
        ChartEngineBuilder::new()
    }

    /// Engine settings in use
    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine
    }

    /// Aggregate one request
    ///
    /// Fails only when the resolved range would exceed the bucket limit.
    /// Malformed rows and range inputs are absorbed and reported through the
    /// series summaries and `ChartResult::diagnostics`.
    pub fn aggregate(&self, request: &ChartRequest) -> Result<ChartResult> {
        let started = Instant::now();
        let granularity = request.granularity;

        let series = normalize(request);
        let time_field = match request.time_field.as_deref().map(str::trim) {
            Some(field) if !field.is_empty() => TimeField::Named(field),
            _ => TimeField::Candidates(&self.engine.time_field_candidates),
        };

        let range = RangeResolver::new(
            self.clock.as_ref(),
            self.engine.sample_limit,
            self.engine.default_window_days,
        )
        .resolve(
            RangeHints {
                start_date: request.start_date.as_deref(),
                end_date: request.end_date.as_deref(),
                relative_period: request.relative_period.as_deref(),
                granularity,
            },
            &series,
            &time_field,
        );

        let buckets =
            generate_buckets(granularity, range.start, range.end, self.engine.max_buckets)
                .map_err(|e| {
                    warn!(
                        granularity = %granularity,
                        start = %range.start,
                        end = %range.end,
                        start_source = ?range.start_source,
                        end_source = ?range.end_source,
                        "Resolved chart range exceeds the bucket limit"
                    );
                    metrics::record_failure(granularity);
                    e
                })?;

        let options = request.options.unwrap_or_default();
        let fill = FillPolicy {
            zero_fill: options.zero_fill.unwrap_or(self.output.zero_fill),
            fill_value: options.fill_value.unwrap_or(self.output.fill_value),
        };
        let aggregator = SeriesAggregator::new(granularity, &buckets, fill);

        let mut diagnostics = Vec::new();
        let mut results = Vec::with_capacity(series.len());
        for descriptor in &series {
            let sample = &descriptor.rows[..descriptor.rows.len().min(self.engine.sample_limit)];
            let resolution =
                self.resolver.resolve(descriptor.metric, descriptor.value_field, sample);
            let aggregated = aggregator.aggregate(descriptor, &resolution, &time_field);
            if let Some(diagnostic) = diagnose(descriptor, &aggregated, &time_field, sample) {
                warn!(series = %descriptor.label, "{}", diagnostic);
                diagnostics.push(diagnostic);
            }
            results.push(aggregated);
        }

        let result = ChartResult {
            buckets,
            series: results,
            range_used: range.to_range_used(),
            granularity,
            chart_type: request.chart_type.clone(),
            diagnostics,
        };

        let elapsed = started.elapsed();
        metrics::record_aggregation(&result, elapsed.as_secs_f64());
        debug!(
            granularity = %granularity,
            start = %result.range_used.start,
            end = %result.range_used.end,
            start_source = ?range.start_source,
            end_source = ?range.end_source,
            buckets = result.buckets.len(),
            series = result.series.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "Chart aggregation complete"
        );

        Ok(result)
    }
}

/// Explain a series that produced no usable data
fn diagnose(
    descriptor: &SeriesDescriptor<'_>,
    aggregated: &AggregatedSeries,
    time_field: &TimeField<'_>,
    sample: &[crate::record::Record],
) -> Option<Diagnostic> {
    let summary = &aggregated.summary;
    if summary.rows_total == 0 {
        return None;
    }

    if summary.rows_skipped == summary.rows_total {
        return Some(Diagnostic::NoTimestamps {
            series: descriptor.label.clone(),
            time_field: time_field.describe(),
            rows: summary.rows_total,
        });
    }

    match (aggregated.mode, aggregated.value_field.as_deref()) {
        (AggregationMode::Sum, Some(field))
            if summary.rows_aggregated > 0
                && summary.rows_non_numeric == summary.rows_aggregated =>
        {
            Some(Diagnostic::NoNumericData {
                series: descriptor.label.clone(),
                metric: descriptor.metric.map(str::to_string),
                value_field: field.to_string(),
                available_fields: numeric_field_names(sample),
            })
        }
        _ => None,
    }
}

/// Builder for a customised `ChartEngine`
pub struct ChartEngineBuilder {
    config: ChartConfig,
    resolver: MetricResolver,
    clock: Arc<dyn Clock>,
}

impl Default for ChartEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartEngineBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ChartConfig::default(),
            resolver: MetricResolver::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use the given configuration
    pub fn with_config(mut self, config: ChartConfig) -> Self {
        self.config = config;
        self
    }

    /// Use the given clock for relative periods and the fallback window
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Use a custom metric resolver
    pub fn with_metric_resolver(mut self, resolver: MetricResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Validate the configuration and build the engine
    pub fn build(self) -> Result<ChartEngine> {
        self.config.validate()?;
        Ok(ChartEngine {
            engine: self.config.engine,
            output: self.config.output,
            resolver: self.resolver,
            clock: self.clock,
        })
    }
}
