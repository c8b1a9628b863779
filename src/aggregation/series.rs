//! Series Aggregator
//!
//! Buckets one series' rows against the shared bucket axis and reduces each
//! bucket to a count or a sum. Rows are never fatal: a missing timestamp (or
//! one too close to the calendar edge to key) is skipped, a timestamp outside
//! the axis is dropped, and a non-numeric value contributes zero. Every
//! outcome is counted in the series summary.

use std::collections::HashMap;

use tracing::debug;

use super::bucket::bucket_key;
use super::metric::MetricResolution;
use super::normalizer::SeriesDescriptor;
use super::TimeField;
use crate::types::{AggregatedSeries, AggregationMode, Granularity, SeriesSummary};

/// How empty buckets are reported
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillPolicy {
    /// Report empty buckets as `fill_value` (true) or `None` (false)
    pub zero_fill: bool,
    /// Value for empty buckets when zero-filling
    pub fill_value: f64,
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self {
            zero_fill: true,
            fill_value: 0.0,
        }
    }
}

/// Running state for one bucket
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketState {
    /// Accumulated count or sum
    pub value: f64,
    /// Rows that landed in the bucket
    pub rows: usize,
}

impl BucketState {
    /// Add one row's contribution
    pub fn add(&mut self, contribution: f64) {
        self.value += contribution;
        self.rows += 1;
    }

    /// Final value under a fill policy
    pub fn finalize(&self, fill: FillPolicy) -> Option<f64> {
        if self.rows > 0 {
            Some(self.value)
        } else if fill.zero_fill {
            Some(fill.fill_value)
        } else {
            None
        }
    }
}

/// Aggregates series against a fixed bucket axis
pub struct SeriesAggregator<'b> {
    granularity: Granularity,
    buckets: &'b [String],
    positions: HashMap<&'b str, usize>,
    fill: FillPolicy,
}

impl<'b> SeriesAggregator<'b> {
    /// Create an aggregator over generated bucket keys
    pub fn new(granularity: Granularity, buckets: &'b [String], fill: FillPolicy) -> Self {
        let positions = buckets
            .iter()
            .enumerate()
            .map(|(i, key)| (key.as_str(), i))
            .collect();
        Self {
            granularity,
            buckets,
            positions,
            fill,
        }
    }

    /// Aggregate one series
    pub fn aggregate(
        &self,
        series: &SeriesDescriptor<'_>,
        resolution: &MetricResolution,
        time_field: &TimeField<'_>,
    ) -> AggregatedSeries {
        let mut states = vec![BucketState::default(); self.buckets.len()];
        let mut summary = SeriesSummary {
            rows_total: series.rows.len(),
            ..Default::default()
        };

        for row in series.rows {
            let Some(ts) = time_field.extract(row) else {
                summary.rows_skipped += 1;
                continue;
            };

            let Some(key) = bucket_key(self.granularity, ts) else {
                summary.rows_skipped += 1;
                continue;
            };
            let Some(&pos) = self.positions.get(key.as_str()) else {
                summary.rows_out_of_range += 1;
                continue;
            };

            let contribution = match (resolution.mode, resolution.value_field.as_deref()) {
                (AggregationMode::Sum, Some(field)) => row.number(field).unwrap_or_else(|| {
                    summary.rows_non_numeric += 1;
                    0.0
                }),
                _ => 1.0,
            };

            states[pos].add(contribution);
            summary.rows_aggregated += 1;
        }

        summary.total = states.iter().map(|s| s.value).sum();
        summary.buckets_with_data = states.iter().filter(|s| s.rows > 0).count();

        debug!(
            series = %series.label,
            processed = summary.rows_aggregated,
            skipped = summary.rows_skipped,
            out_of_range = summary.rows_out_of_range,
            non_numeric = summary.rows_non_numeric,
            "Aggregated series"
        );

        AggregatedSeries {
            label: series.label.clone(),
            values: states.iter().map(|s| s.finalize(self.fill)).collect(),
            metric: series.metric.map(str::to_string),
            entity: series.entity.map(str::to_string),
            value_field: resolution.value_field.clone(),
            mode: resolution.mode,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::metric::MetricResolver;
    use crate::record::Record;
    use serde_json::json;

    const FIELD: TimeField<'static> = TimeField::Named("createdAt");

    fn keys(days: &[&str]) -> Vec<String> {
        days.iter().map(|d| d.to_string()).collect()
    }

    fn rows(values: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_sum_per_day() {
        let buckets = keys(&["2025-08-01", "2025-08-02", "2025-08-03"]);
        let data = rows(json!([
            { "createdAt": "2025-08-01T09:00:00Z", "cash": 1000 },
            { "createdAt": "2025-08-02T10:00:00Z", "cash": "1,500" },
            { "createdAt": "2025-08-03T11:00:00Z", "cash": 2000.0 }
        ]));
        let series = SeriesDescriptor::for_test(&data);
        let resolution = MetricResolver::default().resolve(Some("cash"), None, &data);

        let result = SeriesAggregator::new(Granularity::Day, &buckets, FillPolicy::default())
            .aggregate(&series, &resolution, &FIELD);

        assert_eq!(result.values, vec![Some(1000.0), Some(1500.0), Some(2000.0)]);
        assert_eq!(result.summary.total, 4500.0);
        assert_eq!(result.mode, AggregationMode::Sum);
        assert_eq!(result.value_field.as_deref(), Some("cash"));
    }

    #[test]
    fn test_count_skips_and_drops() {
        let buckets = keys(&["2025-08-01", "2025-08-02"]);
        let data = rows(json!([
            { "createdAt": "2025-08-01" },
            { "createdAt": "2025-08-01T23:59:59Z" },
            { "createdAt": "2025-08-03" },
            { "createdAt": "yesterday" },
            { "other": 1 }
        ]));
        let series = SeriesDescriptor::for_test(&data);
        let resolution = MetricResolver::default().resolve(None, None, &data);

        let result = SeriesAggregator::new(Granularity::Day, &buckets, FillPolicy::default())
            .aggregate(&series, &resolution, &FIELD);

        assert_eq!(result.values, vec![Some(2.0), Some(0.0)]);
        assert_eq!(result.summary.rows_total, 5);
        assert_eq!(result.summary.rows_aggregated, 2);
        assert_eq!(result.summary.rows_out_of_range, 1);
        assert_eq!(result.summary.rows_skipped, 2);
        assert_eq!(result.summary.buckets_with_data, 1);
    }

    #[test]
    fn test_no_zero_fill_distinguishes_zero_from_empty() {
        let buckets = keys(&["2025-08-01", "2025-08-02"]);
        let data = rows(json!([{ "createdAt": "2025-08-01", "cash": 0 }]));
        let series = SeriesDescriptor::for_test(&data);
        let resolution = MetricResolver::default().resolve(Some("cash"), None, &data);
        let fill = FillPolicy {
            zero_fill: false,
            fill_value: 0.0,
        };

        let result = SeriesAggregator::new(Granularity::Day, &buckets, fill)
            .aggregate(&series, &resolution, &FIELD);
        assert_eq!(result.values, vec![Some(0.0), None]);
    }

    #[test]
    fn test_custom_fill_value() {
        let buckets = keys(&["2025-08-01", "2025-08-02"]);
        let data: Vec<Record> = Vec::new();
        let series = SeriesDescriptor::for_test(&data);
        let resolution = MetricResolver::default().resolve(None, None, &data);
        let fill = FillPolicy {
            zero_fill: true,
            fill_value: -1.0,
        };

        let result = SeriesAggregator::new(Granularity::Day, &buckets, fill)
            .aggregate(&series, &resolution, &FIELD);
        assert_eq!(result.values, vec![Some(-1.0), Some(-1.0)]);
        assert_eq!(result.summary.total, 0.0);
    }

    #[test]
    fn test_non_numeric_value_counts_as_zero_row() {
        let buckets = keys(&["2025-08-01"]);
        let data = rows(json!([
            { "createdAt": "2025-08-01", "cash": "n/a" },
            { "createdAt": "2025-08-01", "cash": 5 }
        ]));
        let series = SeriesDescriptor::for_test(&data);
        let resolution = MetricResolver::default().resolve(None, Some("cash"), &data);

        let result = SeriesAggregator::new(Granularity::Day, &buckets, FillPolicy::default())
            .aggregate(&series, &resolution, &FIELD);
        assert_eq!(result.values, vec![Some(5.0)]);
        assert_eq!(result.summary.rows_non_numeric, 1);
        assert_eq!(result.summary.rows_aggregated, 2);
    }

    #[test]
    fn test_week_buckets_use_iso_keys() {
        let buckets = keys(&["2020-W53", "2021-W01"]);
        let data = rows(json!([
            { "createdAt": "2021-01-01" },
            { "createdAt": "2020-12-28" },
            { "createdAt": "2021-01-04" }
        ]));
        let series = SeriesDescriptor::for_test(&data);
        let resolution = MetricResolver::default().resolve(None, None, &data);

        let result = SeriesAggregator::new(Granularity::Week, &buckets, FillPolicy::default())
            .aggregate(&series, &resolution, &FIELD);
        assert_eq!(result.values, vec![Some(2.0), Some(1.0)]);
    }

    #[test]
    fn test_calendar_edge_timestamps_are_not_fatal() {
        use chrono::{DateTime, Utc};

        let min = DateTime::<Utc>::MIN_UTC.timestamp_millis();
        let max = DateTime::<Utc>::MAX_UTC.timestamp_millis();
        let data = rows(json!([
            { "createdAt": min },
            { "createdAt": max },
            { "createdAt": "2025-08-01" }
        ]));
        let series = SeriesDescriptor::for_test(&data);
        let resolution = MetricResolver::default().resolve(None, None, &data);

        for (g, axis) in [
            (Granularity::Hour, "2025-08-01 00:00"),
            (Granularity::Day, "2025-08-01"),
            (Granularity::Week, "2025-W31"),
            (Granularity::Month, "2025-08"),
        ] {
            let buckets = keys(&[axis]);
            let result = SeriesAggregator::new(g, &buckets, FillPolicy::default())
                .aggregate(&series, &resolution, &FIELD);

            assert_eq!(result.values, vec![Some(1.0)], "{}", g);
            assert_eq!(result.summary.rows_aggregated, 1);
            assert_eq!(result.summary.rows_skipped + result.summary.rows_out_of_range, 2);
        }
    }
}
