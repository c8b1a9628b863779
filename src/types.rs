//! Core data types for chart aggregation requests and results
//!
//! # Key Types
//!
//! - **`ChartRequest`**: one aggregation call (rows, series, range hints, options)
//! - **`SeriesInput`**: one logical line on the chart
//! - **`Granularity`**: bucket width (hour, day, week, month)
//! - **`ChartResult`**: bucket keys plus one `AggregatedSeries` per input series
//! - **`Diagnostic`**: caller-visible explanation when a series produced no data
//!
//! All types serialize with camelCase field names so that JSON produced by the
//! caller maps directly onto them.
//!
//! # Example
//!
//! ```rust
//! use kuba_chart::types::{ChartRequest, Granularity};
//!
//! let request = ChartRequest::new(Granularity::Day)
//!     .with_metric("cash")
//!     .with_range("2025-08-01", "2025-08-03");
//! assert_eq!(request.start_date.as_deref(), Some("2025-08-01"));
//! ```

use crate::error::Error;
use crate::record::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Granularity
// ============================================================================

/// Bucket width selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Granularity {
    /// One bucket per clock hour
    Hour,
    /// One bucket per UTC calendar day
    #[default]
    Day,
    /// One bucket per ISO-8601 week
    Week,
    /// One bucket per calendar month
    Month,
}

impl Granularity {
    /// Lowercase name used in keys, logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hourly" => Ok(Granularity::Hour),
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            _ => Err(Error::InvalidGranularity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// One logical line on the eventual chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesInput {
    /// Semantic name of the measured quantity (e.g. "cash", "count")
    pub metric: Option<String>,

    /// Display name; defaults to metric, then entity
    pub label: Option<String>,

    /// Entity name (passthrough)
    pub entity: Option<String>,

    /// Filter used upstream to select the rows (passthrough)
    pub filter: Option<Value>,

    /// Record field to sum
    pub value_field: Option<String>,

    /// Rows for this series; top-level rows are used when absent
    pub rows: Option<Vec<Record>>,
}

impl SeriesInput {
    /// Create a series for the given metric
    pub fn metric(metric: impl Into<String>) -> Self {
        Self {
            metric: Some(metric.into()),
            ..Default::default()
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the entity name
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set an explicit value field
    pub fn with_value_field(mut self, field: impl Into<String>) -> Self {
        self.value_field = Some(field.into());
        self
    }

    /// Attach rows owned by this series
    pub fn with_rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = Some(rows);
        self
    }
}

/// Output options
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartOptions {
    /// Report empty buckets as `fill_value` (true) or null (false)
    pub zero_fill: Option<bool>,

    /// Value for empty buckets when zero-filling
    pub fill_value: Option<f64>,
}

/// A complete aggregation request
///
/// Either `series` lists the chart lines explicitly, or the single-series
/// shorthand fields (`metric`, `entity`, `label`, `value_field`, `filter`)
/// describe one line over the top-level `rows`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    /// Shared row set
    pub rows: Option<Vec<Record>>,

    /// Explicit series definitions
    pub series: Option<Vec<SeriesInput>>,

    /// Shorthand: metric of the single series
    pub metric: Option<String>,

    /// Shorthand: entity of the single series
    pub entity: Option<String>,

    /// Shorthand: label of the single series
    pub label: Option<String>,

    /// Shorthand: value field of the single series
    pub value_field: Option<String>,

    /// Shorthand: filter of the single series
    pub filter: Option<Value>,

    /// Field (dotted path allowed) holding each row's timestamp
    pub time_field: Option<String>,

    /// Bucket width (required)
    pub granularity: Granularity,

    /// Explicit range start
    pub start_date: Option<String>,

    /// Explicit range end
    pub end_date: Option<String>,

    /// Relative window such as "7d" or "4w"
    pub relative_period: Option<String>,

    /// Chart type (passthrough)
    pub chart_type: Option<String>,

    /// Output options
    pub options: Option<ChartOptions>,
}

impl ChartRequest {
    /// Create an empty request with the given granularity
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            ..Default::default()
        }
    }

    /// Set the shared rows
    pub fn with_rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Append an explicit series
    pub fn with_series(mut self, series: SeriesInput) -> Self {
        self.series.get_or_insert_with(Vec::new).push(series);
        self
    }

    /// Set the shorthand metric
    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }

    /// Set the shorthand value field
    pub fn with_value_field(mut self, field: impl Into<String>) -> Self {
        self.value_field = Some(field.into());
        self
    }

    /// Set the time field
    pub fn with_time_field(mut self, field: impl Into<String>) -> Self {
        self.time_field = Some(field.into());
        self
    }

    /// Set both explicit range bounds
    pub fn with_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }

    /// Set the relative period
    pub fn with_relative_period(mut self, period: impl Into<String>) -> Self {
        self.relative_period = Some(period.into());
        self
    }

    /// Set zero-fill behaviour
    pub fn with_zero_fill(mut self, zero_fill: bool) -> Self {
        self.options.get_or_insert_with(ChartOptions::default).zero_fill = Some(zero_fill);
        self
    }

    /// Set the fill value for empty buckets
    pub fn with_fill_value(mut self, value: f64) -> Self {
        self.options.get_or_insert_with(ChartOptions::default).fill_value = Some(value);
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// How a series was aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Number of rows per bucket
    Count,
    /// Sum of the value field per bucket
    Sum,
}

/// Per-series totals and row accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    /// Sum of all bucket values (fill values excluded)
    pub total: f64,

    /// Rows available to the series
    pub rows_total: usize,

    /// Rows that landed in a bucket
    pub rows_aggregated: usize,

    /// Rows without a parseable timestamp
    pub rows_skipped: usize,

    /// Rows with a timestamp outside the resolved range
    pub rows_out_of_range: usize,

    /// Aggregated rows whose value field was missing or not numeric
    pub rows_non_numeric: usize,

    /// Buckets with at least one contributing row
    pub buckets_with_data: usize,
}

/// One aggregated chart line, aligned 1:1 with `ChartResult::buckets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSeries {
    /// Display label
    pub label: String,

    /// Value per bucket; `None` for empty buckets when zero-fill is off
    pub values: Vec<Option<f64>>,

    /// Metric requested for the series
    pub metric: Option<String>,

    /// Entity (passthrough)
    pub entity: Option<String>,

    /// Value field actually summed
    pub value_field: Option<String>,

    /// Aggregation mode used
    pub mode: AggregationMode,

    /// Totals and row accounting
    pub summary: SeriesSummary,
}

/// The range actually covered by the buckets, as UTC days
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeUsed {
    /// First day (YYYY-MM-DD)
    pub start: String,
    /// Last day (YYYY-MM-DD)
    pub end: String,
}

/// Caller-visible explanation for a series that produced no usable data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// Rows had timestamps but none carried a numeric value for the metric
    #[serde(rename_all = "camelCase")]
    NoNumericData {
        /// Series label
        series: String,
        /// Metric requested
        metric: Option<String>,
        /// Field that was summed
        value_field: String,
        /// Numeric fields observed in the sampled rows
        available_fields: Vec<String>,
    },

    /// Rows were present but none had a parseable timestamp
    #[serde(rename_all = "camelCase")]
    NoTimestamps {
        /// Series label
        series: String,
        /// Time field(s) tried
        time_field: String,
        /// Number of rows inspected
        rows: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoNumericData {
                metric,
                value_field,
                available_fields,
                ..
            } => {
                let name = metric.as_deref().unwrap_or(value_field.as_str());
                write!(
                    f,
                    "No numeric data found for metric \"{}\". The field \"{}\" either doesn't \
                     exist or contains no numeric values. ",
                    name, value_field
                )?;
                if available_fields.is_empty() {
                    write!(f, "No numeric fields found in the data.")
                } else {
                    write!(f, "Available numeric fields: {}", available_fields.join(", "))
                }
            }
            Diagnostic::NoTimestamps {
                series,
                time_field,
                rows,
            } => write!(
                f,
                "Series \"{}\": none of {} rows has a parseable timestamp in \"{}\"",
                series, rows, time_field
            ),
        }
    }
}

/// Complete aggregation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResult {
    /// Ordered bucket keys
    pub buckets: Vec<String>,

    /// One entry per input series, in input order
    pub series: Vec<AggregatedSeries>,

    /// Resolved range
    pub range_used: RangeUsed,

    /// Granularity used for the buckets
    pub granularity: Granularity,

    /// Chart type (passthrough)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    /// Diagnostics for series that produced no usable data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl ChartResult {
    /// All diagnostics joined into one message, if any
    pub fn diagnostic_message(&self) -> Option<String> {
        if self.diagnostics.is_empty() {
            return None;
        }
        Some(
            self.diagnostics
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Convert to pretty-printed JSON string
    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
