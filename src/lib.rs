//! Kuba Chart - on-demand time-series aggregation for charts
//!
//! Turns an in-memory collection of timestamped business records into a
//! chart-ready series set:
//! - Series normalization (explicit series list or single-series shorthand)
//! - Range resolution from explicit dates, the data itself, or relative periods
//! - Calendar-aware bucket generation (hour, day, ISO week, month)
//! - Count/sum aggregation with metric → field inference and zero-fill
//!
//! # Example
//!
//! ```rust
//! use kuba_chart::{aggregate, ChartRequest, Granularity, Record};
//! use serde_json::json;
//!
//! let rows: Vec<Record> = serde_json::from_value(json!([
//!     { "createdAt": "2025-08-01", "cash": 1000 },
//!     { "createdAt": "2025-08-02", "cash": 1500 },
//!     { "createdAt": "2025-08-03", "cash": 2000 },
//! ])).unwrap();
//!
//! let request = ChartRequest::new(Granularity::Day)
//!     .with_metric("cash")
//!     .with_range("2025-08-01", "2025-08-03")
//!     .with_rows(rows);
//!
//! let result = aggregate(&request).unwrap();
//! assert_eq!(result.buckets, vec!["2025-08-01", "2025-08-02", "2025-08-03"]);
//! assert_eq!(result.series[0].summary.total, 4500.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Prometheus metrics for aggregation requests
pub mod metrics;

/// Normalizer, range resolver, bucket generator and series aggregator
pub mod aggregation;

/// Engine entry point with injectable clock
pub mod engine;

// Re-export main types
pub use engine::{ChartEngine, ChartEngineBuilder, Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use record::Record;
pub use types::{
    AggregatedSeries, AggregationMode, ChartOptions, ChartRequest, ChartResult, Diagnostic,
    Granularity, RangeUsed, SeriesInput, SeriesSummary,
};

/// Aggregate a request with default configuration and the system clock
pub fn aggregate(request: &ChartRequest) -> Result<ChartResult> {
    ChartEngine::new().aggregate(request)
}
