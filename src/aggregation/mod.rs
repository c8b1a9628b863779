//! Chart Aggregation Pipeline
//!
//! Four stages run in order for each request; nothing is shared between
//! requests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │         Series Normalizer           │
//! │  series list | shorthand → lines    │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │          Range Resolver             │
//! │ explicit → data → relative → window │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │         Bucket Generator            │
//! │   hour | day | ISO week | month     │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │         Series Aggregator           │
//! │  count | sum per bucket, zero-fill  │
//! └─────────────────────────────────────┘
//! ```

pub mod bucket;
pub mod metric;
pub mod normalizer;
pub mod range;
pub mod series;

use chrono::{DateTime, Utc};

use crate::record::Record;

pub use bucket::{bucket_key, bucket_start, generate_buckets, iso_week_key, BucketIterator};
pub use metric::{MetricResolution, MetricResolver, MetricRule, ResolutionSource};
pub use normalizer::{normalize, SeriesDescriptor};
pub use range::{parse_relative_period, RangeHints, RangeResolver, RangeSource, ResolvedRange};
pub use series::{BucketState, FillPolicy, SeriesAggregator};

/// Where a row's timestamp is read from
#[derive(Debug, Clone, Copy)]
pub enum TimeField<'a> {
    /// A single field or dotted path named by the request
    Named(&'a str),
    /// Configured fallbacks tried in order
    Candidates(&'a [String]),
}

impl<'a> TimeField<'a> {
    /// Timestamp of `row`, if any
    pub fn extract(&self, row: &Record) -> Option<DateTime<Utc>> {
        match self {
            TimeField::Named(path) => row.timestamp(path),
            TimeField::Candidates(paths) => row.timestamp_any(paths),
        }
    }

    /// Human-readable field description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            TimeField::Named(path) => path.to_string(),
            TimeField::Candidates(paths) => paths.join(" | "),
        }
    }
}
