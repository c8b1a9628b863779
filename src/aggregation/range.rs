//! Range Resolver
//!
//! Determines the inclusive `[start, end]` a chart must cover. Each bound is
//! resolved independently, first source wins:
//!
//! 1. explicit `startDate` / `endDate`
//! 2. earliest / latest timestamp in a bounded sample of the rows
//! 3. a relative period (`7d`, `4w`): the trailing N UTC days ending today
//! 4. a trailing fallback window ending at the start of today (UTC)
//!
//! Sampled rows whose bucket cannot be keyed at the requested granularity
//! (timestamps next to the calendar edge) take no part in inference.
//!
//! An inverted range is swapped rather than rejected.

use chrono::{DateTime, Days, Utc};
use tracing::{debug, warn};

use super::bucket::bucket_key;
use super::normalizer::SeriesDescriptor;
use super::TimeField;
use crate::engine::traits::Clock;
use crate::record::parse_timestamp;
use crate::types::{Granularity, RangeUsed};

/// Where a resolved bound came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSource {
    /// Caller-supplied date
    Explicit,
    /// Earliest/latest sampled row timestamp
    Data,
    /// Relative period shorthand
    Relative,
    /// Trailing default window
    Fallback,
}

/// A resolved inclusive range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Range start
    pub start: DateTime<Utc>,
    /// Range end (inclusive)
    pub end: DateTime<Utc>,
    /// Source of the start bound
    pub start_source: RangeSource,
    /// Source of the end bound
    pub end_source: RangeSource,
}

impl ResolvedRange {
    /// Range as UTC days
    pub fn to_range_used(&self) -> RangeUsed {
        RangeUsed {
            start: self.start.format("%Y-%m-%d").to_string(),
            end: self.end.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Inputs to range resolution borrowed from the request
#[derive(Debug, Clone, Copy)]
pub struct RangeHints<'a> {
    /// Explicit start
    pub start_date: Option<&'a str>,
    /// Explicit end
    pub end_date: Option<&'a str>,
    /// Relative period shorthand
    pub relative_period: Option<&'a str>,
    /// Granularity the range will be bucketed at
    pub granularity: Granularity,
}

/// Resolves chart ranges against a clock
pub struct RangeResolver<'c> {
    clock: &'c dyn Clock,
    sample_limit: usize,
    default_window_days: u32,
}

impl<'c> RangeResolver<'c> {
    /// Create a resolver
    pub fn new(clock: &'c dyn Clock, sample_limit: usize, default_window_days: u32) -> Self {
        Self {
            clock,
            sample_limit,
            default_window_days,
        }
    }

    /// Resolve the range for the given series
    pub fn resolve(
        &self,
        hints: RangeHints<'_>,
        series: &[SeriesDescriptor<'_>],
        time_field: &TimeField<'_>,
    ) -> ResolvedRange {
        let mut start =
            explicit_bound("startDate", hints.start_date).map(|t| (t, RangeSource::Explicit));
        let mut end = explicit_bound("endDate", hints.end_date).map(|t| (t, RangeSource::Explicit));

        if start.is_none() || end.is_none() {
            if let Some((earliest, latest)) =
                self.sample_bounds(series, time_field, hints.granularity)
            {
                start = start.or(Some((earliest, RangeSource::Data)));
                end = end.or(Some((latest, RangeSource::Data)));
            }
        }

        if start.is_none() || end.is_none() {
            if let Some(days) = hints.relative_period.and_then(parse_relative_period) {
                let (from, to) = self.trailing_window(days);
                start = start.or(Some((from, RangeSource::Relative)));
                end = end.or(Some((to, RangeSource::Relative)));
            }
        }

        let (fallback_start, fallback_end) = self.trailing_window(self.default_window_days);
        let (mut start, start_source) = start.unwrap_or((fallback_start, RangeSource::Fallback));
        let (mut end, end_source) = end.unwrap_or((fallback_end, RangeSource::Fallback));

        if start > end {
            debug!(%start, %end, "Swapping inverted chart range");
            std::mem::swap(&mut start, &mut end);
        }

        ResolvedRange {
            start,
            end,
            start_source,
            end_source,
        }
    }

    /// `days` UTC days ending at the start of today
    fn trailing_window(&self, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = self.clock.today();
        let span = u64::from(days.max(1) - 1);
        let start = today.checked_sub_days(Days::new(span)).unwrap_or(today);
        (start, today)
    }

    /// Earliest and latest parseable timestamps in the first `sample_limit`
    /// rows across all series
    fn sample_bounds(
        &self,
        series: &[SeriesDescriptor<'_>],
        time_field: &TimeField<'_>,
        granularity: Granularity,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        series
            .iter()
            .flat_map(|s| s.rows.iter())
            .take(self.sample_limit)
            .filter_map(|row| time_field.extract(row))
            .filter(|ts| bucket_key(granularity, *ts).is_some())
            .fold(None, |acc, ts| match acc {
                None => Some((ts, ts)),
                Some((lo, hi)) => Some((lo.min(ts), hi.max(ts))),
            })
    }
}

fn explicit_bound(name: &str, value: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = value?;
    let parsed = parse_timestamp(raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        warn!(field = name, value = raw, "Ignoring unparseable explicit date");
    }
    parsed
}

/// Parse a relative period into a number of days
///
/// Accepts `<N>d` and `<N>w`, case-insensitive, N >= 1.
pub fn parse_relative_period(period: &str) -> Option<u32> {
    let period = period.trim().to_ascii_lowercase();
    let (digits, multiplier) = if let Some(n) = period.strip_suffix('d') {
        (n, 1)
    } else if let Some(n) = period.strip_suffix('w') {
        (n, 7)
    } else {
        warn!(period = %period, "Ignoring unsupported relative period");
        return None;
    };

    match digits.trim().parse::<u32>() {
        Ok(n) if n > 0 => n.checked_mul(multiplier),
        _ => {
            warn!(period = %period, "Ignoring unsupported relative period");
            None
        }
    }
}
