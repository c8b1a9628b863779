//! Bucket Generator
//!
//! Produces the canonical x-axis: every bucket between a resolved start and
//! end at a given granularity, strictly ascending, gapless, always including
//! the bucket that contains `end`. All truncation happens in UTC.
//!
//! Key formats:
//!
//! | granularity | key                | example            |
//! |-------------|--------------------|--------------------|
//! | hour        | `YYYY-MM-DD HH:00` | `2025-08-01 13:00` |
//! | day         | `YYYY-MM-DD`       | `2025-08-01`       |
//! | week        | `YYYY-Www`         | `2020-W53`         |
//! | month       | `YYYY-MM`          | `2025-08`          |
//!
//! Week keys use the ISO-8601 week-year, which differs from the calendar year
//! for a few days around New Year.

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, TimeZone, Timelike, Utc};

use crate::error::{Error, Result};
use crate::types::Granularity;

/// Start of the bucket containing `ts`
///
/// `None` when the bucket would begin outside the representable calendar,
/// which only happens within a week of `NaiveDate::MIN` or `NaiveDate::MAX`.
pub fn bucket_start(granularity: Granularity, ts: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let date = ts.date_naive();
    match granularity {
        Granularity::Hour => {
            midnight(date).checked_add_signed(Duration::hours(i64::from(ts.hour())))
        }
        Granularity::Day => Some(midnight(date)),
        Granularity::Week => week_monday(date).map(midnight),
        Granularity::Month => Some(midnight(date.with_day(1).unwrap_or(date))),
    }
}

/// Key of the bucket containing `ts`
///
/// `None` under the same conditions as [`bucket_start`], plus weeks whose
/// Thursday falls past `NaiveDate::MAX`.
pub fn bucket_key(granularity: Granularity, ts: DateTime<Utc>) -> Option<String> {
    match granularity {
        Granularity::Hour => Some(ts.format("%Y-%m-%d %H:00").to_string()),
        Granularity::Day => Some(ts.format("%Y-%m-%d").to_string()),
        Granularity::Week => iso_week_key(ts.date_naive()),
        Granularity::Month => Some(ts.format("%Y-%m").to_string()),
    }
}

/// ISO-8601 week key (`YYYY-Www`) for the week containing `date`
///
/// The week is shifted to its Monday; the Thursday of that week decides the
/// week-year, and the week number counts weeks since the week holding the
/// first Thursday of that year.
pub fn iso_week_key(date: NaiveDate) -> Option<String> {
    let thursday = week_monday(date)?.checked_add_days(Days::new(3))?;
    let week = thursday.ordinal0() / 7 + 1;
    Some(format!("{}-W{:02}", thursday.year(), week))
}

/// Monday on or before `date`
fn week_monday(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Start of the bucket following the one starting at `start`
fn next_bucket(granularity: Granularity, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match granularity {
        Granularity::Hour => start.checked_add_signed(Duration::hours(1)),
        Granularity::Day => start.checked_add_days(Days::new(1)),
        Granularity::Week => start.checked_add_days(Days::new(7)),
        Granularity::Month => start.checked_add_months(Months::new(1)),
    }
}

// ============================================================================
// Bucket Iterator
// ============================================================================

/// Iterator over bucket start instants covering `[start, end]` inclusive
#[derive(Debug, Clone)]
pub struct BucketIterator {
    /// Start of the next bucket to yield
    current: Option<DateTime<Utc>>,

    /// Inclusive range end
    end: DateTime<Utc>,

    granularity: Granularity,
}

impl BucketIterator {
    /// Create an iterator aligned to the bucket containing `start`
    pub fn new(granularity: Granularity, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            current: bucket_start(granularity, start),
            end,
            granularity,
        }
    }
}

impl Iterator for BucketIterator {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        if current > self.end {
            self.current = None;
            return None;
        }
        self.current = next_bucket(self.granularity, current);
        Some(current)
    }
}

/// Generate every bucket key for `[start, end]`
///
/// Fails only if the range would produce more than `max_buckets` keys. The
/// axis stops early at a bucket that cannot be keyed near the calendar edge.
pub fn generate_buckets(
    granularity: Granularity,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_buckets: usize,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for bucket in BucketIterator::new(granularity, start, end) {
        if keys.len() == max_buckets {
            return Err(Error::BucketLimitExceeded {
                granularity: granularity.to_string(),
                limit: max_buckets,
            });
        }
        let Some(key) = bucket_key(granularity, bucket) else {
            break;
        };
        keys.push(key);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn week(d: NaiveDate) -> String {
        iso_week_key(d).unwrap()
    }

    #[test]
    fn test_day_buckets_inclusive() {
        let keys =
            generate_buckets(Granularity::Day, ts(2025, 8, 1, 0), ts(2025, 8, 3, 0), 100).unwrap();
        assert_eq!(keys, vec!["2025-08-01", "2025-08-02", "2025-08-03"]);
    }

    #[test]
    fn test_end_inside_bucket_is_included() {
        let keys =
            generate_buckets(Granularity::Day, ts(2025, 8, 1, 12), ts(2025, 8, 2, 23), 100)
                .unwrap();
        assert_eq!(keys, vec!["2025-08-01", "2025-08-02"]);
    }

    #[test]
    fn test_hour_buckets_cross_midnight() {
        let start = Utc.with_ymd_and_hms(2025, 8, 1, 22, 15, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 8, 2, 1, 5, 0).unwrap();
        let keys = generate_buckets(Granularity::Hour, start, end, 100).unwrap();
        assert_eq!(
            keys,
            vec!["2025-08-01 22:00", "2025-08-01 23:00", "2025-08-02 00:00", "2025-08-02 01:00"]
        );
    }

    #[test]
    fn test_month_buckets_reset_day() {
        let keys =
            generate_buckets(Granularity::Month, ts(2024, 11, 30, 0), ts(2025, 2, 1, 0), 100)
                .unwrap();
        assert_eq!(keys, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
    }

    #[test]
    fn test_month_buckets_from_month_end() {
        // Jan 31 truncates to Jan 1 before stepping, so February is not skipped
        let keys =
            generate_buckets(Granularity::Month, ts(2025, 1, 31, 0), ts(2025, 3, 31, 0), 100)
                .unwrap();
        assert_eq!(keys, vec!["2025-01", "2025-02", "2025-03"]);
    }

    #[test]
    fn test_iso_week_prior_year() {
        // Friday 2021-01-01 belongs to the last week of 2020
        assert_eq!(week(date(2021, 1, 1)), "2020-W53");
        assert_eq!(week(date(2021, 1, 3)), "2020-W53");
        assert_eq!(week(date(2021, 1, 4)), "2021-W01");
        assert_eq!(week(date(2023, 1, 1)), "2022-W52");
    }

    #[test]
    fn test_iso_week_next_year() {
        // Monday 2024-12-30 starts week 1 of 2025
        assert_eq!(week(date(2024, 12, 30)), "2025-W01");
        assert_eq!(week(date(2025, 1, 1)), "2025-W01");
        assert_eq!(week(date(2024, 12, 29)), "2024-W52");
    }

    #[test]
    fn test_iso_week_matches_chrono() {
        let mut d = date(2019, 12, 1);
        while d < date(2027, 2, 1) {
            let iso = d.iso_week();
            assert_eq!(week(d), format!("{}-W{:02}", iso.year(), iso.week()), "{}", d);
            d = d + Days::new(1);
        }
    }

    #[test]
    fn test_week_buckets_start_on_monday() {
        // Wednesday 2025-01-01 through Monday 2025-01-13
        let keys =
            generate_buckets(Granularity::Week, ts(2025, 1, 1, 0), ts(2025, 1, 13, 0), 100)
                .unwrap();
        assert_eq!(keys, vec!["2025-W01", "2025-W02", "2025-W03"]);
        assert_eq!(bucket_start(Granularity::Week, ts(2025, 1, 1, 9)), Some(ts(2024, 12, 30, 0)));
    }

    #[test]
    fn test_week_buckets_across_53_week_year() {
        let keys =
            generate_buckets(Granularity::Week, ts(2020, 12, 21, 0), ts(2021, 1, 11, 0), 100)
                .unwrap();
        assert_eq!(keys, vec!["2020-W52", "2020-W53", "2021-W01", "2021-W02"]);
    }

    #[test]
    fn test_single_instant_yields_one_bucket() {
        for g in [Granularity::Hour, Granularity::Day, Granularity::Week, Granularity::Month] {
            let t = ts(2025, 8, 1, 5);
            let keys = generate_buckets(g, t, t, 10).unwrap();
            assert_eq!(keys, vec![bucket_key(g, t).unwrap()]);
        }
    }

    #[test]
    fn test_bucket_limit() {
        let err = generate_buckets(Granularity::Hour, ts(2025, 1, 1, 0), ts(2025, 12, 31, 0), 24)
            .unwrap_err();
        assert!(matches!(err, Error::BucketLimitExceeded { limit: 24, .. }));

        // Exactly at the limit is fine
        let keys =
            generate_buckets(Granularity::Hour, ts(2025, 1, 1, 0), ts(2025, 1, 1, 23), 24).unwrap();
        assert_eq!(keys.len(), 24);
    }

    #[test]
    fn test_calendar_edges_do_not_panic() {
        let edges = [DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC];
        for g in [Granularity::Hour, Granularity::Day, Granularity::Week, Granularity::Month] {
            for t in edges {
                let _ = bucket_start(g, t);
                let _ = bucket_key(g, t);
                let keys = generate_buckets(g, t, t, 10).unwrap();
                assert!(keys.len() <= 1);
            }
        }

        // Dates next to either edge either key cleanly or are refused
        for offset in 0..14 {
            let low = NaiveDate::MIN.checked_add_days(Days::new(offset)).unwrap();
            let high = NaiveDate::MAX.checked_sub_days(Days::new(offset)).unwrap();
            for d in [low, high] {
                if let Some(key) = iso_week_key(d) {
                    assert!(key.contains("-W"), "{}", key);
                }
            }
        }
    }
}
