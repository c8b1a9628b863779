//! Property tests for bucket generation and aggregation
//!
//! Uses property-based testing (proptest) to check the bucket axis invariants
//! and end-to-end aggregation accounting over arbitrary inputs.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

// =============================================================================
// Test Data Strategies
// =============================================================================

/// Strategy for instants between 1990 and 2060, second resolution
fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    (631_152_000i64..2_871_763_200i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

/// Strategy for an instant plus a span of at most `max_hours`
fn range(max_hours: i64) -> impl Strategy<Value = (DateTime<Utc>, DateTime<Utc>)> {
    (instant(), 0..max_hours * 3600)
        .prop_map(|(start, span)| (start, start + Duration::seconds(span)))
}

fn granularity() -> impl Strategy<Value = kuba_chart::Granularity> {
    use kuba_chart::Granularity;
    prop_oneof![
        Just(Granularity::Hour),
        Just(Granularity::Day),
        Just(Granularity::Week),
        Just(Granularity::Month),
    ]
}

/// Strategy for a calendar date between 1990 and 2060
fn date() -> impl Strategy<Value = NaiveDate> {
    (0i64..25_567).prop_map(|d| NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + Duration::days(d))
}

// =============================================================================
// Bucket Axis Properties
// =============================================================================

mod bucket_axis {
    use super::*;
    use kuba_chart::aggregation::{bucket_key, bucket_start, generate_buckets, BucketIterator};
    use std::collections::HashSet;

    proptest! {
        /// First and last keys are the buckets holding start and end
        #[test]
        fn endpoints_match_containing_buckets(
            g in granularity(),
            (start, end) in range(24 * 400)
        ) {
            let keys = generate_buckets(g, start, end, 100_000).unwrap();
            prop_assert!(!keys.is_empty());
            let start_key = bucket_key(g, start);
            let end_key = bucket_key(g, end);
            prop_assert_eq!(keys.first(), start_key.as_ref());
            prop_assert_eq!(keys.last(), end_key.as_ref());
        }

        /// No duplicates, and consecutive buckets are adjacent
        #[test]
        fn buckets_are_unique_and_gapless(
            g in granularity(),
            (start, end) in range(24 * 400)
        ) {
            let starts: Vec<_> = BucketIterator::new(g, start, end).collect();
            let keys: Vec<_> = starts.iter().filter_map(|s| bucket_key(g, *s)).collect();
            prop_assert_eq!(keys.len(), starts.len());

            let unique: HashSet<_> = keys.iter().collect();
            prop_assert_eq!(unique.len(), keys.len());

            for pair in starts.windows(2) {
                prop_assert!(pair[0] < pair[1]);
                // The instant just before a bucket start belongs to the previous bucket
                let before_next = pair[1] - Duration::seconds(1);
                prop_assert_eq!(bucket_start(g, before_next), Some(pair[0]));
            }
        }

        /// Every instant in range maps onto one of the generated keys
        #[test]
        fn instants_in_range_have_a_bucket(
            g in granularity(),
            (start, end) in range(24 * 200),
            frac in 0.0f64..=1.0
        ) {
            let keys = generate_buckets(g, start, end, 100_000).unwrap();
            let offset = ((end - start).num_seconds() as f64 * frac) as i64;
            let instant = start + Duration::seconds(offset);
            let key = bucket_key(g, instant).unwrap();
            prop_assert!(keys.contains(&key));
        }
    }
}

// =============================================================================
// ISO Week Properties
// =============================================================================

mod iso_week {
    use super::*;
    use kuba_chart::aggregation::iso_week_key;

    proptest! {
        /// Week keys agree with the calendar's own ISO week computation
        #[test]
        fn key_matches_iso_calendar(d in date()) {
            let iso = d.iso_week();
            prop_assert_eq!(iso_week_key(d), Some(format!("{}-W{:02}", iso.year(), iso.week())));
        }

        /// All seven days of a week share one key
        #[test]
        fn week_days_share_key(d in date()) {
            let monday = d - Duration::days(d.weekday().num_days_from_monday() as i64);
            let key = iso_week_key(monday);
            for offset in 1..7 {
                prop_assert_eq!(iso_week_key(monday + Duration::days(offset)), key.clone());
            }
        }
    }
}

// =============================================================================
// Aggregation Properties
// =============================================================================

mod aggregation {
    use super::*;
    use kuba_chart::{ChartEngine, ChartRequest, FixedClock, Record};
    use serde_json::json;

    fn engine() -> ChartEngine {
        ChartEngine::builder()
            .with_clock(FixedClock::at_date(NaiveDate::from_ymd_opt(2025, 8, 10).unwrap()))
            .build()
            .unwrap()
    }

    fn rows_strategy() -> impl Strategy<Value = Vec<(i64, i64)>> {
        // (seconds offset within ~90 days, cash in cents)
        prop::collection::vec((0i64..90 * 86_400, 0i64..1_000_000), 0..200)
    }

    fn to_records(rows: &[(i64, i64)]) -> Vec<Record> {
        let base = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        rows.iter()
            .map(|(offset, cents)| {
                let ts = base + Duration::seconds(*offset);
                Record::from(json!({ "createdAt": ts.to_rfc3339(), "cash": *cents as f64 / 100.0 }))
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// With an inferred range every row is counted exactly once
        #[test]
        fn inferred_range_counts_every_row(
            g in granularity(),
            rows in rows_strategy()
        ) {
            let request = ChartRequest::new(g).with_rows(to_records(&rows));
            let result = engine().aggregate(&request).unwrap();
            let series = &result.series[0];

            let counted: f64 = series.values.iter().map(|v| v.unwrap_or(0.0)).sum();
            prop_assert_eq!(counted as usize, rows.len());
            prop_assert_eq!(series.summary.rows_aggregated, rows.len());
            prop_assert_eq!(series.values.len(), result.buckets.len());
        }

        /// Summed totals match the input regardless of granularity
        #[test]
        fn sum_total_matches_input(
            g in granularity(),
            rows in rows_strategy()
        ) {
            let request = ChartRequest::new(g).with_metric("cash").with_rows(to_records(&rows));
            let result = engine().aggregate(&request).unwrap();

            let expected: f64 = rows.iter().map(|(_, c)| *c as f64 / 100.0).sum();
            prop_assert!((result.series[0].summary.total - expected).abs() < 1e-6);
        }

        /// Identical input yields byte-identical output
        #[test]
        fn aggregation_is_idempotent(
            g in granularity(),
            rows in rows_strategy(),
            zero_fill in any::<bool>()
        ) {
            let request = ChartRequest::new(g)
                .with_metric("cash")
                .with_relative_period("30d")
                .with_zero_fill(zero_fill)
                .with_rows(to_records(&rows));
            let engine = engine();
            let first = engine.aggregate(&request).unwrap().to_json().unwrap();
            let second = engine.aggregate(&request).unwrap().to_json().unwrap();
            prop_assert_eq!(first, second);
        }
    }
}

// =============================================================================
// Calendar Edge Properties
// =============================================================================

mod calendar_edges {
    use super::*;
    use kuba_chart::aggregation::{bucket_key, bucket_start};
    use kuba_chart::{ChartEngine, ChartRequest, Error, Record};
    use serde_json::json;

    /// Any instant chrono can represent, at millisecond resolution
    fn any_instant() -> impl Strategy<Value = DateTime<Utc>> {
        let lo = DateTime::<Utc>::MIN_UTC.timestamp_millis();
        let hi = DateTime::<Utc>::MAX_UTC.timestamp_millis();
        (lo..=hi).prop_map(|ms| DateTime::from_timestamp_millis(ms).unwrap())
    }

    proptest! {
        /// Keying never panics; when a bucket exists it contains the instant
        #[test]
        fn bucket_lookup_is_total(g in granularity(), t in any_instant()) {
            if let Some(start) = bucket_start(g, t) {
                prop_assert!(start <= t);
            }
            let _ = bucket_key(g, t);
        }

        /// Extreme epoch-millisecond rows never abort a request with a fixed range
        #[test]
        fn extreme_rows_are_absorbed(
            g in granularity(),
            instants in prop::collection::vec(any_instant(), 1..20)
        ) {
            let rows: Vec<Record> = instants
                .iter()
                .map(|t| Record::from(json!({ "createdAt": t.timestamp_millis() })))
                .collect();
            let request = ChartRequest::new(g)
                .with_range("2025-01-01", "2025-01-31")
                .with_rows(rows.clone());
            let result = ChartEngine::new().aggregate(&request).unwrap();
            let summary = &result.series[0].summary;
            prop_assert_eq!(
                summary.rows_aggregated + summary.rows_skipped + summary.rows_out_of_range,
                rows.len()
            );

            // Inferred ranges may legitimately hit the bucket limit, but never panic
            match ChartEngine::new().aggregate(&ChartRequest::new(g).with_rows(rows)) {
                Ok(_) | Err(Error::BucketLimitExceeded { .. }) => {}
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }
    }
}
