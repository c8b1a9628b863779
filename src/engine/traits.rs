//! Trait definitions for the pluggable parts of the engine

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

// =============================================================================
// Clock Trait
// =============================================================================

/// Source of "now" for relative periods and the fallback window
///
/// Injected so that identical requests produce identical results under test.
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;

    /// Start of the current UTC day
    fn today(&self) -> DateTime<Utc> {
        let date = self.now().date_naive();
        Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Clock pinned to midnight UTC of the given date
    pub fn at_date(date: NaiveDate) -> Self {
        Self(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
