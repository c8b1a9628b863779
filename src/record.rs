//! Typed accessor over loosely shaped business records
//!
//! Rows arrive as JSON objects whose shape the engine does not control. A
//! `Record` wraps one object and exposes pure lookups: dotted-path field
//! access, timestamp parsing, and lenient number coercion. Anything that is
//! not a JSON object deserializes to an empty record, which then simply has
//! no timestamp and is skipped during aggregation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Naive datetime layouts accepted in addition to RFC 3339
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// One business record (order, appointment, purchase, ...)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a top-level field
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Top-level fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a field by name or dotted path
    ///
    /// A key containing dots that exists verbatim wins over path traversal.
    /// Numeric segments index into arrays (`items.0.price`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        if !path.contains('.') {
            return None;
        }

        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Parsed timestamp at `path`, if present and well-formed
    pub fn timestamp(&self, path: &str) -> Option<DateTime<Utc>> {
        self.get_path(path).and_then(parse_timestamp_value)
    }

    /// First parseable timestamp among `paths`, tried in order
    pub fn timestamp_any<S: AsRef<str>>(&self, paths: &[S]) -> Option<DateTime<Utc>> {
        paths.iter().find_map(|p| self.timestamp(p.as_ref()))
    }

    /// Numeric value at `path`, coercing formatted strings
    pub fn number(&self, path: &str) -> Option<f64> {
        self.get_path(path).and_then(coerce_number)
    }

    /// Names of top-level fields holding JSON numbers
    pub fn numeric_fields(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, v)| v.is_number())
            .map(|(k, _)| k.as_str())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Record::from)
    }
}

/// Sorted, de-duplicated numeric field names across `rows`
pub fn numeric_field_names(rows: &[Record]) -> Vec<String> {
    rows.iter()
        .flat_map(Record::numeric_fields)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Parse a timestamp string
///
/// Accepts RFC 3339 (any offset, normalized to UTC), naive date-times (taken
/// as UTC) and plain `YYYY-MM-DD` dates (UTC midnight).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a timestamp from a JSON value
///
/// Numbers are epoch milliseconds.
pub fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

/// Coerce a JSON value to a number
///
/// Strings are stripped of everything except digits, `.` and `-` first, so
/// "$1,250.50" becomes 1250.5. Returns `None` when nothing numeric remains.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}
