//! Metric → value field resolution
//!
//! Decides whether a series is summed or counted, and which field is summed.
//! Precedence, first match wins:
//!
//! 1. explicit `valueField` → sum that field
//! 2. no metric → count
//! 3. metric contains a count keyword ("count", "number", ...) → count
//! 4. metric is itself a numeric field in the sampled rows → sum it
//! 5. first keyword rule whose keyword the metric contains → sum the first of
//!    the rule's candidate fields present in the sample (or the metric itself
//!    when it names a candidate, else the first candidate)
//! 6. otherwise → count

use tracing::debug;

use crate::record::Record;
use crate::types::AggregationMode;

/// Keywords that force count mode when no explicit value field is given
pub const DEFAULT_COUNT_KEYWORDS: &[&str] = &["count", "number", "users", "appointments"];

/// One (keywords → candidate fields) inference rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRule {
    /// Lowercase substrings matched against the metric
    pub keywords: Vec<String>,
    /// Candidate value fields, most preferred first
    pub fields: Vec<String>,
}

impl MetricRule {
    /// Create a rule
    pub fn new(keywords: &[&str], fields: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_ascii_lowercase()).collect(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// True when the lowercased metric contains any keyword
    pub fn matches(&self, metric_lower: &str) -> bool {
        self.keywords.iter().any(|k| metric_lower.contains(k.as_str()))
    }
}

/// How a resolution was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Caller named the value field
    Explicit,
    /// No metric given
    NoMetric,
    /// Metric contained a count keyword
    CountKeyword,
    /// Metric names a numeric field in the rows
    MetricField,
    /// Matched a keyword rule
    KeywordRule,
    /// Nothing matched
    Unmatched,
}

/// Outcome of resolving one series' metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricResolution {
    /// Aggregation mode
    pub mode: AggregationMode,
    /// Field summed (sum mode only)
    pub value_field: Option<String>,
    /// Which step decided
    pub source: ResolutionSource,
}

impl MetricResolution {
    fn count(source: ResolutionSource) -> Self {
        Self {
            mode: AggregationMode::Count,
            value_field: None,
            source,
        }
    }

    fn sum(field: impl Into<String>, source: ResolutionSource) -> Self {
        Self {
            mode: AggregationMode::Sum,
            value_field: Some(field.into()),
            source,
        }
    }
}

/// Ordered rule table for metric inference
#[derive(Debug, Clone)]
pub struct MetricResolver {
    count_keywords: Vec<String>,
    rules: Vec<MetricRule>,
}

impl Default for MetricResolver {
    fn default() -> Self {
        Self {
            count_keywords: DEFAULT_COUNT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            rules: vec![
                MetricRule::new(
                    &["revenue", "sales", "total", "amount", "cash"],
                    &["total", "cash", "amount"],
                ),
                MetricRule::new(&["price"], &["price", "sellPrice"]),
                MetricRule::new(&["stock"], &["stocks", "stock"]),
                MetricRule::new(&["quantity", "qty", "sold"], &["quantity", "qty"]),
            ],
        }
    }
}

impl MetricResolver {
    /// Resolver with no rules and no count keywords
    pub fn empty() -> Self {
        Self {
            count_keywords: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Append a rule (checked after existing rules)
    pub fn with_rule(mut self, rule: MetricRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append a count keyword
    pub fn with_count_keyword(mut self, keyword: &str) -> Self {
        self.count_keywords.push(keyword.to_ascii_lowercase());
        self
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[MetricRule] {
        &self.rules
    }

    /// Resolve a series' aggregation mode and value field
    ///
    /// `sample` is used only to check which fields actually exist.
    pub fn resolve(
        &self,
        metric: Option<&str>,
        value_field: Option<&str>,
        sample: &[Record],
    ) -> MetricResolution {
        let resolution = self.resolve_inner(metric, value_field, sample);
        debug!(
            metric = metric.unwrap_or("-"),
            mode = ?resolution.mode,
            value_field = resolution.value_field.as_deref().unwrap_or("-"),
            source = ?resolution.source,
            "Resolved series metric"
        );
        resolution
    }

    fn resolve_inner(
        &self,
        metric: Option<&str>,
        value_field: Option<&str>,
        sample: &[Record],
    ) -> MetricResolution {
        if let Some(field) = value_field {
            return MetricResolution::sum(field, ResolutionSource::Explicit);
        }

        let Some(metric) = metric else {
            return MetricResolution::count(ResolutionSource::NoMetric);
        };
        let lower = metric.to_ascii_lowercase();

        if self.count_keywords.iter().any(|k| lower.contains(k.as_str())) {
            return MetricResolution::count(ResolutionSource::CountKeyword);
        }

        if sample.iter().any(|row| row.number(metric).is_some()) {
            return MetricResolution::sum(metric, ResolutionSource::MetricField);
        }

        if let Some(rule) = self.rules.iter().find(|r| r.matches(&lower)) {
            let present = rule
                .fields
                .iter()
                .find(|f| sample.iter().any(|row| row.get_path(f).is_some()));
            let field = present
                .or_else(|| rule.fields.iter().find(|f| f.as_str() == metric))
                .or_else(|| rule.fields.first());
            if let Some(field) = field {
                return MetricResolution::sum(field.as_str(), ResolutionSource::KeywordRule);
            }
        }

        MetricResolution::count(ResolutionSource::Unmatched)
    }
}
