//! Series Normalizer
//!
//! Turns a request into a non-empty, ordered list of series descriptors. A
//! request either lists its series explicitly or uses the single-series
//! shorthand fields at the top level. Every descriptor borrows a row slice:
//! its own rows, else the request's shared rows, else an empty slice.

use serde_json::Value;

use crate::record::Record;
use crate::types::{ChartRequest, SeriesInput};

/// One normalized chart line, borrowing from the request
#[derive(Debug, Clone)]
pub struct SeriesDescriptor<'a> {
    /// Position in the input list
    pub index: usize,

    /// Display label
    pub label: String,

    /// Requested metric
    pub metric: Option<&'a str>,

    /// Entity (passthrough)
    pub entity: Option<&'a str>,

    /// Explicit value field
    pub value_field: Option<&'a str>,

    /// Filter (passthrough)
    pub filter: Option<&'a Value>,

    /// Rows aggregated for this series
    pub rows: &'a [Record],
}

impl<'a> SeriesDescriptor<'a> {
    fn from_input(index: usize, input: &'a SeriesInput, shared: &'a [Record]) -> Self {
        Self::build(
            index,
            input.label.as_deref(),
            input.metric.as_deref(),
            input.entity.as_deref(),
            input.value_field.as_deref(),
            input.filter.as_ref(),
            input.rows.as_deref().unwrap_or(shared),
        )
    }

    fn build(
        index: usize,
        label: Option<&'a str>,
        metric: Option<&'a str>,
        entity: Option<&'a str>,
        value_field: Option<&'a str>,
        filter: Option<&'a Value>,
        rows: &'a [Record],
    ) -> Self {
        let label = [label, metric, entity]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Series {}", index + 1));

        Self {
            index,
            label,
            metric: metric.filter(|m| !m.trim().is_empty()),
            entity,
            value_field: value_field.filter(|f| !f.trim().is_empty()),
            filter,
            rows,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_test(rows: &'a [Record]) -> Self {
        Self::build(0, None, None, None, None, None, rows)
    }
}

/// Normalize a request into series descriptors (never empty)
pub fn normalize(request: &ChartRequest) -> Vec<SeriesDescriptor<'_>> {
    let shared: &[Record] = request.rows.as_deref().unwrap_or(&[]);

    match request.series.as_deref() {
        Some(inputs) if !inputs.is_empty() => inputs
            .iter()
            .enumerate()
            .map(|(i, input)| SeriesDescriptor::from_input(i, input, shared))
            .collect(),
        _ => vec![SeriesDescriptor::build(
            0,
            request.label.as_deref(),
            request.metric.as_deref(),
            request.entity.as_deref(),
            request.value_field.as_deref(),
            request.filter.as_ref(),
            shared,
        )],
    }
}
