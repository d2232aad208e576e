//! Core data types for remote read translation
//!
//! This module defines the request-scoped values passed between the
//! compiler and the assembler:
//! - `StructuredQuery`: A decoded read query (time range, matchers, hints)
//! - `CompiledStatement`: SQL text plus positional parameters
//! - `TimeSeries`: A label set with its chronologically ordered samples

use serde::Serialize;
use std::fmt;

/// Label name Prometheus uses for the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Inclusive millisecond time bounds of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start of range (Unix ms, inclusive)
    pub start_ms: i64,
    /// End of range (Unix ms, inclusive)
    pub end_ms: i64,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Start bound in whole seconds (truncating division)
    pub fn start_secs(&self) -> i64 {
        self.start_ms / 1000
    }

    /// End bound in whole seconds (truncating division)
    pub fn end_secs(&self) -> i64 {
        self.end_ms / 1000
    }
}

/// How a matcher compares a label against its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// `name="value"`
    Equal,
    /// `name!="value"`
    NotEqual,
    /// `name=~"a|b.*"`
    RegexMatch,
    /// `name!~"a|b.*"`
    RegexNotMatch,
}

impl MatchKind {
    /// Operator as written in PromQL selectors
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::RegexMatch => "=~",
            Self::RegexNotMatch => "!~",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label selection predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    pub kind: MatchKind,
    pub name: String,
    pub value: String,
}

impl LabelMatcher {
    /// Create a new matcher
    pub fn new(kind: MatchKind, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MatchKind::Equal, name, value)
    }

    pub fn not_equal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MatchKind::NotEqual, name, value)
    }

    pub fn regex(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MatchKind::RegexMatch, name, value)
    }

    pub fn not_regex(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MatchKind::RegexNotMatch, name, value)
    }
}

impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{:?}", self.name, self.kind, self.value)
    }
}

/// Optional downsampling request carried by read hints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownsampleHint {
    /// Bucket width in milliseconds
    pub step_ms: Option<i64>,
}

impl DownsampleHint {
    /// No downsampling
    pub fn raw() -> Self {
        Self { step_ms: None }
    }

    /// Downsample into buckets of `step_ms`
    pub fn step(step_ms: i64) -> Self {
        Self {
            step_ms: Some(step_ms),
        }
    }

    /// Bucket width when downsampling is active (`step_ms > 0`)
    pub fn active_step(&self) -> Option<i64> {
        self.step_ms.filter(|step| *step > 0)
    }
}

/// A decoded read query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredQuery {
    pub range: TimeRange,
    pub matchers: Vec<LabelMatcher>,
    pub hint: DownsampleHint,
}

impl StructuredQuery {
    /// Create a raw query over a time range with no matchers
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self {
            range: TimeRange::new(start_ms, end_ms),
            matchers: Vec::new(),
            hint: DownsampleHint::raw(),
        }
    }

    /// Builder method: add a matcher
    pub fn matcher(mut self, matcher: LabelMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Builder method: set the downsampling step
    pub fn step(mut self, step_ms: i64) -> Self {
        self.hint = DownsampleHint::step(step_ms);
        self
    }
}

/// SQL text with its positional parameters
///
/// Every `?` placeholder in `sql` corresponds, in order, to one entry of
/// `params`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<String>,
}

impl CompiledStatement {
    pub fn new(sql: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Number of `?` placeholders in the SQL text
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// A label attached to a time series (value never empty)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single value at a point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub timestamp_ms: i64,
}

impl Sample {
    pub fn new(value: f64, timestamp_ms: i64) -> Self {
        Self {
            value,
            timestamp_ms,
        }
    }
}

/// A label set with its samples in chronological order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    pub labels: Vec<Label>,
    pub samples: Vec<Sample>,
}

impl TimeSeries {
    /// Look up a label value by name
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }
}
