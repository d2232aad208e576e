//! Statement Compiler
//!
//! Compiles a `StructuredQuery` into ClickHouse SQL with positional `?`
//! parameters. Matcher names and values are always bound as parameters;
//! the only literals written into the SQL text are the configured
//! database/table/extracted-tag identifiers and the numeric time bounds and
//! step width.
//!
//! # Statement Shape
//!
//! ```text
//! SELECT metric, value AS value, tags.name, tags.value, <t>[, extracted...]
//! FROM (
//!     SELECT * FROM db.table
//!     WHERE timestamp >= <start_s> AND timestamp <= <end_s>
//!     AND (<matcher>) ...
//! )
//! [GROUP BY metric, tags.name, tags.value, t[, extracted...]]
//! ORDER BY t ASC
//! ```

use crate::config::QueryConfig;
use crate::query::types::*;

/// Placeholder for a bound parameter
const PLACEHOLDER: &str = "?";

/// Expression looking up a tag value inside the parallel tag arrays
const TAG_VALUE_LOOKUP: &str = "tags.value[indexOf(tags.name, ?)]";

/// A rendered predicate with the parameters it binds, in order
#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    expr: String,
    params: Vec<String>,
}

/// Comparison operators used when rendering one regex alternation
struct RegexOperators {
    /// Operator for alternatives without a wildcard
    literal: &'static str,
    /// Operator for alternatives containing `.*`
    pattern: &'static str,
    /// Boolean connective joining the alternatives
    join: &'static str,
}

const REGEX_MATCH_OPS: RegexOperators = RegexOperators {
    literal: "=",
    pattern: "LIKE",
    join: "OR",
};

const REGEX_NOT_MATCH_OPS: RegexOperators = RegexOperators {
    literal: "!=",
    pattern: "NOT LIKE",
    join: "AND",
};

/// Compiles structured queries into parameterized SQL
#[derive(Debug, Clone)]
pub struct StatementCompiler {
    config: QueryConfig,
}

impl StatementCompiler {
    /// Create a compiler for the configured table
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Get the query configuration
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Compile a query into SQL text and its ordered parameters
    pub fn compile(&self, query: &StructuredQuery) -> CompiledStatement {
        let inner = self.select_statement(query);

        let statement = match query.hint.active_step() {
            Some(step) => self.wrap_grouping(inner, step),
            None => self.wrap_raw(inner),
        };

        tracing::debug!(
            sql = %statement.sql,
            params = ?statement.params,
            "Compiled statement"
        );

        statement
    }

    /// Inner SELECT filtering by time range and matchers
    fn select_statement(&self, query: &StructuredQuery) -> CompiledStatement {
        let mut sql = format!(
            "SELECT * FROM {}.{} WHERE timestamp >= {} AND timestamp <= {}",
            self.config.database,
            self.config.table,
            query.range.start_secs(),
            query.range.end_secs()
        );
        let mut params = Vec::new();

        for matcher in &query.matchers {
            let predicate = self.render_matcher(matcher);
            sql.push_str(" AND (");
            sql.push_str(&predicate.expr);
            sql.push(')');
            params.extend(predicate.params);
        }

        CompiledStatement::new(sql, params)
    }

    /// Project raw rows ordered by time
    fn wrap_raw(&self, inner: CompiledStatement) -> CompiledStatement {
        let columns = self.projection(
            "value AS value",
            "toUnixTimestamp(timestamp) * 1000 AS t".to_string(),
        );

        let sql = format!(
            "SELECT {} FROM ({}) ORDER BY t ASC",
            columns.join(", "),
            inner.sql
        );

        CompiledStatement::new(sql, inner.params)
    }

    /// Project the maximum value per series per `step` bucket
    fn wrap_grouping(&self, inner: CompiledStatement, step: i64) -> CompiledStatement {
        let columns = self.projection(
            "MAX(value) AS value",
            format!(
                "intDiv(toUnixTimestamp(timestamp) * 1000, {step}) * {step} AS t"
            ),
        );

        let mut group_by = vec!["metric", "tags.name", "tags.value", "t"];
        group_by.extend(self.config.extract_tags.iter().map(String::as_str));

        let sql = format!(
            "SELECT {} FROM ({}) GROUP BY {} ORDER BY t ASC",
            columns.join(", "),
            inner.sql,
            group_by.join(", ")
        );

        CompiledStatement::new(sql, inner.params)
    }

    /// Mandatory columns followed by the extracted tag columns
    fn projection(&self, value: &str, timestamp: String) -> Vec<String> {
        let mut columns = vec![
            "metric".to_string(),
            value.to_string(),
            "tags.name".to_string(),
            "tags.value".to_string(),
            timestamp,
        ];
        columns.extend(self.config.extract_tags.iter().cloned());
        columns
    }

    fn render_matcher(&self, matcher: &LabelMatcher) -> Predicate {
        match matcher.kind {
            MatchKind::Equal => self.render_comparison(&matcher.name, &matcher.value, "="),
            MatchKind::NotEqual => self.render_comparison(&matcher.name, &matcher.value, "!="),
            MatchKind::RegexMatch => {
                self.render_alternation(&matcher.name, &matcher.value, &REGEX_MATCH_OPS)
            }
            MatchKind::RegexNotMatch => {
                self.render_alternation(&matcher.name, &matcher.value, &REGEX_NOT_MATCH_OPS)
            }
        }
    }

    /// Render `<column> <op> ?` for the column holding `name`
    fn render_comparison(&self, name: &str, value: &str, op: &str) -> Predicate {
        if name == METRIC_NAME_LABEL {
            Predicate {
                expr: format!("metric {op} {PLACEHOLDER}"),
                params: vec![value.to_string()],
            }
        } else if let Some(column) = self.extracted_column(name) {
            Predicate {
                expr: format!("{column} {op} {PLACEHOLDER}"),
                params: vec![value.to_string()],
            }
        } else {
            Predicate {
                expr: format!("{TAG_VALUE_LOOKUP} {op} {PLACEHOLDER}"),
                params: vec![name.to_string(), value.to_string()],
            }
        }
    }

    /// Split a regex on `|` and render each alternative
    ///
    /// Only `.*` is understood as a wildcard; every other character is
    /// passed through literally.
    fn render_alternation(&self, name: &str, regex: &str, ops: &RegexOperators) -> Predicate {
        let alternatives: Vec<Predicate> = regex
            .split('|')
            .map(|alternative| {
                if alternative.contains(".*") {
                    self.render_comparison(name, &alternative.replace(".*", "%"), ops.pattern)
                } else {
                    self.render_comparison(name, alternative, ops.literal)
                }
            })
            .collect();

        let separator = format!(" {} ", ops.join);
        let expr = alternatives
            .iter()
            .map(|p| p.expr.as_str())
            .collect::<Vec<_>>()
            .join(separator.as_str());
        let params = alternatives.into_iter().flat_map(|p| p.params).collect();

        Predicate { expr, params }
    }

    /// Configured column name for an extracted tag
    fn extracted_column(&self, name: &str) -> Option<&str> {
        self.config
            .extract_tags
            .iter()
            .find(|tag| tag.as_str() == name)
            .map(String::as_str)
    }
}
