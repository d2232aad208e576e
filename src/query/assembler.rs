//! Result Assembler
//!
//! Consumes the rows of a compiled statement in a single forward pass and
//! groups them into labeled time series.
//!
//! # Label Precedence
//!
//! ```text
//! metric column → extracted tag columns → tags.name/tags.value arrays
//! ```
//!
//! A label from an earlier source shadows a same-named one from a later
//! source. Empty values are never emitted.

use crate::query::error::{QueryError, QueryResult};
use crate::query::types::{Label, Sample, TimeSeries};
use std::collections::HashMap;

/// Column holding the metric name
pub const METRIC_COLUMN: &str = "metric";
/// Column holding the sample value
pub const VALUE_COLUMN: &str = "value";
/// Column holding the sample timestamp in milliseconds
pub const TIME_COLUMN: &str = "t";
/// Column holding the tag names array
pub const TAG_NAMES_COLUMN: &str = "tags.name";
/// Column holding the tag values array
pub const TAG_VALUES_COLUMN: &str = "tags.value";

/// Named-column access to one row of a query result
pub trait ResultRow {
    /// Read a floating point column
    fn float(&self, column: &str) -> QueryResult<f64>;

    /// Read an integer column
    fn integer(&self, column: &str) -> QueryResult<i64>;

    /// Read a nullable string column
    fn text(&self, column: &str) -> QueryResult<Option<String>>;

    /// Read an array-of-strings column
    fn text_array(&self, column: &str) -> QueryResult<Vec<String>>;
}

/// Group rows into time series
///
/// Series are returned in the order their label set was first seen, and
/// samples keep the order the rows were consumed in. Any row error aborts
/// assembly.
pub fn assemble<I, R>(rows: I, extract_tags: &[String]) -> QueryResult<Vec<TimeSeries>>
where
    I: IntoIterator<Item = QueryResult<R>>,
    R: ResultRow,
{
    let mut positions: HashMap<Vec<Label>, usize> = HashMap::new();
    let mut series: Vec<TimeSeries> = Vec::new();
    let mut row_count = 0usize;

    for row in rows {
        let row = row?;
        row_count += 1;

        let sample = Sample::new(row.float(VALUE_COLUMN)?, row.integer(TIME_COLUMN)?);
        let labels = row_labels(&row, extract_tags)?;

        match positions.get(&labels) {
            Some(&position) => series[position].samples.push(sample),
            None => {
                positions.insert(labels.clone(), series.len());
                series.push(TimeSeries {
                    labels,
                    samples: vec![sample],
                });
            }
        }
    }

    tracing::debug!("Mapped {} rows in {} time series", row_count, series.len());
    Ok(series)
}

/// Build the canonical (name-sorted) label set of a row
fn row_labels<R: ResultRow>(row: &R, extract_tags: &[String]) -> QueryResult<Vec<Label>> {
    let mut labels = Vec::new();

    push_label(&mut labels, METRIC_COLUMN, row.text(METRIC_COLUMN)?);

    for tag in extract_tags {
        if labels.iter().any(|l: &Label| l.name == *tag) {
            continue;
        }
        push_label(&mut labels, tag, row.text(tag)?);
    }

    let names = row.text_array(TAG_NAMES_COLUMN)?;
    let values = row.text_array(TAG_VALUES_COLUMN)?;
    if names.len() != values.len() {
        return Err(QueryError::TagArrayMismatch {
            names: names.len(),
            values: values.len(),
        });
    }

    for (name, value) in names.into_iter().zip(values) {
        if labels.iter().any(|l: &Label| l.name == name) {
            continue;
        }
        push_label(&mut labels, &name, Some(value));
    }

    labels.sort();
    Ok(labels)
}

fn push_label(labels: &mut Vec<Label>, name: &str, value: Option<String>) {
    match value {
        Some(value) if !value.is_empty() => labels.push(Label::new(name, value)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory row for exercising the assembler
    #[derive(Debug, Clone, Default)]
    struct TestRow {
        value: f64,
        t: i64,
        columns: HashMap<String, Option<String>>,
        tag_names: Vec<String>,
        tag_values: Vec<String>,
    }

    impl TestRow {
        fn new(metric: &str, value: f64, t: i64) -> Self {
            let mut columns = HashMap::new();
            columns.insert(METRIC_COLUMN.to_string(), Some(metric.to_string()));
            Self {
                value,
                t,
                columns,
                ..Default::default()
            }
        }

        fn column(mut self, name: &str, value: Option<&str>) -> Self {
            self.columns
                .insert(name.to_string(), value.map(str::to_string));
            self
        }

        fn tag(mut self, name: &str, value: &str) -> Self {
            self.tag_names.push(name.to_string());
            self.tag_values.push(value.to_string());
            self
        }
    }

    impl ResultRow for TestRow {
        fn float(&self, column: &str) -> QueryResult<f64> {
            assert_eq!(column, VALUE_COLUMN);
            Ok(self.value)
        }

        fn integer(&self, column: &str) -> QueryResult<i64> {
            assert_eq!(column, TIME_COLUMN);
            Ok(self.t)
        }

        fn text(&self, column: &str) -> QueryResult<Option<String>> {
            self.columns
                .get(column)
                .cloned()
                .ok_or_else(|| QueryError::MalformedRow(format!("missing column {column}")))
        }

        fn text_array(&self, column: &str) -> QueryResult<Vec<String>> {
            match column {
                TAG_NAMES_COLUMN => Ok(self.tag_names.clone()),
                TAG_VALUES_COLUMN => Ok(self.tag_values.clone()),
                other => Err(QueryError::MalformedRow(format!("missing column {other}"))),
            }
        }
    }

    fn ok_rows(rows: Vec<TestRow>) -> Vec<QueryResult<TestRow>> {
        rows.into_iter().map(Ok).collect()
    }

    fn no_tags() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn test_single_series_in_row_order() {
        let rows = vec![
            TestRow::new("up", 1.0, 1_000).tag("job", "api"),
            TestRow::new("up", 0.0, 2_000).tag("job", "api"),
            TestRow::new("up", 1.0, 3_000).tag("job", "api"),
        ];

        let series = assemble(ok_rows(rows), &no_tags()).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(
            series[0].labels,
            vec![Label::new("job", "api"), Label::new("metric", "up")]
        );
        let timestamps: Vec<i64> = series[0].samples.iter().map(|s| s.timestamp_ms).collect();
        assert_eq!(timestamps, vec![1_000, 2_000, 3_000]);
        assert_eq!(series[0].samples[1].value, 0.0);
    }

    #[test]
    fn test_identical_labels_merge() {
        let rows = vec![
            TestRow::new("up", 1.0, 1_000).tag("job", "api").tag("zone", "a"),
            TestRow::new("up", 2.0, 2_000).tag("zone", "a").tag("job", "api"),
        ];

        let series = assemble(ok_rows(rows), &no_tags()).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].samples.len(), 2);
    }

    #[test]
    fn test_different_tag_value_splits_series() {
        let rows = vec![
            TestRow::new("up", 1.0, 1_000).tag("job", "api"),
            TestRow::new("up", 1.0, 1_000).tag("job", "web"),
        ];

        let series = assemble(ok_rows(rows), &no_tags()).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label("job"), Some("api"));
        assert_eq!(series[1].label("job"), Some("web"));
    }

    #[test]
    fn test_first_seen_series_order() {
        let rows = vec![
            TestRow::new("b", 1.0, 1_000),
            TestRow::new("a", 1.0, 1_000),
            TestRow::new("b", 2.0, 2_000),
        ];

        let series = assemble(ok_rows(rows), &no_tags()).unwrap();

        assert_eq!(series[0].label("metric"), Some("b"));
        assert_eq!(series[0].samples.len(), 2);
        assert_eq!(series[1].label("metric"), Some("a"));
    }

    #[test]
    fn test_extracted_tag_shadows_array_tag() {
        let rows = vec![TestRow::new("up", 1.0, 1_000)
            .column("pod", Some("from-column"))
            .tag("pod", "from-array")];

        let series = assemble(ok_rows(rows), &["pod".to_string()]).unwrap();

        assert_eq!(series[0].label("pod"), Some("from-column"));
        assert_eq!(series[0].labels.len(), 2);
    }

    #[test]
    fn test_metric_shadows_array_tag() {
        let rows = vec![TestRow::new("up", 1.0, 1_000).tag("metric", "other")];

        let series = assemble(ok_rows(rows), &no_tags()).unwrap();

        assert_eq!(series[0].labels, vec![Label::new("metric", "up")]);
    }

    #[test]
    fn test_repeated_extracted_tags_emit_one_label() {
        let rows = vec![TestRow::new("up", 1.0, 1_000).column("pod", Some("a"))];
        let extract_tags = vec!["pod".to_string(), "pod".to_string(), "metric".to_string()];

        let series = assemble(ok_rows(rows), &extract_tags).unwrap();

        assert_eq!(
            series[0].labels,
            vec![Label::new("metric", "up"), Label::new("pod", "a")]
        );
    }

    #[test]
    fn test_empty_extracted_tag_does_not_shadow() {
        let rows = vec![TestRow::new("up", 1.0, 1_000)
            .column("pod", Some(""))
            .tag("pod", "from-array")];

        let series = assemble(ok_rows(rows), &["pod".to_string()]).unwrap();

        assert_eq!(series[0].label("pod"), Some("from-array"));
    }

    #[test]
    fn test_empty_values_dropped() {
        let rows = vec![TestRow::new("", 1.0, 1_000)
            .column("pod", None)
            .column("namespace", Some(""))
            .tag("job", "")
            .tag("zone", "a")];

        let series = assemble(
            ok_rows(rows),
            &["pod".to_string(), "namespace".to_string()],
        )
        .unwrap();

        assert_eq!(series[0].labels, vec![Label::new("zone", "a")]);
    }

    #[test]
    fn test_tag_array_mismatch() {
        let mut row = TestRow::new("up", 1.0, 1_000)
            .tag("a", "1")
            .tag("b", "2")
            .tag("c", "3");
        row.tag_values.pop();

        let result = assemble(ok_rows(vec![row]), &no_tags());

        assert!(matches!(
            result,
            Err(QueryError::TagArrayMismatch {
                names: 3,
                values: 2
            })
        ));
    }

    #[test]
    fn test_row_error_aborts() {
        let rows = vec![
            Ok(TestRow::new("up", 1.0, 1_000)),
            Err(QueryError::Execution("connection reset".to_string())),
        ];

        let result = assemble(rows, &no_tags());

        assert!(matches!(result, Err(QueryError::Execution(_))));
    }

    #[test]
    fn test_missing_extracted_column() {
        let rows = vec![TestRow::new("up", 1.0, 1_000)];

        let result = assemble(ok_rows(rows), &["pod".to_string()]);

        assert!(matches!(result, Err(QueryError::MalformedRow(_))));
    }

    #[test]
    fn test_assemble_is_repeatable() {
        let rows = vec![
            TestRow::new("up", 1.0, 1_000).tag("job", "api"),
            TestRow::new("up", 1.0, 1_000).tag("job", "web"),
            TestRow::new("up", 0.0, 2_000).tag("job", "api"),
        ];

        let first = assemble(ok_rows(rows.clone()), &no_tags()).unwrap();
        let second = assemble(ok_rows(rows), &no_tags()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input() {
        let series = assemble(Vec::<QueryResult<TestRow>>::new(), &no_tags()).unwrap();
        assert!(series.is_empty());
    }
}
