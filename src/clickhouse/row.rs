//! JSONEachRow result rows
//!
//! ClickHouse answers `FORMAT JSONEachRow` with one JSON object per line.
//! `JsonRows` walks the response body line by line, parsing each row only
//! when it is pulled.

use crate::query::{QueryError, QueryResult, ResultRow};
use serde_json::{Map, Value};

/// One row of a JSONEachRow response
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRow {
    columns: Map<String, Value>,
}

impl JsonRow {
    /// Parse a single JSONEachRow line
    pub fn parse(line: &str) -> QueryResult<Self> {
        match serde_json::from_str::<Value>(line)? {
            Value::Object(columns) => Ok(Self { columns }),
            other => Err(QueryError::MalformedRow(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }

    fn column(&self, column: &str) -> QueryResult<&Value> {
        self.columns
            .get(column)
            .ok_or_else(|| QueryError::MalformedRow(format!("missing column {column:?}")))
    }
}

fn type_error(column: &str, expected: &str, value: &Value) -> QueryError {
    QueryError::MalformedRow(format!(
        "column {column:?}: expected {expected}, got {value}"
    ))
}

impl ResultRow for JsonRow {
    fn float(&self, column: &str) -> QueryResult<f64> {
        match self.column(column)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| type_error(column, "a float", &Value::Number(n.clone()))),
            // ClickHouse writes NaN and infinities as null unless quoted
            Value::Null => Ok(f64::NAN),
            Value::String(s) => s
                .parse()
                .map_err(|_| type_error(column, "a float", &Value::String(s.clone()))),
            other => Err(type_error(column, "a float", other)),
        }
    }

    fn integer(&self, column: &str) -> QueryResult<i64> {
        match self.column(column)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
                .ok_or_else(|| type_error(column, "an integer", &Value::Number(n.clone()))),
            Value::String(s) => s
                .parse()
                .map_err(|_| type_error(column, "an integer", &Value::String(s.clone()))),
            other => Err(type_error(column, "an integer", other)),
        }
    }

    fn text(&self, column: &str) -> QueryResult<Option<String>> {
        match self.column(column)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(type_error(column, "a string", other)),
        }
    }

    fn text_array(&self, column: &str) -> QueryResult<Vec<String>> {
        match self.column(column)? {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(type_error(column, "an array of strings", other)),
                })
                .collect(),
            other => Err(type_error(column, "an array of strings", other)),
        }
    }
}

/// Forward-only cursor over a JSONEachRow response body
#[derive(Debug)]
pub struct JsonRows {
    body: String,
    position: usize,
}

impl JsonRows {
    pub fn new(body: String) -> Self {
        Self { body, position: 0 }
    }
}

impl Iterator for JsonRows {
    type Item = QueryResult<JsonRow>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.body.len() {
            let rest = &self.body[self.position..];
            let (line, consumed) = match rest.find('\n') {
                Some(end) => (&rest[..end], end + 1),
                None => (rest, rest.len()),
            };
            self.position += consumed;

            let line = line.trim();
            if !line.is_empty() {
                return Some(JsonRow::parse(line));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{assemble, Label};

    #[test]
    fn test_parse_row() {
        let row = JsonRow::parse(
            r#"{"metric":"up","value":1.5,"tags.name":["job"],"tags.value":["api"],"t":1000,"pod":null}"#,
        )
        .unwrap();

        assert_eq!(row.float("value").unwrap(), 1.5);
        assert_eq!(row.integer("t").unwrap(), 1000);
        assert_eq!(row.text("metric").unwrap().as_deref(), Some("up"));
        assert_eq!(row.text("pod").unwrap(), None);
        assert_eq!(row.text_array("tags.name").unwrap(), vec!["job"]);
    }

    #[test]
    fn test_quoted_numbers() {
        let row = JsonRow::parse(r#"{"value":"nan","t":"1700000000000"}"#).unwrap();

        assert!(row.float("value").unwrap().is_nan());
        assert_eq!(row.integer("t").unwrap(), 1_700_000_000_000);
    }

    #[test]
    fn test_null_value_is_nan() {
        let row = JsonRow::parse(r#"{"value":null}"#).unwrap();
        assert!(row.float("value").unwrap().is_nan());
    }

    #[test]
    fn test_numeric_extracted_tag() {
        let row = JsonRow::parse(r#"{"shard":3}"#).unwrap();
        assert_eq!(row.text("shard").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_missing_column() {
        let row = JsonRow::parse(r#"{"value":1}"#).unwrap();
        assert!(matches!(row.integer("t"), Err(QueryError::MalformedRow(_))));
    }

    #[test]
    fn test_wrong_type() {
        let row = JsonRow::parse(r#"{"tags.name":"job","t":1.5}"#).unwrap();
        assert!(row.text_array("tags.name").is_err());
        assert!(row.integer("t").is_err());
    }

    #[test]
    fn test_non_object_line() {
        assert!(matches!(
            JsonRow::parse("[1,2]"),
            Err(QueryError::MalformedRow(_))
        ));
    }

    #[test]
    fn test_rows_skip_blank_lines() {
        let body = "{\"t\":1}\n\n{\"t\":2}\r\n{\"t\":3}".to_string();

        let rows: Vec<JsonRow> = JsonRows::new(body).collect::<QueryResult<_>>().unwrap();

        let timestamps: Vec<i64> = rows.iter().map(|r| r.integer("t").unwrap()).collect();
        assert_eq!(timestamps, vec![1, 2, 3]);
    }

    #[test]
    fn test_rows_surface_bad_line() {
        let mut rows = JsonRows::new("{\"t\":1}\nnot json\n".to_string());

        assert!(rows.next().unwrap().is_ok());
        assert!(rows.next().unwrap().is_err());
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_assemble_json_rows() {
        let body = concat!(
            r#"{"metric":"up","value":1,"tags.name":["job"],"tags.value":["api"],"t":1000}"#,
            "\n",
            r#"{"metric":"up","value":0,"tags.name":["job"],"tags.value":["api"],"t":2000}"#,
            "\n",
            r#"{"metric":"up","value":1,"tags.name":["job"],"tags.value":["api"],"t":3000}"#,
            "\n",
        );

        let series = assemble(JsonRows::new(body.to_string()), &[]).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(
            series[0].labels,
            vec![Label::new("job", "api"), Label::new("metric", "up")]
        );
        assert_eq!(series[0].samples.len(), 3);
        assert!(series[0]
            .samples
            .windows(2)
            .all(|w| w[0].timestamp_ms < w[1].timestamp_ms));
    }
}
