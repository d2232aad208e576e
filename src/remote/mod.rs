//! Prometheus Remote Read Protocol
//!
//! Wire types for the remote read API and their conversion to and from
//! the translation types in [`crate::query`].
//!
//! - **models**: protobuf messages (`prost`)
//! - **codec**: snappy block compression around the messages

pub mod codec;
pub mod models;

pub use codec::{
    decode_read_request, decode_read_response, encode_read_request, encode_read_response,
    CodecError,
};
pub use models::{ReadRequest, ReadResponse};

use crate::query::{
    DownsampleHint, Label, LabelMatcher, MatchKind, QueryError, QueryResult, Sample,
    StructuredQuery, TimeRange, TimeSeries,
};

impl TryFrom<&models::LabelMatcher> for LabelMatcher {
    type Error = QueryError;

    fn try_from(matcher: &models::LabelMatcher) -> QueryResult<Self> {
        let kind = match models::label_matcher::Type::try_from(matcher.r#type) {
            Ok(models::label_matcher::Type::Eq) => MatchKind::Equal,
            Ok(models::label_matcher::Type::Neq) => MatchKind::NotEqual,
            Ok(models::label_matcher::Type::Re) => MatchKind::RegexMatch,
            Ok(models::label_matcher::Type::Nre) => MatchKind::RegexNotMatch,
            Err(_) => {
                return Err(QueryError::InvalidMatcher(format!(
                    "unknown matcher type {} for label {:?}",
                    matcher.r#type, matcher.name
                )))
            }
        };

        Ok(LabelMatcher::new(kind, &matcher.name, &matcher.value))
    }
}

impl TryFrom<&models::Query> for StructuredQuery {
    type Error = QueryError;

    fn try_from(query: &models::Query) -> QueryResult<Self> {
        let matchers = query
            .matchers
            .iter()
            .map(LabelMatcher::try_from)
            .collect::<QueryResult<Vec<_>>>()?;

        let hint = match &query.hints {
            Some(hints) => DownsampleHint::step(hints.step_ms),
            None => DownsampleHint::raw(),
        };

        Ok(StructuredQuery {
            range: TimeRange::new(query.start_timestamp_ms, query.end_timestamp_ms),
            matchers,
            hint,
        })
    }
}

impl From<Label> for models::Label {
    fn from(label: Label) -> Self {
        Self {
            name: label.name,
            value: label.value,
        }
    }
}

impl From<Sample> for models::Sample {
    fn from(sample: Sample) -> Self {
        Self {
            value: sample.value,
            timestamp: sample.timestamp_ms,
        }
    }
}

impl From<TimeSeries> for models::TimeSeries {
    fn from(series: TimeSeries) -> Self {
        Self {
            labels: series.labels.into_iter().map(Into::into).collect(),
            samples: series.samples.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<TimeSeries>> for models::QueryResult {
    fn from(series: Vec<TimeSeries>) -> Self {
        Self {
            timeseries: series.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::models::label_matcher::Type;
    use super::*;

    fn wire_matcher(r#type: i32, name: &str, value: &str) -> models::LabelMatcher {
        models::LabelMatcher {
            r#type,
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_matcher_kinds() {
        let cases = [
            (Type::Eq, MatchKind::Equal),
            (Type::Neq, MatchKind::NotEqual),
            (Type::Re, MatchKind::RegexMatch),
            (Type::Nre, MatchKind::RegexNotMatch),
        ];

        for (wire, kind) in cases {
            let matcher = LabelMatcher::try_from(&wire_matcher(wire as i32, "job", "api")).unwrap();
            assert_eq!(matcher.kind, kind);
            assert_eq!(matcher.name, "job");
            assert_eq!(matcher.value, "api");
        }
    }

    #[test]
    fn test_unknown_matcher_type() {
        let result = LabelMatcher::try_from(&wire_matcher(7, "job", "api"));
        assert!(matches!(result, Err(QueryError::InvalidMatcher(_))));
    }

    #[test]
    fn test_query_conversion() {
        let query = models::Query {
            start_timestamp_ms: 1_000,
            end_timestamp_ms: 2_000,
            matchers: vec![wire_matcher(0, "__name__", "up")],
            hints: Some(models::ReadHints {
                step_ms: 60_000,
                ..Default::default()
            }),
        };

        let structured = StructuredQuery::try_from(&query).unwrap();

        assert_eq!(structured.range, TimeRange::new(1_000, 2_000));
        assert_eq!(structured.matchers, vec![LabelMatcher::equal("__name__", "up")]);
        assert_eq!(structured.hint.active_step(), Some(60_000));
    }

    #[test]
    fn test_query_without_hints_is_raw() {
        let query = models::Query {
            start_timestamp_ms: 0,
            end_timestamp_ms: 1,
            matchers: vec![],
            hints: None,
        };

        let structured = StructuredQuery::try_from(&query).unwrap();

        assert_eq!(structured.hint.active_step(), None);
    }

    #[test]
    fn test_query_with_unknown_matcher_fails() {
        let query = models::Query {
            start_timestamp_ms: 0,
            end_timestamp_ms: 1,
            matchers: vec![wire_matcher(0, "__name__", "up"), wire_matcher(-1, "job", "x")],
            hints: None,
        };

        assert!(StructuredQuery::try_from(&query).is_err());
    }

    #[test]
    fn test_time_series_conversion() {
        let series = TimeSeries {
            labels: vec![Label::new("metric", "up")],
            samples: vec![Sample::new(1.5, 1_000), Sample::new(2.5, 2_000)],
        };

        let wire = models::QueryResult::from(vec![series]);

        assert_eq!(wire.timeseries.len(), 1);
        assert_eq!(wire.timeseries[0].labels[0].name, "metric");
        assert_eq!(wire.timeseries[0].samples[1].timestamp, 2_000);
        assert_eq!(wire.timeseries[0].samples[1].value, 2.5);
    }
}
