//! Query error types
//!
//! Defines all error conditions that can occur while translating, executing
//! and assembling a remote read query.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Matcher cannot be translated (unknown matcher type)
    #[error("Invalid matcher: {0}")]
    InvalidMatcher(String),

    /// Parallel tag arrays of a row differ in length
    #[error("Tags array size mismatch: {names} != {values}")]
    TagArrayMismatch { names: usize, values: usize },

    /// Row returned by the database lacks a column or has the wrong type
    #[error("Malformed row: {0}")]
    MalformedRow(String),

    /// Database execution failed
    #[error("Execution error: {0}")]
    Execution(String),
}

impl QueryError {
    /// Short stable name of the error class, used as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidMatcher(_) => "invalid_input",
            QueryError::TagArrayMismatch { .. } => "data_integrity",
            QueryError::MalformedRow(_) | QueryError::Execution(_) => "execution",
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(err: reqwest::Error) -> Self {
        QueryError::Execution(err.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::MalformedRow(err.to_string())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
