//! API Error Types
//!
//! Maps pipeline failures to HTTP responses. Prometheus shows the body of a
//! failed remote read verbatim, so errors are returned as plain text.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::query::QueryError;
use crate::remote::CodecError;

/// Header carrying the id under which an error was logged
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body is not a snappy-compressed ReadRequest
    #[error("Invalid read request: {0}")]
    Decode(#[from] CodecError),

    /// Translation, execution or assembly failed
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status and stable error code
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Decode(_) => (StatusCode::BAD_REQUEST, "DECODE_ERROR"),
            ApiError::Query(QueryError::InvalidMatcher(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_MATCHER")
            }
            ApiError::Query(QueryError::TagArrayMismatch { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATA_INTEGRITY")
            }
            ApiError::Query(QueryError::MalformedRow(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "MALFORMED_ROW")
            }
            ApiError::Query(QueryError::Execution(_)) => {
                (StatusCode::BAD_GATEWAY, "EXECUTION_ERROR")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            error_code = %code,
            error_message = %self,
            "API error occurred"
        );

        (
            status,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (header::HeaderName::from_static(REQUEST_ID_HEADER), request_id),
            ],
            self.to_string(),
        )
            .into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
