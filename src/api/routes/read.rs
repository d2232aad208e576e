//! Remote Read Route
//!
//! - POST / - Prometheus remote read
//! - POST /api/v1/read - Prometheus remote read
//!
//! Request and response bodies are snappy-compressed protobuf messages.
//! Only the `SAMPLES` response type is produced.

use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::handler::StatementExecutor;
use crate::remote::{decode_read_request, encode_read_response};

/// Content type of remote read bodies
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
/// Content encoding of remote read bodies
pub const SNAPPY_ENCODING: &str = "snappy";

/// POST /api/v1/read
///
/// Decode the request, run its queries and encode the response.
pub async fn remote_read<E: StatementExecutor>(
    State(state): State<Arc<AppState<E>>>,
    body: Bytes,
) -> ApiResult<Response> {
    let request = decode_read_request(&body)?;
    let response = state.handler.handle(request).await?;

    let series: usize = response.results.iter().map(|r| r.timeseries.len()).sum();
    let encoded = encode_read_response(&response)
        .map_err(|e| ApiError::Internal(format!("Failed to encode response: {}", e)))?;

    tracing::debug!(
        series,
        bytes = encoded.len(),
        "Encoded read response"
    );

    Ok((
        [
            (header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE),
            (header::CONTENT_ENCODING, SNAPPY_ENCODING),
        ],
        encoded,
    )
        .into_response())
}
