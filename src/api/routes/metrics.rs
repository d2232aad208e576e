//! Metrics Route
//!
//! - GET /metrics - Prometheus text exposition of the server's own metrics

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::handler::StatementExecutor;

/// GET /metrics
pub async fn render_metrics<E: StatementExecutor>(
    State(state): State<Arc<AppState<E>>>,
) -> ApiResult<Response> {
    let text = state
        .metrics()
        .render()
        .map_err(|e| ApiError::Internal(format!("Failed to render metrics: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], text).into_response())
}
