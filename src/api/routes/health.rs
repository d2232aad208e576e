//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ClickHouse is reachable)

use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use crate::api::state::AppState;
use crate::handler::StatementExecutor;

/// GET /health/live
///
/// Kubernetes liveness probe.
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Kubernetes readiness probe.
/// Returns 200 once ClickHouse answers a ping, 503 otherwise.
pub async fn readiness<E: StatementExecutor>(State(state): State<Arc<AppState<E>>>) -> StatusCode {
    match state.handler.executor().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(
                error = %e,
                uptime_seconds = state.uptime_seconds(),
                "Readiness check failed"
            );
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
