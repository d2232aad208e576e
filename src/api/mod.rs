//! Promhouse HTTP API
//!
//! HTTP layer for the remote read adapter, built with Axum.
//!
//! # Endpoints
//!
//! ## Remote Read
//! - `POST /` - Prometheus remote read
//! - `POST /api/v1/read` - Prometheus remote read
//!
//! ## Telemetry
//! - `GET /metrics` - Prometheus text exposition
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//!
//! # Example
//!
//! ```rust,ignore
//! use promhouse::api::{serve, AppState};
//! use promhouse::clickhouse::ClickHouseClient;
//! use promhouse::config::Config;
//! use promhouse::handler::ReadHandler;
//! use promhouse::query::StatementCompiler;
//! use promhouse::telemetry::Metrics;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let client = ClickHouseClient::new(config.clickhouse.clone(), config.query.limit_rows)?;
//!     let handler = ReadHandler::new(
//!         StatementCompiler::new(config.query.clone()),
//!         Arc::new(client),
//!         Metrics::new()?,
//!     );
//!
//!     serve(AppState::new(handler, config.server.clone())).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handler::StatementExecutor;

/// Build the API router with all routes and middleware
pub fn build_router<E: StatementExecutor>(state: AppState<E>) -> Router {
    let max_body_size = state.config.max_body_size;

    let read_routes = Router::new()
        .route("/", post(routes::read::remote_read::<E>))
        .route("/api/v1/read", post(routes::read::remote_read::<E>))
        .layer(DefaultBodyLimit::max(max_body_size));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness::<E>));

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .merge(read_routes)
        .route("/metrics", get(routes::metrics::render_metrics::<E>))
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve<E: StatementExecutor>(state: AppState<E>) -> Result<(), ApiError> {
    let addr = state.config.addr();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Promhouse listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Promhouse shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QueryConfig, ServerConfig};
    use crate::handler::testing::MockExecutor;
    use crate::handler::ReadHandler;
    use crate::query::StatementCompiler;
    use crate::remote::models::{label_matcher, LabelMatcher, Query, ReadRequest};
    use crate::remote::{decode_read_response, encode_read_request};
    use crate::telemetry::Metrics;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::util::ServiceExt;

    const UP_ROWS: &str = concat!(
        r#"{"metric":"up","value":1,"tags.name":["job"],"tags.value":["api"],"t":1000}"#,
        "\n",
        r#"{"metric":"up","value":1,"tags.name":["job"],"tags.value":["api"],"t":2000}"#,
        "\n",
    );

    fn create_test_app(executor: MockExecutor) -> Router {
        let handler = ReadHandler::new(
            StatementCompiler::new(QueryConfig::default()),
            Arc::new(executor),
            Metrics::new().unwrap(),
        );
        build_router(AppState::new(handler, ServerConfig::default()))
    }

    fn read_body() -> Vec<u8> {
        encode_read_request(&ReadRequest {
            queries: vec![Query {
                start_timestamp_ms: 0,
                end_timestamp_ms: 10_000,
                matchers: vec![LabelMatcher {
                    r#type: label_matcher::Type::Eq as i32,
                    name: "__name__".to_string(),
                    value: "up".to_string(),
                }],
                hints: None,
            }],
            accepted_response_types: vec![],
        })
        .unwrap()
    }

    fn post(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-protobuf")
            .header(header::CONTENT_ENCODING, "snappy")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_health_live() {
        let app = create_test_app(MockExecutor::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let app = create_test_app(MockExecutor::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_unreachable() {
        let app = create_test_app(MockExecutor {
            unreachable: true,
            ..Default::default()
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_remote_read() {
        for uri in ["/", "/api/v1/read"] {
            let app = create_test_app(MockExecutor::default().with_body("up", UP_ROWS));

            let response = app.oneshot(post(uri, read_body())).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/x-protobuf"
            );
            assert_eq!(response.headers()[header::CONTENT_ENCODING], "snappy");

            let decoded = decode_read_response(&body_bytes(response).await).unwrap();
            assert_eq!(decoded.results.len(), 1);
            assert_eq!(decoded.results[0].timeseries.len(), 1);
            assert_eq!(decoded.results[0].timeseries[0].samples.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_remote_read_invalid_body() {
        let app = create_test_app(MockExecutor::default());

        let response = app
            .oneshot(post("/api/v1/read", b"not snappy".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_remote_read_execution_failure() {
        let app = create_test_app(MockExecutor {
            fail: true,
            ..Default::default()
        });

        let response = app.oneshot(post("/api/v1/read", read_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(body.contains("ClickHouse returned 500"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = create_test_app(MockExecutor::default().with_body("up", UP_ROWS));

        let response = app
            .clone()
            .oneshot(post("/api/v1/read", read_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(text.contains("promhouse_read_requests_total 1"));
        assert!(text.contains("promhouse_rows_total 2"));
    }
}
