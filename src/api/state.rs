//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::ServerConfig;
use crate::handler::{ReadHandler, StatementExecutor};
use crate::telemetry::Metrics;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
pub struct AppState<E> {
    /// Remote read pipeline
    pub handler: Arc<ReadHandler<E>>,
    /// Listener configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl<E: StatementExecutor> AppState<E> {
    pub fn new(handler: ReadHandler<E>, config: ServerConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn metrics(&self) -> &Metrics {
        self.handler.metrics()
    }
}
