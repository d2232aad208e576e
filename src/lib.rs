//! # Promhouse
//!
//! Prometheus remote read adapter for ClickHouse. Translates remote read
//! queries into parameterized SQL, runs them over the ClickHouse HTTP
//! interface and reassembles the rows into labeled time series.
//!
//! ## Modules
//!
//! - [`query`]: Statement compiler and result assembler
//! - [`remote`]: Remote read protobuf messages and snappy codec
//! - [`clickhouse`]: ClickHouse HTTP executor
//! - [`handler`]: Per-request pipeline over all queries
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML configuration with environment overrides
//! - [`telemetry`]: Tracing setup and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust
//! use promhouse::config::QueryConfig;
//! use promhouse::query::{LabelMatcher, StatementCompiler, StructuredQuery};
//!
//! let compiler = StatementCompiler::new(QueryConfig::default());
//! let statement = compiler.compile(
//!     &StructuredQuery::new(0, 60_000).matcher(LabelMatcher::equal("__name__", "up")),
//! );
//!
//! assert!(statement.sql.contains("metric = ?"));
//! assert_eq!(statement.params, vec!["up"]);
//! ```

pub mod api;
pub mod clickhouse;
pub mod config;
pub mod handler;
pub mod query;
pub mod remote;
pub mod telemetry;

// Re-export top-level types for convenience
pub use query::{
    assemble, CompiledStatement, LabelMatcher, MatchKind, QueryError, QueryResult, ResultRow,
    StatementCompiler, StructuredQuery, TimeRange, TimeSeries,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use clickhouse::ClickHouseClient;

pub use handler::{ReadHandler, StatementExecutor};

pub use config::{ClickHouseConfig, Config, ConfigError, LoggingConfig, ServerConfig};

pub use telemetry::Metrics;
