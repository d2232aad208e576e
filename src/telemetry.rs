//! Logging and Metrics
//!
//! Tracing subscriber setup and the Prometheus metrics exposed on
//! `/metrics`.
//!
//! # Metrics
//!
//! ```text
//! promhouse_read_requests_total          remote read requests received
//! promhouse_queries_total                queries translated and executed
//! promhouse_query_errors_total{kind}     failed queries by error kind
//! promhouse_rows_total                   result rows consumed
//! promhouse_query_duration_seconds       compile + execute + assemble time
//! ```

use crate::config::LoggingConfig;
use crate::query::QueryError;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const NAMESPACE: &str = "promhouse";

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(
    config: &LoggingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.level)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    }
}

/// Prometheus metrics of the read path
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub read_requests: IntCounter,
    pub queries: IntCounter,
    pub query_errors: IntCounterVec,
    pub rows: IntCounter,
    pub query_duration: Histogram,
}

impl Metrics {
    /// Create the metrics in a fresh registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let read_requests = IntCounter::with_opts(
            Opts::new("read_requests_total", "Total number of remote read requests")
                .namespace(NAMESPACE),
        )?;
        let queries = IntCounter::with_opts(
            Opts::new("queries_total", "Total number of executed read queries")
                .namespace(NAMESPACE),
        )?;
        let query_errors = IntCounterVec::new(
            Opts::new("query_errors_total", "Total number of failed read queries")
                .namespace(NAMESPACE),
            &["kind"],
        )?;
        let rows = IntCounter::with_opts(
            Opts::new("rows_total", "Total number of result rows read from ClickHouse")
                .namespace(NAMESPACE),
        )?;
        let query_duration = Histogram::with_opts(
            HistogramOpts::new(
                "query_duration_seconds",
                "Read query duration in seconds",
            )
            .namespace(NAMESPACE)
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        )?;

        registry.register(Box::new(read_requests.clone()))?;
        registry.register(Box::new(queries.clone()))?;
        registry.register(Box::new(query_errors.clone()))?;
        registry.register(Box::new(rows.clone()))?;
        registry.register(Box::new(query_duration.clone()))?;

        Ok(Self {
            registry,
            read_requests,
            queries,
            query_errors,
            rows,
            query_duration,
        })
    }

    /// Count a failed query under its error kind
    pub fn record_error(&self, error: &QueryError) {
        self.query_errors.with_label_values(&[error.kind()]).inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
