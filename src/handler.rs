//! Remote Read Handler
//!
//! Runs every query of a remote read request through the translation
//! pipeline and collects the results in request order.
//!
//! ```text
//! models::Query → StructuredQuery → compile → execute → assemble → models::QueryResult
//! ```
//!
//! Queries run concurrently. The first failing query aborts the whole
//! request; no partial response is produced.

use crate::query::{
    assemble, CompiledStatement, QueryResult, ResultRow, StatementCompiler, StructuredQuery,
    TimeSeries,
};
use crate::remote::models::{self, ReadRequest, ReadResponse};
use crate::telemetry::Metrics;
use async_trait::async_trait;
use futures_util::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;

/// Executes compiled statements against the database
#[async_trait]
pub trait StatementExecutor: Send + Sync + 'static {
    /// One result row
    type Row: ResultRow + Send;
    /// Forward-only row sequence
    type Rows: Iterator<Item = QueryResult<Self::Row>> + Send;

    /// Bind the statement parameters and run it
    async fn execute(&self, statement: &CompiledStatement) -> QueryResult<Self::Rows>;

    /// Check that the database is reachable
    async fn ping(&self) -> QueryResult<()>;
}

/// Remote read request handler
pub struct ReadHandler<E> {
    compiler: StatementCompiler,
    executor: Arc<E>,
    metrics: Metrics,
}

impl<E: StatementExecutor> ReadHandler<E> {
    pub fn new(compiler: StatementCompiler, executor: Arc<E>, metrics: Metrics) -> Self {
        Self {
            compiler,
            executor,
            metrics,
        }
    }

    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Answer a decoded remote read request
    pub async fn handle(&self, request: ReadRequest) -> QueryResult<ReadResponse> {
        self.metrics.read_requests.inc();

        let started = Instant::now();
        tracing::info!(
            queries = request.queries.len(),
            accepted_response_types = ?request.accepted_response_types,
            "Handling remote read request"
        );

        let results = try_join_all(
            request
                .queries
                .iter()
                .enumerate()
                .map(|(index, query)| self.run_query(index, query)),
        )
        .await?;

        tracing::debug!(
            queries = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Remote read request finished"
        );

        Ok(ReadResponse { results })
    }

    async fn run_query(
        &self,
        index: usize,
        query: &models::Query,
    ) -> QueryResult<models::QueryResult> {
        let started = Instant::now();
        let outcome = self.translate(index, query).await;

        self.metrics.queries.inc();
        self.metrics
            .query_duration
            .observe(started.elapsed().as_secs_f64());

        match outcome {
            Ok(series) => Ok(series.into()),
            Err(e) => {
                self.metrics.record_error(&e);
                tracing::warn!(query = index, error = %e, "Read query failed");
                Err(e)
            }
        }
    }

    async fn translate(&self, index: usize, query: &models::Query) -> QueryResult<Vec<TimeSeries>> {
        let structured = StructuredQuery::try_from(query)?;
        let statement = self.compiler.compile(&structured);

        tracing::debug!(
            query = index,
            sql = %statement.sql,
            params = ?statement.params,
            "Executing statement"
        );

        let rows = self.executor.execute(&statement).await?;
        let rows_counter = &self.metrics.rows;
        let rows = rows.inspect(|row| {
            if row.is_ok() {
                rows_counter.inc();
            }
        });

        assemble(rows, &self.compiler.config().extract_tags)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::clickhouse::{JsonRow, JsonRows};
    use crate::query::QueryError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Executor answering with canned JSONEachRow bodies keyed by the
    /// first statement parameter (the metric name of an equality matcher)
    #[derive(Default)]
    pub struct MockExecutor {
        pub bodies: HashMap<String, String>,
        pub fail: bool,
        pub unreachable: bool,
        pub statements: Mutex<Vec<CompiledStatement>>,
    }

    impl MockExecutor {
        pub fn with_body(mut self, metric: &str, body: &str) -> Self {
            self.bodies.insert(metric.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl StatementExecutor for MockExecutor {
        type Row = JsonRow;
        type Rows = JsonRows;

        async fn execute(&self, statement: &CompiledStatement) -> QueryResult<JsonRows> {
            self.statements.lock().unwrap().push(statement.clone());

            if self.fail {
                return Err(QueryError::Execution(
                    "ClickHouse returned 500 Internal Server Error: boom".to_string(),
                ));
            }

            let body = statement
                .params
                .first()
                .and_then(|metric| self.bodies.get(metric))
                .cloned()
                .unwrap_or_default();
            Ok(JsonRows::new(body))
        }

        async fn ping(&self) -> QueryResult<()> {
            if self.unreachable {
                Err(QueryError::Execution("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }
}
