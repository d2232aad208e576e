//! ClickHouse HTTP Client
//!
//! Runs compiled statements through the ClickHouse HTTP interface.
//!
//! Positional `?` placeholders are rewritten to typed query parameters
//! (`{p0:String}`, `{p1:String}`, ...) and the values travel as
//! `param_p0=...` URL arguments, so ClickHouse binds them server-side.

use crate::clickhouse::row::{JsonRow, JsonRows};
use crate::config::ClickHouseConfig;
use crate::handler::StatementExecutor;
use crate::query::{CompiledStatement, QueryError, QueryResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

/// Output format requested for every statement
const OUTPUT_FORMAT: &str = "JSONEachRow";

/// ClickHouse HTTP interface client
pub struct ClickHouseClient {
    client: Client,
    config: ClickHouseConfig,
    limit_rows: u64,
}

impl ClickHouseClient {
    /// Create a new client with the given configuration
    ///
    /// `limit_rows` caps the rows of a single result (0 = unlimited).
    pub fn new(config: ClickHouseConfig, limit_rows: u64) -> QueryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            limit_rows,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    /// URL arguments sent with every statement (settings, no parameters)
    fn settings_args(&self) -> Vec<(String, String)> {
        let mut args = vec![(
            "output_format_json_quote_64bit_integers".to_string(),
            "0".to_string(),
        )];

        if self.limit_rows > 0 {
            args.push(("max_result_rows".to_string(), self.limit_rows.to_string()));
            args.push(("result_overflow_mode".to_string(), "throw".to_string()));
        }

        args.extend(
            self.config
                .settings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        args
    }

    fn authenticate(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match &self.config.user {
            Some(user) => request.header("X-ClickHouse-User", user),
            None => request,
        };
        match &self.config.password {
            Some(password) => request.header("X-ClickHouse-Key", password),
            None => request,
        }
    }
}

#[async_trait]
impl StatementExecutor for ClickHouseClient {
    type Row = JsonRow;
    type Rows = JsonRows;

    async fn execute(&self, statement: &CompiledStatement) -> QueryResult<JsonRows> {
        let (sql, params) = bind_parameters(statement)?;
        let body = format!("{sql} FORMAT {OUTPUT_FORMAT}");

        let mut args = self.settings_args();
        args.extend(params);

        let request = self
            .authenticate(self.client.post(&self.config.url))
            .query(&args)
            .body(body);

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(QueryError::Execution(format!(
                "ClickHouse returned {}: {}",
                status,
                text.trim()
            )));
        }

        tracing::debug!(
            bytes = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ClickHouse query finished"
        );

        Ok(JsonRows::new(text))
    }

    async fn ping(&self) -> QueryResult<()> {
        let url = format!("{}/ping", self.config.url.trim_end_matches('/'));
        let response = self.authenticate(self.client.get(url)).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(QueryError::Execution(format!(
                "ClickHouse ping returned {}",
                response.status()
            )))
        }
    }
}

/// Rewrite `?` placeholders into named typed parameters
///
/// Returns the rewritten SQL and the `param_<name>` URL arguments.
pub fn bind_parameters(
    statement: &CompiledStatement,
) -> QueryResult<(String, Vec<(String, String)>)> {
    let placeholders = statement.placeholder_count();
    if placeholders != statement.params.len() {
        return Err(QueryError::Execution(format!(
            "statement has {} placeholders but {} parameters",
            placeholders,
            statement.params.len()
        )));
    }

    let mut sql = String::with_capacity(statement.sql.len() + placeholders * 12);
    let mut args = Vec::with_capacity(placeholders);

    for ch in statement.sql.chars() {
        if ch == '?' {
            let index = args.len();
            sql.push_str(&format!("{{p{index}:String}}"));
            args.push((
                format!("param_p{index}"),
                statement.params[index].clone(),
            ));
        } else {
            sql.push(ch);
        }
    }

    Ok((sql, args))
}
