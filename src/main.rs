//! Promhouse
//!
//! Prometheus remote read adapter for ClickHouse.
//!
//! # Usage
//!
//! ```text
//! promhouse [serve] [-c config.toml]
//! promhouse compile --start 0 --end 3600000 --step 60000 -m '__name__=up' -m 'job=~api|web.*'
//! promhouse config [-o config.toml]
//! ```
//!
//! Exits with 1 on invalid arguments and 2 when the server fails to start.

use anyhow::{anyhow, bail, Context};
use clap::{error::ErrorKind, Parser, Subcommand};
use promhouse::api::{serve, AppState};
use promhouse::clickhouse::ClickHouseClient;
use promhouse::config::{generate_default_config, Config};
use promhouse::handler::{ReadHandler, StatementExecutor};
use promhouse::query::{LabelMatcher, StatementCompiler, StructuredQuery};
use promhouse::telemetry::{self, Metrics};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "promhouse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prometheus remote read adapter for ClickHouse")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the remote read server (default)
    Serve {
        /// Config file (default: search standard locations)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the SQL a remote read query compiles to
    Compile {
        /// Config file providing the table layout
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Range start in milliseconds
        #[arg(long)]
        start: i64,

        /// Range end in milliseconds
        #[arg(long)]
        end: i64,

        /// Downsampling step in milliseconds
        #[arg(long)]
        step: Option<i64>,

        /// Label matcher: name=value, name!=value, name=~regex or name!~regex
        #[arg(short, long = "matcher")]
        matchers: Vec<String>,
    },

    /// Print or write the default configuration
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve { config: None }) {
        Commands::Serve { config } => run_server(config.as_deref()).await,
        Commands::Compile {
            config,
            start,
            end,
            step,
            matchers,
        } => match compile(config.as_deref(), start, end, step, &matchers) {
            Ok(()) => Ok(()),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return ExitCode::from(1);
            }
        },
        Commands::Config { output } => write_default_config(output.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load_default().context("Failed to load config"),
    }
}

async fn run_server(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    telemetry::init_tracing(&config.logging)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Starting Promhouse v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(config = ?config.masked(), "Loaded configuration");

    let client = ClickHouseClient::new(config.clickhouse.clone(), config.query.limit_rows)
        .context("Failed to create ClickHouse client")?;

    match client.ping().await {
        Ok(()) => tracing::info!("ClickHouse connection verified: {}", config.clickhouse.url),
        Err(e) => tracing::warn!("ClickHouse not available: {} (readiness will fail)", e),
    }

    let metrics = Metrics::new().context("Failed to register metrics")?;
    let handler = ReadHandler::new(
        StatementCompiler::new(config.query.clone()),
        Arc::new(client),
        metrics,
    );

    serve(AppState::new(handler, config.server.clone())).await?;

    tracing::info!("Promhouse stopped");
    Ok(())
}

fn compile(
    config_path: Option<&Path>,
    start: i64,
    end: i64,
    step: Option<i64>,
    matchers: &[String],
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut query = StructuredQuery::new(start, end);
    for matcher in matchers {
        query = query.matcher(parse_matcher(matcher)?);
    }
    if let Some(step) = step {
        query = query.step(step);
    }

    let statement = StatementCompiler::new(config.query).compile(&query);
    println!("{}", serde_json::to_string_pretty(&statement)?);
    Ok(())
}

fn write_default_config(output: Option<&Path>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote default config to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Parse `name=value`, `name!=value`, `name=~regex` or `name!~regex`
fn parse_matcher(input: &str) -> anyhow::Result<LabelMatcher> {
    let Some(split) = input.find(['=', '!']) else {
        bail!("Invalid matcher {:?}: expected name=value", input);
    };

    let name = input[..split].trim();
    if name.is_empty() {
        bail!("Invalid matcher {:?}: empty label name", input);
    }

    let rest = &input[split..];
    let matcher = if let Some(value) = rest.strip_prefix("=~") {
        LabelMatcher::regex(name, unquote(value))
    } else if let Some(value) = rest.strip_prefix("!~") {
        LabelMatcher::not_regex(name, unquote(value))
    } else if let Some(value) = rest.strip_prefix("!=") {
        LabelMatcher::not_equal(name, unquote(value))
    } else if let Some(value) = rest.strip_prefix('=') {
        LabelMatcher::equal(name, unquote(value))
    } else {
        bail!("Invalid matcher {:?}: unknown operator", input);
    };

    Ok(matcher)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
