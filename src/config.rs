//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Columns projected by every statement; extracted tags may not reuse them
const RESERVED_COLUMNS: [&str; 5] = ["metric", "value", "t", "tags.name", "tags.value"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub clickhouse: ClickHouseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9201
}

fn default_max_body_size() -> usize {
    16 * 1024 * 1024 // 16 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Table layout used when compiling queries
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryConfig {
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_table")]
    pub table: String,

    /// Tag keys stored as their own columns instead of in the tag arrays
    #[serde(default)]
    pub extract_tags: Vec<String>,

    /// Maximum rows ClickHouse may return for one query (0 = unlimited)
    #[serde(default)]
    pub limit_rows: u64,
}

fn default_database() -> String {
    "default".to_string()
}

fn default_table() -> String {
    "samples".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            table: default_table(),
            extract_tags: Vec::new(),
            limit_rows: 0,
        }
    }
}

/// ClickHouse HTTP interface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClickHouseConfig {
    #[serde(default = "default_clickhouse_url")]
    pub url: String,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_clickhouse_timeout")]
    pub timeout_secs: u64,

    /// Extra settings sent with every query
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}

fn default_clickhouse_timeout() -> u64 {
    30
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_clickhouse_url(),
            user: None,
            password: None,
            timeout_secs: default_clickhouse_timeout(),
            settings: BTreeMap::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Default configuration with overrides taken from `lookup`
    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load from the first default location that exists, else from the
    /// environment
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("promhouse").join("config.toml")),
            Some(PathBuf::from("/etc/promhouse/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        if let Some(path) = config_paths.iter().flatten().find(|p| p.exists()) {
            let config = Self::load_with_env(path)?;
            tracing::info!("Loaded config from {:?}", path);
            return Ok(config);
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check the values written into SQL text
    ///
    /// Database, table and extracted tag names must be plain identifiers.
    /// Extracted tags must be unique and must not shadow a projected column.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_identifier("query.database", &self.query.database)?;
        check_identifier("query.table", &self.query.table)?;

        let mut seen = HashSet::new();
        for tag in &self.query.extract_tags {
            check_identifier("query.extract_tags", tag)?;
            if RESERVED_COLUMNS.contains(&tag.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "query.extract_tags",
                    error: format!("{tag:?} is a reserved column"),
                });
            }
            if !seen.insert(tag.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "query.extract_tags",
                    error: format!("{tag:?} is listed more than once"),
                });
            }
        }
        Ok(())
    }

    /// Copy of the configuration safe to log
    pub fn masked(&self) -> Self {
        let mut masked = self.clone();
        if masked.clickhouse.password.is_some() {
            masked.clickhouse.password = Some("******".to_string());
        }
        masked
    }

    /// Apply `PROMHOUSE_*` overrides to an existing config
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = lookup("PROMHOUSE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PROMHOUSE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Query overrides
        if let Some(database) = lookup("PROMHOUSE_DATABASE") {
            self.query.database = database;
        }
        if let Some(table) = lookup("PROMHOUSE_TABLE") {
            self.query.table = table;
        }
        if let Some(tags) = lookup("PROMHOUSE_EXTRACT_TAGS") {
            self.query.extract_tags = parse_tag_list(&tags);
        }

        // ClickHouse overrides
        if let Some(url) = lookup("PROMHOUSE_CLICKHOUSE_URL") {
            self.clickhouse.url = url;
        }
        if let Some(user) = lookup("PROMHOUSE_CLICKHOUSE_USER") {
            self.clickhouse.user = Some(user);
        }
        if let Some(password) = lookup("PROMHOUSE_CLICKHOUSE_PASSWORD") {
            self.clickhouse.password = Some(password);
        }

        // Logging overrides
        if let Some(level) = lookup("PROMHOUSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("PROMHOUSE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Split a comma-separated tag list, ignoring blanks
fn parse_tag_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            error: format!("{value:?} is not a plain identifier"),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid value for {field}: {error}")]
    Invalid { field: &'static str, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Promhouse Configuration
#
# Environment variables override these settings:
# - PROMHOUSE_HOST
# - PROMHOUSE_PORT
# - PROMHOUSE_DATABASE
# - PROMHOUSE_TABLE
# - PROMHOUSE_EXTRACT_TAGS (comma-separated)
# - PROMHOUSE_CLICKHOUSE_URL
# - PROMHOUSE_CLICKHOUSE_USER
# - PROMHOUSE_CLICKHOUSE_PASSWORD
# - PROMHOUSE_LOG_LEVEL
# - PROMHOUSE_LOG_FORMAT

[server]
# Listener host
host = "0.0.0.0"

# Listener port (Prometheus remote_read url points here)
port = 9201

# Maximum compressed request body size (bytes)
max_body_size = 16777216

[query]
# Database and table holding the samples
database = "default"
table = "samples"

# Tags stored as their own columns instead of in tags.name/tags.value
extract_tags = []

# Maximum rows returned for a single query (0 = unlimited)
limit_rows = 0

[clickhouse]
# ClickHouse HTTP interface
url = "http://localhost:8123"

# Optional credentials
# user = "default"
# password = ""

# Request timeout in seconds
timeout_secs = 30

# Extra settings sent with every query
[clickhouse.settings]
# max_execution_time = "60"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
