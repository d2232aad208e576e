//! Remote Read Translation
//!
//! Translates remote read queries into SQL and reassembles the result rows:
//!
//! - **Types**: Query, statement and time series types
//! - **Compiler**: Compile a structured query into parameterized SQL
//! - **Assembler**: Group result rows into labeled time series
//!
//! # Pipeline
//!
//! ```text
//! StructuredQuery → compile → CompiledStatement → (database) → rows → assemble → Vec<TimeSeries>
//! ```
//!
//! # Example
//!
//! ```rust
//! use promhouse::config::QueryConfig;
//! use promhouse::query::{LabelMatcher, StatementCompiler, StructuredQuery};
//!
//! let compiler = StatementCompiler::new(QueryConfig::default());
//!
//! let query = StructuredQuery::new(0, 3_600_000)
//!     .matcher(LabelMatcher::equal("__name__", "up"))
//!     .matcher(LabelMatcher::regex("job", "api|web.*"))
//!     .step(60_000);
//!
//! let statement = compiler.compile(&query);
//! assert_eq!(statement.params, vec!["up", "job", "api", "job", "web%"]);
//! ```

mod assembler;
mod compiler;
mod error;
mod types;

pub use assembler::{
    assemble, ResultRow, METRIC_COLUMN, TAG_NAMES_COLUMN, TAG_VALUES_COLUMN, TIME_COLUMN,
    VALUE_COLUMN,
};
pub use compiler::StatementCompiler;
pub use error::{QueryError, QueryResult};
pub use types::{
    CompiledStatement, DownsampleHint, Label, LabelMatcher, MatchKind, Sample, StructuredQuery,
    TimeRange, TimeSeries, METRIC_NAME_LABEL,
};
