//! ClickHouse Backend
//!
//! Executes compiled statements over the ClickHouse HTTP interface and
//! exposes the `JSONEachRow` result as rows the assembler can read.
//!
//! - **client**: HTTP client, parameter binding and settings
//! - **row**: `JSONEachRow` row parsing

mod client;
mod row;

pub use client::{bind_parameters, ClickHouseClient};
pub use row::{JsonRow, JsonRows};
