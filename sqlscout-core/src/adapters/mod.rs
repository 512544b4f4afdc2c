//! Catalog source seam and SQL Server driver adapter.
//!
//! Every fetcher talks to a [`CatalogSource`]: something that executes one
//! read-only query with bound string parameters and returns typed rows. The
//! SQL Server session implements it over TDS; [`ScriptedCatalog`] implements
//! it in memory for tests and offline runs.
//!
//! # Module Structure
//! - `config`: Connection and analysis configuration
//! - `mock`: Scripted in-memory catalog with query recording
//! - `mssql`: Pooled SQL Server session (feature `mssql`)

use async_trait::async_trait;

use crate::error::{Result, ScoutError};
use crate::models::RefValue;
use crate::queries;

pub mod config;
mod mock;
#[cfg(feature = "mssql")]
pub mod mssql;

pub use config::{AnalysisConfig, CardinalityMode, ConnectionParams, EncryptMode};
pub use mock::{IssuedQuery, ScriptedCatalog};
#[cfg(feature = "mssql")]
pub use mssql::SqlServerSession;

/// A single scalar from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// Returns true for SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl From<SqlValue> for RefValue {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => RefValue::Null,
            SqlValue::Bool(b) => RefValue::Bool(b),
            SqlValue::Int(i) => RefValue::Integer(i),
            SqlValue::Float(x) => RefValue::Float(x),
            SqlValue::Text(s) => RefValue::Text(s),
        }
    }
}

/// One result row: projected column names with their values, in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlRow {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column; builder style.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(column, value);
        self
    }

    /// Appends a column.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Looks up a value by column name, case-insensitively as SQL Server does.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    /// Extracts a column value, failing when the column is absent.
    ///
    /// # Arguments
    /// * `field_name` - Projected column name
    /// * `query_context` - Which catalog query produced the row, for errors
    pub fn value(&self, field_name: &str, query_context: &str) -> Result<&SqlValue> {
        self.get(field_name)
            .ok_or_else(|| ScoutError::parse_field(field_name, query_context))
    }

    /// Extracts a non-null text column.
    pub fn text(&self, field_name: &str, query_context: &str) -> Result<String> {
        match self.value(field_name, query_context)? {
            SqlValue::Text(s) => Ok(s.clone()),
            _ => Err(ScoutError::parse_field(field_name, query_context)),
        }
    }

    /// Extracts a nullable integer column.
    pub fn opt_int(&self, field_name: &str, query_context: &str) -> Result<Option<i64>> {
        match self.value(field_name, query_context)? {
            SqlValue::Null => Ok(None),
            SqlValue::Int(i) => Ok(Some(*i)),
            // DECIMAL aggregates arrive as text from the driver
            SqlValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ScoutError::parse_field(field_name, query_context)),
            _ => Err(ScoutError::parse_field(field_name, query_context)),
        }
    }

    /// Extracts a non-negative count; NULL counts as zero.
    pub fn count(&self, field_name: &str, query_context: &str) -> Result<u64> {
        let raw = self.opt_int(field_name, query_context)?.unwrap_or(0);
        u64::try_from(raw).map_err(|_| ScoutError::parse_field(field_name, query_context))
    }

    /// Consumes the row, returning the value of one column.
    pub fn take(mut self, field_name: &str, query_context: &str) -> Result<SqlValue> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(field_name))
            .ok_or_else(|| ScoutError::parse_field(field_name, query_context))?;
        Ok(self.values.swap_remove(index))
    }
}

/// Read-only query executor for catalog views and aggregates.
///
/// # Security Guarantees
/// - Implementations only ever run the fixed catalog and aggregate queries
/// - Parameters are bound, never interpolated
/// - `describe` never includes credentials
///
/// # Object Safety
/// This trait is object-safe, allowing dynamic dispatch through
/// `Arc<dyn CatalogSource>`.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Executes one query and returns the first result set.
    ///
    /// `params` bind to `@P1`, `@P2`, ... in order.
    ///
    /// # Errors
    /// Returns `ScoutError::Query` if the server rejects the query, or
    /// `ScoutError::NotConnected` after `close`.
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<SqlRow>>;

    /// Runs a trivial query and returns the server version string.
    async fn test_connection(&self) -> Result<String> {
        self.query(queries::PING, &[]).await?;
        let rows = self.query(queries::SERVER_VERSION, &[]).await?;
        match rows.into_iter().next() {
            Some(row) => row.text("Version", "server version"),
            None => Ok(String::from("unknown")),
        }
    }

    /// Releases the underlying connections.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Credential-free description for logs.
    fn describe(&self) -> String;
}
