//! Core traits of the connection layer.
//!
//! - [`Dialect`]: pure SQL generation for one engine (Strategy pattern)
//! - [`RawConnection`]: owns an engine handle and executes parameterized SQL
//!
//! [`Connection`](crate::Connection) binds one of each together.

use async_trait::async_trait;

use super::params::{Params, PlaceholderStyle};
use super::value::{Row, SqlValue};
use crate::dialect::{DateToken, XmlFragments, XmlOptions};
use crate::error::{DbError, Result};

/// A SQL statement with its named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text using `:name` placeholders.
    pub sql: String,
    /// Values for the placeholders.
    pub params: Params,
}

impl Statement {
    /// Create a statement.
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// SQL syntax strategy for a database engine.
///
/// Implementations hold no connection state and perform no I/O. Capabilities an
/// engine lacks have default implementations that fail with
/// [`DbError::UnsupportedCapability`].
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "mysql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_ident(&self, name: &str) -> String;

    /// Positional placeholder style of the engine's driver.
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Append a pagination clause. Never merges with an existing LIMIT.
    fn apply_limit(&self, sql: &str, records: u64, offset: u64) -> String;

    /// Engine format string for a date token.
    fn date_format(&self, token: DateToken) -> &'static str;

    /// Format `datetime` (default: the engine's current timestamp) with `token`.
    /// `cast` is applied only by engines that support a trailing cast.
    fn date_expression(&self, token: DateToken, datetime: Option<&str>, cast: Option<&str>)
        -> String;

    /// Build XPath extraction fragments over an XML-bearing column.
    fn xml_extract(
        &self,
        _column: &str,
        _paths: &[&str],
        _options: &XmlOptions,
    ) -> Result<XmlFragments> {
        Err(DbError::unsupported(self.name(), "XML extraction"))
    }

    /// Base tables (no views) ordered by name.
    /// Columns: `table_name`, `table_comment`.
    fn list_tables_query(&self, schema: &str) -> Statement;

    /// Comment of one table, or `None` when the engine keeps no comments.
    /// Columns: `table_comment`.
    fn table_comment_query(&self, schema: &str, table: &str) -> Option<Statement>;

    /// Columns in ordinal order. Columns: `column_name`, `data_type`,
    /// `character_maximum_length`, `numeric_precision`, `is_nullable`
    /// (`YES`/`NO`), `column_default`, `column_comment`, `extra`.
    fn list_columns_query(&self, schema: &str, table: &str) -> Statement;

    /// Primary key columns in key order. Columns: `column_name`.
    fn list_primary_keys_query(&self, schema: &str, table: &str) -> Statement;

    /// Foreign key column pairs. Columns: `column_name`, `referenced_table`,
    /// `referenced_column`, `constraint_name`.
    fn list_foreign_keys_query(&self, schema: &str, table: &str) -> Statement;
}

/// Owner of one live engine handle.
///
/// All four primitives take SQL with `:name` placeholders. Implementations
/// translate driver failures into [`DbError::Connection`] (handle problems) or
/// [`DbError::Query`] (the engine rejected the statement).
///
/// The default drivers wrap a single handle; a pooled implementation can be
/// swapped in behind this trait without touching [`Connection`](crate::Connection).
#[async_trait]
pub trait RawConnection: Send + Sync {
    /// Execute a statement that returns no rows. Returns rows affected.
    async fn execute(&self, sql: &str, params: &Params) -> Result<u64>;

    /// Fetch every row.
    async fn fetch_all(&self, sql: &str, params: &Params) -> Result<Vec<Row>>;

    /// Fetch the first column of every row.
    async fn fetch_column(&self, sql: &str, params: &Params) -> Result<Vec<SqlValue>> {
        let rows = self.fetch_all(sql, params).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_first().unwrap_or(SqlValue::Null))
            .collect())
    }

    /// Fetch column 0 of row 0, `None` when there are no rows.
    async fn fetch_scalar(&self, sql: &str, params: &Params) -> Result<Option<SqlValue>> {
        let rows = self.fetch_all(sql, params).await?;
        Ok(rows.into_iter().next().and_then(Row::into_first))
    }

    /// Check the handle with a trivial round trip.
    async fn ping(&self) -> Result<()> {
        self.fetch_scalar("SELECT 1", &Params::new()).await.map(|_| ())
    }

    /// Whether the handle is currently open.
    async fn is_open(&self) -> bool;

    /// Close the handle. Later calls fail with [`DbError::Connection`].
    async fn close(&self);

    /// Get the database type identifier (e.g., "mysql", "postgres").
    fn db_type(&self) -> &str;
}
