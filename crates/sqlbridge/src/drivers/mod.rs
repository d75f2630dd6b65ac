//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`mysql`]: MySQL/MariaDB driver
//! - [`postgres`]: PostgreSQL driver
//! - [`sqlite`]: SQLite driver
//! - [`common`]: Shared utilities (handle slot)
//!
//! # Architecture
//!
//! Each driver module implements:
//! - `Dialect`: SQL syntax strategy for the database engine
//! - `RawConnection`: the engine handle and its fetch primitives
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` with `dialect.rs` and `connection.rs`
//! 2. Add a variant to [`Driver`](crate::config::Driver) and to `DialectImpl`
//! 3. Add the connect arm in [`Connection::connect`](crate::Connection::connect)

pub(crate) mod common;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::{MysqlDialect, MysqlRawConnection};
pub use postgres::{PostgresDialect, PostgresRawConnection};
pub use sqlite::{SqliteDialect, SqliteRawConnection};

use crate::config::Driver;
use crate::core::params::PlaceholderStyle;
use crate::core::traits::{Dialect, Statement};
use crate::dialect::{DateToken, XmlFragments, XmlOptions};
use crate::error::Result;

/// Enum-based static dispatch for dialects.
///
/// The compiler generates a match statement instead of using vtable dispatch.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
    Sqlite(SqliteDialect),
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $call:expr) => {
        match $self {
            DialectImpl::Mysql($d) => $call,
            DialectImpl::Postgres($d) => $call,
            DialectImpl::Sqlite($d) => $call,
        }
    };
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        dispatch!(self, d => d.name())
    }

    fn quote_ident(&self, name: &str) -> String {
        dispatch!(self, d => d.quote_ident(name))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        dispatch!(self, d => d.placeholder_style())
    }

    fn apply_limit(&self, sql: &str, records: u64, offset: u64) -> String {
        dispatch!(self, d => d.apply_limit(sql, records, offset))
    }

    fn date_format(&self, token: DateToken) -> &'static str {
        dispatch!(self, d => d.date_format(token))
    }

    fn date_expression(
        &self,
        token: DateToken,
        datetime: Option<&str>,
        cast: Option<&str>,
    ) -> String {
        dispatch!(self, d => d.date_expression(token, datetime, cast))
    }

    fn xml_extract(
        &self,
        column: &str,
        paths: &[&str],
        options: &XmlOptions,
    ) -> Result<XmlFragments> {
        dispatch!(self, d => d.xml_extract(column, paths, options))
    }

    fn list_tables_query(&self, schema: &str) -> Statement {
        dispatch!(self, d => d.list_tables_query(schema))
    }

    fn table_comment_query(&self, schema: &str, table: &str) -> Option<Statement> {
        dispatch!(self, d => d.table_comment_query(schema, table))
    }

    fn list_columns_query(&self, schema: &str, table: &str) -> Statement {
        dispatch!(self, d => d.list_columns_query(schema, table))
    }

    fn list_primary_keys_query(&self, schema: &str, table: &str) -> Statement {
        dispatch!(self, d => d.list_primary_keys_query(schema, table))
    }

    fn list_foreign_keys_query(&self, schema: &str, table: &str) -> Statement {
        dispatch!(self, d => d.list_foreign_keys_query(schema, table))
    }
}

impl DialectImpl {
    /// Dialect for a configured driver.
    pub fn for_driver(driver: Driver) -> Self {
        match driver {
            Driver::Mysql => DialectImpl::Mysql(MysqlDialect::new()),
            Driver::Postgres => DialectImpl::Postgres(PostgresDialect::new()),
            Driver::Sqlite => DialectImpl::Sqlite(SqliteDialect::new()),
        }
    }

    /// Create a dialect implementation from a database type string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database type is not recognized.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        db_type.parse::<Driver>().map(Self::for_driver)
    }
}
