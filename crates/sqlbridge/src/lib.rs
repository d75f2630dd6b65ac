//! # sqlbridge
//!
//! Database connection and dialect layer for MySQL, PostgreSQL and SQLite.
//!
//! This library provides:
//!
//! - **One connection API** over three engines, with `:name` placeholders everywhere
//! - **Dialect SQL generation** for pagination, date formatting and PostgreSQL XPath
//! - **Schema introspection** of tables, columns, primary keys and foreign keys
//! - **Fail-fast re-entrancy** and per-statement timeouts on every connection
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlbridge::{Connection, ConnectionConfig, Params};
//!
//! #[tokio::main]
//! async fn main() -> sqlbridge::Result<()> {
//!     let config = ConnectionConfig::load("database.yaml")?;
//!     let conn = Connection::connect(&config).await?;
//!
//!     for table in conn.get_tables(None).await? {
//!         let columns = conn.get_columns(&table.name, None).await?;
//!         println!("{}: {} columns", table.name, columns.len());
//!     }
//!
//!     let sql = conn.set_limit("SELECT * FROM users WHERE active = :active", 10, 0);
//!     let rows = conn.query(&sql, &Params::new().bind("active", true)).await?;
//!     println!("{} active users", rows.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;

// Re-exports for convenient access
pub use config::{ConnectionConfig, Driver};
pub use connection::Connection;
pub use crate::core::{
    ColumnDescriptor, Dialect, ForeignKeyDescriptor, Params, PrimaryKeySet, RawConnection, Row,
    SqlValue, Statement, TableDescriptor, TableSchema,
};
pub use dialect::{DateToken, XmlDataFormat, XmlFragments, XmlOptions};
pub use drivers::DialectImpl;
pub use error::{DbError, Result};
