//! PostgreSQL driver.
//!
//! This module provides PostgreSQL-specific implementations:
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL, including XPath extraction
//! - [`PostgresRawConnection`]: single-handle connection over tokio-postgres

mod connection;
mod dialect;
mod xml;

pub use connection::PostgresRawConnection;
pub use dialect::PostgresDialect;
