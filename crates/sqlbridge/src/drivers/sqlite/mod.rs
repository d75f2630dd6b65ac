//! SQLite driver.
//!
//! - [`SqliteDialect`]: SQL syntax strategy (MySQL-style pagination, `strftime` dates)
//! - [`SqliteRawConnection`]: single-handle connection over SQLx

mod connection;
mod dialect;

pub use connection::SqliteRawConnection;
pub use dialect::SqliteDialect;
