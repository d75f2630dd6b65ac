//! MySQL/MariaDB database driver.
//!
//! This module provides MySQL-specific implementations for:
//! - [`MysqlDialect`]: SQL syntax strategy
//! - [`MysqlRawConnection`]: single-handle connection over SQLx
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod connection;
mod dialect;

pub use connection::MysqlRawConnection;
pub use dialect::MysqlDialect;
pub(crate) use dialect::{limit_offset_first, mysql_date_format};
