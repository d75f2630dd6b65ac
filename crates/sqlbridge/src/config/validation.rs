//! Configuration validation.

use super::ConnectionConfig;
use crate::error::{DbError, Result};

/// Largest statement timeout PostgreSQL accepts (`statement_timeout` is an
/// `int4` of milliseconds).
pub const MAX_STATEMENT_TIMEOUT_SECS: u64 = i32::MAX as u64 / 1000;

/// Validate the configuration.
pub fn validate(config: &ConnectionConfig) -> Result<()> {
    if config.database.is_empty() {
        return Err(DbError::Config("database is required".into()));
    }

    if config.driver.is_network() {
        if config.host.is_empty() {
            return Err(DbError::Config(format!(
                "host is required for {}",
                config.driver
            )));
        }
        if config.user.is_empty() {
            return Err(DbError::Config(format!(
                "user is required for {}",
                config.driver
            )));
        }
        if config.port == Some(0) {
            return Err(DbError::Config("port must be between 1 and 65535".into()));
        }
    }

    if let Some(schema) = &config.schema {
        if schema.is_empty() {
            return Err(DbError::Config("schema must not be empty when set".into()));
        }
    }

    match config.statement_timeout_secs {
        Some(0) => {
            return Err(DbError::Config(
                "statement_timeout_secs must be at least 1".into(),
            ))
        }
        Some(secs) if secs > MAX_STATEMENT_TIMEOUT_SECS => {
            return Err(DbError::Config(format!(
                "statement_timeout_secs must be at most {}",
                MAX_STATEMENT_TIMEOUT_SECS
            )))
        }
        _ => {}
    }

    Ok(())
}
