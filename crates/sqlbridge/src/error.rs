//! Error types for the connection layer.

use thiserror::Error;

/// Main error type for connection and dialect operations.
#[derive(Error, Debug)]
pub enum DbError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Handle not open, connect failure or connection lost.
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// The engine rejected a statement. `message` is the engine's own text.
    #[error("Query error: {message}")]
    Query { message: String, sql: String },

    /// Date-format token outside `Ym`, `Y`, `m`, `d`.
    #[error("Unsupported date token '{0}'. Supported tokens: Ym, Y, m, d")]
    UnsupportedDateToken(String),

    /// Operation not implemented by the active dialect.
    #[error("Dialect '{dialect}' does not support {capability}")]
    UnsupportedCapability {
        dialect: String,
        capability: &'static str,
    },

    /// SQL text references a placeholder that was never bound.
    #[error("No value bound for placeholder ':{0}'")]
    MissingParameter(String),

    /// A result column has a type this layer cannot decode.
    #[error("Unsupported type '{type_name}' for column '{column}' - cast it to text in the query")]
    UnsupportedType { column: String, type_name: String },

    /// Another operation is already running on this connection.
    #[error("Connection is busy: operations on one connection must be issued sequentially")]
    Busy,

    /// Statement exceeded the configured statement timeout.
    #[error("Statement timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DbError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        DbError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Query error carrying the rejected SQL
    pub fn query(message: impl ToString, sql: impl Into<String>) -> Self {
        DbError::Query {
            message: message.to_string(),
            sql: sql.into(),
        }
    }

    /// Create an UnsupportedCapability error
    pub fn unsupported(dialect: impl Into<String>, capability: &'static str) -> Self {
        DbError::UnsupportedCapability {
            dialect: dialect.into(),
            capability,
        }
    }

    /// True for failures of the handle itself rather than of a statement.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::Connection { .. } | DbError::Timeout { .. })
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        if let DbError::Query { sql, .. } = self {
            output.push_str(&format!("\nStatement:\n  {}", sql.trim()));
        }

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Classify a SQLx error: engine rejections become `Query`, everything
    /// else is a failure of the handle.
    pub(crate) fn from_sqlx(err: sqlx::Error, sql: &str, context: &str) -> Self {
        match err {
            sqlx::Error::Database(db) => DbError::query(db.message(), sql),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::query(format!("decoding column {}: {}", index, source), sql)
            }
            sqlx::Error::TypeNotFound { type_name } => DbError::query(
                format!("type not found: {}", type_name),
                sql,
            ),
            // Failures of the statement's arguments or result shape.
            e @ (sqlx::Error::InvalidArgument(_)
            | sqlx::Error::Encode(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }) => DbError::query(e, sql),
            other => DbError::connection(other, context),
        }
    }

    /// Classify a tokio-postgres error the same way as [`DbError::from_sqlx`].
    pub(crate) fn from_postgres(err: tokio_postgres::Error, sql: &str, context: &str) -> Self {
        if let Some(db) = err.as_db_error() {
            return DbError::query(db.message(), sql);
        }
        if err.is_closed() || has_io_source(&err) {
            return DbError::connection(err, context);
        }
        // Parameter encoding and row decoding failures carry no db error.
        DbError::query(err, sql)
    }
}

fn has_io_source(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.is::<std::io::Error>() {
            return true;
        }
        source = e.source();
    }
    false
}

/// Result type alias for connection operations.
pub type Result<T> = std::result::Result<T, DbError>;
