//! Configuration type definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// Database engine a connection talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// MySQL or MariaDB.
    #[serde(alias = "mariadb")]
    Mysql,

    /// PostgreSQL.
    #[serde(alias = "postgresql", alias = "pg", alias = "pgsql")]
    Postgres,

    /// SQLite (file or in-memory).
    #[serde(alias = "sqlite3")]
    Sqlite,
}

impl Driver {
    /// Canonical database type identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Mysql => "mysql",
            Driver::Postgres => "postgres",
            Driver::Sqlite => "sqlite",
        }
    }

    /// Port used when the configuration sets none.
    pub fn default_port(&self) -> u16 {
        match self {
            Driver::Mysql => 3306,
            Driver::Postgres => 5432,
            Driver::Sqlite => 0,
        }
    }

    /// Client charset used when the configuration sets none.
    pub fn default_charset(&self) -> Option<&'static str> {
        match self {
            Driver::Mysql => Some("utf8mb4"),
            Driver::Postgres => Some("UTF8"),
            Driver::Sqlite => None,
        }
    }

    /// Whether the engine is reached over the network.
    pub fn is_network(&self) -> bool {
        !matches!(self, Driver::Sqlite)
    }
}

impl FromStr for Driver {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Driver::Mysql),
            "postgres" | "postgresql" | "pg" | "pgsql" => Ok(Driver::Postgres),
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            _ => Err(DbError::Config(format!(
                "Unknown database type: '{}'. Valid types: mysql, postgres, sqlite",
                s
            ))),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for one database connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine.
    pub driver: Driver,

    /// Database host (unused by SQLite).
    #[serde(default)]
    pub host: String,

    /// Database port (default: engine default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name, or for SQLite a file path or `:memory:`.
    pub database: String,

    /// Schema searched by default (PostgreSQL only, default: "public").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Client charset (default: "utf8mb4" for MySQL, "UTF8" for PostgreSQL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    /// Open the handle at connect time and keep it (default: true).
    /// When false the handle is opened by the first statement.
    #[serde(default = "default_true")]
    pub persistent: bool,

    /// Per-statement timeout in seconds (default: none).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_timeout_secs: Option<u64>,
}

impl ConnectionConfig {
    /// Configuration with engine defaults for everything but the database.
    pub fn new(driver: Driver, database: impl Into<String>) -> Self {
        Self {
            driver,
            host: String::new(),
            port: None,
            database: database.into(),
            schema: None,
            user: String::new(),
            password: String::new(),
            charset: None,
            persistent: true,
            statement_timeout_secs: None,
        }
    }

    /// In-memory SQLite configuration.
    pub fn sqlite_memory() -> Self {
        Self::new(Driver::Sqlite, ":memory:")
    }

    /// Effective port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.driver.default_port())
    }

    /// Effective client charset.
    pub fn charset(&self) -> Option<&str> {
        self.charset
            .as_deref()
            .or_else(|| self.driver.default_charset())
    }

    /// Schema an introspection call uses when the caller passes none:
    /// PostgreSQL's configured schema, MySQL's database, SQLite's `main`.
    pub fn default_schema(&self) -> String {
        match self.driver {
            Driver::Postgres => self
                .schema
                .clone()
                .unwrap_or_else(|| "public".to_string()),
            Driver::Mysql => self.database.clone(),
            Driver::Sqlite => "main".to_string(),
        }
    }

    /// True for an in-memory SQLite database.
    pub fn is_memory(&self) -> bool {
        self.driver == Driver::Sqlite && self.database == ":memory:"
    }

    /// Human-readable target for log lines (never includes credentials).
    pub fn endpoint(&self) -> String {
        match self.driver {
            Driver::Sqlite => self.database.clone(),
            _ => format!("{}:{}/{}", self.host, self.port(), self.database),
        }
    }
}

// Custom Debug implementation to redact password
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("charset", &self.charset)
            .field("persistent", &self.persistent)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

fn default_true() -> bool {
    true
}
