//! SQLite raw connection.
//!
//! Wraps one SQLx `SqliteConnection` to a file or an in-memory database. An
//! in-memory database lives exactly as long as its handle, so closing the
//! connection discards it.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow,
};
use sqlx::{Column, ConnectOptions, Connection as _, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::params::{compile, Params, PlaceholderStyle, StringEscapes};
use crate::core::traits::RawConnection;
use crate::core::value::{Row, SqlValue};
use crate::drivers::common::Handle;
use crate::error::{DbError, Result};

/// SQLite raw connection over a single SQLx handle.
pub struct SqliteRawConnection {
    options: SqliteConnectOptions,
    handle: Handle<SqliteConnection>,
}

impl SqliteRawConnection {
    /// Create a connection from configuration. `database` is a file path
    /// (created if missing) or `:memory:`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let options = if config.is_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::connection(e, "parsing SQLite options"))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database)
                .create_if_missing(true)
        }
        .foreign_keys(true);

        let handle = if config.persistent {
            let conn = open(&options).await?;
            info!("Opened SQLite database: {}", config.endpoint());
            Handle::open(conn, "SQLite")
        } else {
            debug!("SQLite database {} opens on first use", config.endpoint());
            Handle::lazy("SQLite")
        };

        Ok(Self { options, handle })
    }

    /// Open an in-memory database.
    pub async fn memory() -> Result<Self> {
        Self::connect(&ConnectionConfig::sqlite_memory()).await
    }
}

async fn open(options: &SqliteConnectOptions) -> Result<SqliteConnection> {
    options
        .connect()
        .await
        .map_err(|e| DbError::from_sqlx(e, "", "opening SQLite database"))
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::I64(v) => query.bind(*v),
        SqlValue::F64(v) => query.bind(*v),
        // SQLite has no exact numeric storage class
        SqlValue::Decimal(v) => query.bind(v.to_string()),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Bytes(v) => query.bind(v.clone()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Uuid(v) => query.bind(v.to_string()),
    }
}

fn prepare<'q>(sql: &'q str, values: &[SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    values
        .iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

/// Convert a SQLite row into a [`Row`].
///
/// Decoding follows each value's storage class rather than the declared
/// column type, which SQLite does not enforce.
fn decode_row(row: &SqliteRow, sql: &str) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, i)
            .map_err(|e| DbError::from_sqlx(e, sql, "decoding SQLite row"))?;
        out.insert(column.name(), value);
    }
    Ok(out)
}

fn decode_value(row: &SqliteRow, i: usize) -> std::result::Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(i)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_string();

    let value = match storage.as_str() {
        "INTEGER" => SqlValue::I64(row.try_get_unchecked::<i64, _>(i)?),
        "REAL" => SqlValue::F64(row.try_get_unchecked::<f64, _>(i)?),
        "BLOB" => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(i)?),
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(i)?),
    };
    Ok(value)
}

#[async_trait]
impl RawConnection for SqliteRawConnection {
    async fn execute(&self, sql: &str, params: &Params) -> Result<u64> {
        let compiled = compile(
            sql,
            params,
            PlaceholderStyle::QuestionMark,
            StringEscapes::Standard,
        )?;
        let mut conn = self.handle.acquire(|| open(&self.options)).await?;

        debug!(
            "sqlite execute ({} params): {}",
            compiled.values.len(),
            compiled.sql.trim()
        );
        let result = prepare(&compiled.sql, &compiled.values)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(e, &compiled.sql, "executing SQLite statement"))?;

        Ok(result.rows_affected())
    }

    async fn fetch_all(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let compiled = compile(
            sql,
            params,
            PlaceholderStyle::QuestionMark,
            StringEscapes::Standard,
        )?;
        let mut conn = self.handle.acquire(|| open(&self.options)).await?;

        debug!(
            "sqlite fetch ({} params): {}",
            compiled.values.len(),
            compiled.sql.trim()
        );
        let rows: Vec<SqliteRow> = prepare(&compiled.sql, &compiled.values)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(e, &compiled.sql, "fetching SQLite rows"))?;

        rows.iter().map(|row| decode_row(row, &compiled.sql)).collect()
    }

    async fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    async fn close(&self) {
        if let Some(conn) = self.handle.take().await {
            if let Err(e) = conn.close().await {
                debug!("SQLite close: {}", e);
            }
            info!("SQLite connection closed");
        }
    }

    fn db_type(&self) -> &str {
        "sqlite"
    }
}
