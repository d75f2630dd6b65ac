//! MySQL/MariaDB raw connection.
//!
//! Wraps one SQLx `MySqlConnection`. Named placeholders are compiled to `?`
//! and bound positionally; result columns are decoded by their wire type.

use async_trait::async_trait;
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode,
};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Connection as _, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::params::{compile, Params, PlaceholderStyle, StringEscapes};
use crate::core::traits::RawConnection;
use crate::core::value::{Row, SqlValue};
use crate::drivers::common::Handle;
use crate::error::{DbError, Result};

/// MySQL/MariaDB raw connection over a single SQLx handle.
pub struct MysqlRawConnection {
    options: MySqlConnectOptions,
    handle: Handle<MySqlConnection>,
}

impl MysqlRawConnection {
    /// Create a connection from configuration. Opens the handle now when
    /// `persistent` is set, otherwise on the first statement.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);
        if let Some(charset) = config.charset() {
            options = options.charset(charset);
        }

        let handle = if config.persistent {
            let conn = open(&options).await?;
            info!("Connected to MySQL: {}", config.endpoint());
            Handle::open(conn, "MySQL")
        } else {
            debug!("MySQL connection to {} opens on first use", config.endpoint());
            Handle::lazy("MySQL")
        };

        Ok(Self { options, handle })
    }
}

async fn open(options: &MySqlConnectOptions) -> Result<MySqlConnection> {
    options
        .connect()
        .await
        .map_err(|e| DbError::from_sqlx(e, "", "connecting to MySQL"))
}

/// Bind one value. Types MySQL has no native form for travel as text.
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::I64(v) => query.bind(*v),
        SqlValue::F64(v) => query.bind(*v),
        SqlValue::Decimal(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Bytes(v) => query.bind(v.clone()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Uuid(v) => query.bind(v.to_string()),
    }
}

fn prepare<'q>(sql: &'q str, values: &[SqlValue]) -> Query<'q, MySql, MySqlArguments> {
    values
        .iter()
        .fold(sqlx::query(sql), |query, value| bind_value(query, value))
}

/// Convert a MySQL row into a [`Row`].
fn decode_row(row: &MySqlRow, sql: &str) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, i, column.type_info().name())
            .map_err(|e| DbError::from_sqlx(e, sql, "decoding MySQL row"))?;
        out.insert(column.name(), value);
    }
    Ok(out)
}

fn decode_value(row: &MySqlRow, i: usize, type_name: &str) -> std::result::Result<SqlValue, sqlx::Error> {
    let is_null = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return Ok(SqlValue::Null);
    }

    let value = match type_name {
        "BOOLEAN" => SqlValue::Bool(row.try_get_unchecked::<bool, _>(i)?),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            SqlValue::I64(row.try_get_unchecked::<i64, _>(i)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            let v = row.try_get_unchecked::<u64, _>(i)?;
            i64::try_from(v)
                .map(SqlValue::I64)
                .unwrap_or_else(|_| SqlValue::Decimal(rust_decimal::Decimal::from(v)))
        }

        "FLOAT" => SqlValue::F64(f64::from(row.try_get_unchecked::<f32, _>(i)?)),
        "DOUBLE" => SqlValue::F64(row.try_get_unchecked::<f64, _>(i)?),
        "DECIMAL" => SqlValue::Decimal(row.try_get_unchecked::<rust_decimal::Decimal, _>(i)?),

        "DATE" => SqlValue::Date(row.try_get_unchecked::<chrono::NaiveDate, _>(i)?),
        "TIME" => SqlValue::Time(row.try_get_unchecked::<chrono::NaiveTime, _>(i)?),
        "DATETIME" | "TIMESTAMP" => {
            SqlValue::DateTime(row.try_get_unchecked::<chrono::NaiveDateTime, _>(i)?)
        }

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(i)?)
        }

        // Text types, ENUM, SET, JSON and anything newer: text, then raw bytes
        _ => match row.try_get_unchecked::<String, _>(i) {
            Ok(s) => SqlValue::Text(s),
            Err(_) => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(i)?),
        },
    };
    Ok(value)
}

#[async_trait]
impl RawConnection for MysqlRawConnection {
    async fn execute(&self, sql: &str, params: &Params) -> Result<u64> {
        let compiled = compile(
            sql,
            params,
            PlaceholderStyle::QuestionMark,
            StringEscapes::Backslash,
        )?;
        let mut conn = self.handle.acquire(|| open(&self.options)).await?;

        debug!(
            "mysql execute ({} params): {}",
            compiled.values.len(),
            compiled.sql.trim()
        );
        let result = prepare(&compiled.sql, &compiled.values)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(e, &compiled.sql, "executing MySQL statement"))?;

        Ok(result.rows_affected())
    }

    async fn fetch_all(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let compiled = compile(
            sql,
            params,
            PlaceholderStyle::QuestionMark,
            StringEscapes::Backslash,
        )?;
        let mut conn = self.handle.acquire(|| open(&self.options)).await?;

        debug!(
            "mysql fetch ({} params): {}",
            compiled.values.len(),
            compiled.sql.trim()
        );
        let rows: Vec<MySqlRow> = prepare(&compiled.sql, &compiled.values)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(e, &compiled.sql, "fetching MySQL rows"))?;

        rows.iter().map(|row| decode_row(row, &compiled.sql)).collect()
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.handle.acquire(|| open(&self.options)).await?;
        conn.ping()
            .await
            .map_err(|e| DbError::from_sqlx(e, "", "pinging MySQL"))
    }

    async fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    async fn close(&self) {
        if let Some(conn) = self.handle.take().await {
            // The handle is gone either way; a failed COM_QUIT only means the
            // server already dropped it.
            if let Err(e) = conn.close().await {
                debug!("MySQL close: {}", e);
            }
            info!("MySQL connection closed");
        }
    }

    fn db_type(&self) -> &str {
        "mysql"
    }
}
