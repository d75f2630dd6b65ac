//! PostgreSQL raw connection.
//!
//! Wraps one `tokio_postgres::Client`; the protocol task runs on the tokio
//! runtime. Parameters are bound as `$n` with binary encoding chosen by the
//! server-inferred parameter type, so one [`SqlValue`] shape serves any column.

use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use tokio_postgres::{Client, Config as PgConfig, NoTls, Row as PgRow};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ConnectionConfig;
use crate::core::params::{compile, Params, PlaceholderStyle, StringEscapes};
use crate::core::traits::RawConnection;
use crate::core::value::{Row, SqlValue};
use crate::drivers::common::Handle;
use crate::error::{DbError, Result};

/// Connect timeout for new handles.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL raw connection over a single client.
pub struct PostgresRawConnection {
    config: PgConfig,
    handle: Handle<Client>,
}

impl PostgresRawConnection {
    /// Create a connection from configuration. The configured schema becomes
    /// the session `search_path`; a statement timeout is also enforced
    /// server-side.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut pg = PgConfig::new();
        pg.host(&config.host)
            .port(config.port())
            .dbname(&config.database)
            .user(&config.user)
            .password(&config.password)
            .application_name("sqlbridge")
            .connect_timeout(CONNECT_TIMEOUT);
        pg.options(&session_options(config));

        let handle = if config.persistent {
            let client = open(&pg).await?;
            info!("Connected to PostgreSQL: {}", config.endpoint());
            Handle::open(client, "PostgreSQL")
        } else {
            debug!(
                "PostgreSQL connection to {} opens on first use",
                config.endpoint()
            );
            Handle::lazy("PostgreSQL")
        };

        Ok(Self { config: pg, handle })
    }
}

/// Startup `options` value: `-c name=value` pairs.
fn session_options(config: &ConnectionConfig) -> String {
    let mut options = vec![format!("-c search_path={}", config.default_schema())];
    if let Some(charset) = config.charset() {
        options.push(format!("-c client_encoding={}", charset));
    }
    if let Some(secs) = config.statement_timeout_secs {
        let millis = secs.saturating_mul(1000).min(i32::MAX as u64);
        options.push(format!("-c statement_timeout={}", millis));
    }
    options.join(" ")
}

async fn open(config: &PgConfig) -> Result<Client> {
    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| DbError::connection(e, "connecting to PostgreSQL"))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!("PostgreSQL connection terminated: {}", e);
        }
    });

    Ok(client)
}

fn as_params(values: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

/// Write text in the binary format of a text-like type.
fn put_text(text: &str, ty: &Type, out: &mut BytesMut) -> IsNull {
    if *ty == Type::JSONB {
        // jsonb binary format version
        out.put_u8(1);
    }
    out.extend_from_slice(text.as_bytes());
    IsNull::No
}

fn is_text_like(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        // information_schema columns are domains over name/text
        let ty = match ty.kind() {
            Kind::Domain(inner) => inner,
            _ => ty,
        };

        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql_checked(ty, out),
            SqlValue::I64(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::OID => u32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                Type::BOOL => (*v != 0).to_sql(ty, out),
                _ if is_text_like(ty) => Ok(put_text(&v.to_string(), ty, out)),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::F64(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ if is_text_like(ty) => Ok(put_text(&v.to_string(), ty, out)),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Decimal(v) => match *ty {
                Type::FLOAT4 | Type::FLOAT8 => v
                    .to_f64()
                    .ok_or("decimal out of float range")?
                    .to_sql_checked(ty, out),
                _ if is_text_like(ty) => Ok(put_text(&v.to_string(), ty, out)),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Text(s) => match *ty {
                Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
                Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
                Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
                Type::NUMERIC => s.trim().parse::<Decimal>()?.to_sql(ty, out),
                Type::UUID => Uuid::parse_str(s.trim())?.to_sql(ty, out),
                Type::BYTEA => s.as_bytes().to_sql(ty, out),
                // text, varchar, name, xml, json(b), enums: the binary format is the text
                _ => Ok(put_text(s, ty, out)),
            },
            SqlValue::Bytes(v) => v.as_slice().to_sql_checked(ty, out),
            SqlValue::Date(v) => match *ty {
                Type::TIMESTAMP => v.and_time(NaiveTime::MIN).to_sql(ty, out),
                _ if is_text_like(ty) => Ok(put_text(&v.to_string(), ty, out)),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Time(v) if is_text_like(ty) => Ok(put_text(&v.to_string(), ty, out)),
            SqlValue::Time(v) => v.to_sql_checked(ty, out),
            SqlValue::DateTime(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                Type::DATE => v.date().to_sql(ty, out),
                _ if is_text_like(ty) => Ok(put_text(&v.to_string(), ty, out)),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Uuid(v) if is_text_like(ty) => Ok(put_text(&v.to_string(), ty, out)),
            SqlValue::Uuid(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Text-format value of a type with no dedicated decoder (enums, xml, json).
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawText(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a PgRow, i: usize, sql: &str) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(i)
        .map_err(|e| DbError::from_postgres(e, sql, "decoding PostgreSQL row"))
}

/// Convert a PostgreSQL row into a [`Row`].
fn decode_row(row: &PgRow, sql: &str) -> Result<Row> {
    let mut out = Row::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_value(row, i, column.type_(), sql).map_err(|e| match e {
            DbError::UnsupportedType { type_name, .. } => DbError::UnsupportedType {
                column: column.name().to_string(),
                type_name,
            },
            other => other,
        })?;
        out.insert(column.name(), value);
    }
    Ok(out)
}

fn decode_value(row: &PgRow, i: usize, ty: &Type, sql: &str) -> Result<SqlValue> {
    let value = match *ty {
        Type::BOOL => get::<bool>(row, i, sql)?.map(SqlValue::Bool),
        Type::INT2 => get::<i16>(row, i, sql)?.map(|v| SqlValue::I64(v.into())),
        Type::INT4 => get::<i32>(row, i, sql)?.map(|v| SqlValue::I64(v.into())),
        Type::INT8 => get::<i64>(row, i, sql)?.map(SqlValue::I64),
        Type::OID => get::<u32>(row, i, sql)?.map(|v| SqlValue::I64(v.into())),
        Type::FLOAT4 => get::<f32>(row, i, sql)?.map(|v| SqlValue::F64(v.into())),
        Type::FLOAT8 => get::<f64>(row, i, sql)?.map(SqlValue::F64),
        Type::NUMERIC => get::<Decimal>(row, i, sql)?.map(SqlValue::Decimal),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get::<String>(row, i, sql)?.map(SqlValue::Text)
        }
        Type::JSON | Type::JSONB => {
            get::<serde_json::Value>(row, i, sql)?.map(|v| SqlValue::Text(v.to_string()))
        }
        Type::XML => get::<RawText>(row, i, sql)?.map(|v| SqlValue::Text(v.0)),
        Type::BYTEA => get::<Vec<u8>>(row, i, sql)?.map(SqlValue::Bytes),
        Type::DATE => get::<NaiveDate>(row, i, sql)?.map(SqlValue::Date),
        Type::TIME => get::<NaiveTime>(row, i, sql)?.map(SqlValue::Time),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, i, sql)?.map(SqlValue::DateTime),
        Type::TIMESTAMPTZ => {
            get::<DateTime<Utc>>(row, i, sql)?.map(|v| SqlValue::DateTime(v.naive_utc()))
        }
        Type::UUID => get::<Uuid>(row, i, sql)?.map(SqlValue::Uuid),
        _ => match ty.kind() {
            Kind::Enum(_) => get::<RawText>(row, i, sql)?.map(|v| SqlValue::Text(v.0)),
            Kind::Domain(inner) => return decode_value(row, i, inner, sql),
            _ => {
                return Err(DbError::UnsupportedType {
                    column: String::new(),
                    type_name: ty.name().to_string(),
                })
            }
        },
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

#[async_trait]
impl RawConnection for PostgresRawConnection {
    async fn execute(&self, sql: &str, params: &Params) -> Result<u64> {
        let compiled = compile(sql, params, PlaceholderStyle::Numbered, StringEscapes::Standard)?;
        let client = self.handle.acquire(|| open(&self.config)).await?;

        debug!(
            "postgres execute ({} params): {}",
            compiled.values.len(),
            compiled.sql.trim()
        );
        client
            .execute(compiled.sql.as_str(), &as_params(&compiled.values))
            .await
            .map_err(|e| DbError::from_postgres(e, &compiled.sql, "executing PostgreSQL statement"))
    }

    async fn fetch_all(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let compiled = compile(sql, params, PlaceholderStyle::Numbered, StringEscapes::Standard)?;
        let client = self.handle.acquire(|| open(&self.config)).await?;

        debug!(
            "postgres fetch ({} params): {}",
            compiled.values.len(),
            compiled.sql.trim()
        );
        let rows = client
            .query(compiled.sql.as_str(), &as_params(&compiled.values))
            .await
            .map_err(|e| DbError::from_postgres(e, &compiled.sql, "fetching PostgreSQL rows"))?;

        rows.iter().map(|row| decode_row(row, &compiled.sql)).collect()
    }

    async fn ping(&self) -> Result<()> {
        let client = self.handle.acquire(|| open(&self.config)).await?;
        client
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| DbError::from_postgres(e, "SELECT 1", "pinging PostgreSQL"))
    }

    async fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    async fn close(&self) {
        // Dropping the client ends the protocol task.
        if self.handle.take().await.is_some() {
            info!("PostgreSQL connection closed");
        }
    }

    fn db_type(&self) -> &str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Driver;

    fn encode(value: &SqlValue, ty: &Type) -> Vec<u8> {
        let mut out = BytesMut::new();
        value.to_sql_checked(ty, &mut out).unwrap();
        out.to_vec()
    }

    #[test]
    fn test_integers_narrow_to_parameter_type() {
        assert_eq!(encode(&SqlValue::I64(7), &Type::INT4), 7i32.to_be_bytes());
        assert_eq!(encode(&SqlValue::I64(7), &Type::INT2), 7i16.to_be_bytes());
        assert_eq!(encode(&SqlValue::I64(7), &Type::INT8), 7i64.to_be_bytes());

        let mut out = BytesMut::new();
        assert!(SqlValue::I64(i64::MAX)
            .to_sql_checked(&Type::INT4, &mut out)
            .is_err());
    }

    #[test]
    fn test_text_binds_to_name_and_jsonb() {
        assert_eq!(encode(&SqlValue::from("public"), &Type::NAME), b"public");
        assert_eq!(encode(&SqlValue::from("{}"), &Type::JSONB), b"\x01{}");
        assert_eq!(encode(&SqlValue::from("42"), &Type::INT4), 42i32.to_be_bytes());
    }

    #[test]
    fn test_null_binds_to_any_type() {
        let mut out = BytesMut::new();
        let is_null = SqlValue::Null.to_sql_checked(&Type::UUID, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn test_mismatched_type_is_rejected() {
        let mut out = BytesMut::new();
        assert!(SqlValue::Bool(true)
            .to_sql_checked(&Type::INT4, &mut out)
            .is_err());
    }

    #[test]
    fn test_session_options() {
        let mut config = ConnectionConfig::new(Driver::Postgres, "app");
        config.schema = Some("sales".to_string());
        config.statement_timeout_secs = Some(5);
        assert_eq!(
            session_options(&config),
            "-c search_path=sales -c client_encoding=UTF8 -c statement_timeout=5000"
        );
    }

    #[test]
    fn test_session_options_clamps_huge_timeout() {
        let mut config = ConnectionConfig::new(Driver::Postgres, "app");
        config.statement_timeout_secs = Some(u64::MAX / 10);
        assert!(session_options(&config).ends_with("-c statement_timeout=2147483647"));
    }

    #[tokio::test]
    async fn test_lazy_connect_does_not_touch_network() {
        let mut config = ConnectionConfig::new(Driver::Postgres, "app");
        config.host = "127.0.0.1".to_string();
        config.user = "postgres".to_string();
        config.persistent = false;

        let conn = PostgresRawConnection::connect(&config).await.unwrap();
        assert!(conn.is_open().await);
        conn.close().await;
        assert!(!conn.is_open().await);
        assert!(conn.ping().await.unwrap_err().is_connection_error());
    }
}
