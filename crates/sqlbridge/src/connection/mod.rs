//! The `Connection` composition root.
//!
//! A [`Connection`] pairs one [`RawConnection`] with the matching
//! [`DialectImpl`]. Fetch primitives go to the raw connection, SQL generation
//! goes to the dialect, and introspection rows are shaped into the descriptors
//! of [`crate::core::schema`]. Nothing is cached between calls.
//!
//! Every call that touches the handle runs under a fail-fast re-entrancy guard
//! and, when configured, a per-statement timeout.

mod guard;
mod introspect;

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ConnectionConfig, Driver};
use crate::core::params::Params;
use crate::core::schema::{
    ColumnDescriptor, ForeignKeyDescriptor, PrimaryKeySet, TableDescriptor, TableSchema,
};
use crate::core::traits::{Dialect, RawConnection, Statement};
use crate::core::value::{Row, SqlValue};
use crate::dialect::{DateToken, XmlFragments, XmlOptions};
use crate::drivers::{
    DialectImpl, MysqlRawConnection, PostgresRawConnection, SqliteRawConnection,
};
use crate::error::{DbError, Result};

use guard::ReentrancyGuard;

/// Single entry point to one database.
pub struct Connection {
    raw: Box<dyn RawConnection>,
    dialect: DialectImpl,
    default_schema: String,
    statement_timeout: Option<Duration>,
    guard: ReentrancyGuard,
}

impl Connection {
    /// Validate `config`, open the engine's raw connection and pair it with
    /// the engine's dialect.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let raw: Box<dyn RawConnection> = match config.driver {
            Driver::Mysql => Box::new(MysqlRawConnection::connect(config).await?),
            Driver::Postgres => Box::new(PostgresRawConnection::connect(config).await?),
            Driver::Sqlite => Box::new(SqliteRawConnection::connect(config).await?),
        };

        let conn = Self::new(raw, DialectImpl::for_driver(config.driver), config.default_schema())
            .with_statement_timeout(config.statement_timeout_secs.map(Duration::from_secs));
        info!(
            "{} connection ready (schema: {}, persistent: {})",
            config.driver, conn.default_schema, config.persistent
        );
        Ok(conn)
    }

    /// Pair any raw connection with a dialect. This is the seam for pooled or
    /// mocked handles.
    pub fn new(
        raw: Box<dyn RawConnection>,
        dialect: DialectImpl,
        default_schema: impl Into<String>,
    ) -> Self {
        Self {
            raw,
            dialect,
            default_schema: default_schema.into(),
            statement_timeout: None,
            guard: ReentrancyGuard::default(),
        }
    }

    /// Set the per-statement timeout (`None` disables it).
    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// The active dialect.
    pub fn dialect(&self) -> &DialectImpl {
        &self.dialect
    }

    /// Schema used when an introspection call passes `None`.
    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Quote an identifier for the active dialect.
    pub fn quote_ident(&self, name: &str) -> String {
        self.dialect.quote_ident(name)
    }

    /// Whether the handle is still usable.
    pub async fn is_open(&self) -> bool {
        self.raw.is_open().await
    }

    // ===== Guard and timeout =====

    async fn guarded<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _in_flight = self.guard.enter()?;
        op.await
    }

    async fn timed<T, F>(&self, statement: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, statement)
                .await
                .map_err(|_| DbError::Timeout {
                    seconds: limit.as_secs(),
                })?,
            None => statement.await,
        }
    }

    async fn rows(&self, statement: &Statement) -> Result<Vec<Row>> {
        debug!("{} statement: {}", self.dialect.name(), statement.sql.trim());
        self.timed(self.raw.fetch_all(&statement.sql, &statement.params))
            .await
    }

    fn schema_or_default<'a>(&'a self, schema: Option<&'a str>) -> &'a str {
        schema.unwrap_or(&self.default_schema)
    }

    // ===== Fetch primitives =====

    /// Execute a statement that returns no rows. Returns rows affected.
    pub async fn execute(&self, sql: &str, params: &Params) -> Result<u64> {
        self.guarded(self.timed(self.raw.execute(sql, params)))
            .await
    }

    /// Fetch every row of a query.
    pub async fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        self.guarded(self.timed(self.raw.fetch_all(sql, params)))
            .await
    }

    /// Same as [`Connection::query`].
    pub async fn fetch_all(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        self.query(sql, params).await
    }

    /// Fetch the first column of every row.
    pub async fn fetch_column(&self, sql: &str, params: &Params) -> Result<Vec<SqlValue>> {
        self.guarded(self.timed(self.raw.fetch_column(sql, params)))
            .await
    }

    /// Fetch column 0 of row 0; `None` when the query returns no rows.
    pub async fn fetch_scalar(&self, sql: &str, params: &Params) -> Result<Option<SqlValue>> {
        self.guarded(self.timed(self.raw.fetch_scalar(sql, params)))
            .await
    }

    /// Round-trip to the engine.
    pub async fn ping(&self) -> Result<()> {
        self.guarded(self.timed(self.raw.ping())).await
    }

    /// Close the handle. Later operations fail with a connection error.
    pub async fn close(&self) -> Result<()> {
        self.guarded(async {
            self.raw.close().await;
            Ok(())
        })
        .await
    }

    // ===== SQL generation =====

    /// Append a pagination clause to `sql`.
    pub fn set_limit(&self, sql: &str, records: u64, offset: u64) -> String {
        self.dialect.apply_limit(sql, records, offset)
    }

    /// Date-format expression for `token` (`Ym`, `Y`, `m` or `d`).
    pub fn date(&self, token: &str, datetime: Option<&str>, cast: Option<&str>) -> Result<String> {
        let token: DateToken = token.parse()?;
        Ok(self.dialect.date_expression(token, datetime, cast))
    }

    /// XPath extraction fragments over an XML-bearing column.
    pub fn xml(&self, column: &str, paths: &[&str], options: &XmlOptions) -> Result<XmlFragments> {
        self.dialect.xml_extract(column, paths, options)
    }

    // ===== Introspection =====

    /// Base tables of `schema`, ordered by name.
    pub async fn get_tables(&self, schema: Option<&str>) -> Result<Vec<TableDescriptor>> {
        self.guarded(self.load_tables(self.schema_or_default(schema)))
            .await
    }

    /// Comment of one table; empty when none is recorded or the engine keeps none.
    pub async fn get_comment(&self, table: &str, schema: Option<&str>) -> Result<String> {
        self.guarded(self.load_comment(self.schema_or_default(schema), table))
            .await
    }

    /// Columns of one table in ordinal order.
    pub async fn get_columns(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ColumnDescriptor>> {
        self.guarded(self.load_columns(self.schema_or_default(schema), table))
            .await
    }

    /// Primary key columns of one table in key order; empty when there is none.
    pub async fn get_primary_keys(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<PrimaryKeySet> {
        self.guarded(self.load_primary_keys(self.schema_or_default(schema), table))
            .await
    }

    /// Foreign key column pairs of one table; empty when there are none.
    pub async fn get_foreign_keys(
        &self,
        table: &str,
        schema: Option<&str>,
    ) -> Result<Vec<ForeignKeyDescriptor>> {
        self.guarded(self.load_foreign_keys(self.schema_or_default(schema), table))
            .await
    }

    /// Comment, columns, primary key and foreign keys of one table.
    pub async fn describe_table(&self, table: &str, schema: Option<&str>) -> Result<TableSchema> {
        let schema = self.schema_or_default(schema);
        self.guarded(async {
            let comment = self.load_comment(schema, table).await?;
            let columns = self.load_columns(schema, table).await?;
            let primary_key = self.load_primary_keys(schema, table).await?;
            let foreign_keys = self.load_foreign_keys(schema, table).await?;
            Ok(TableSchema {
                table: TableDescriptor {
                    name: table.to_string(),
                    comment,
                },
                columns,
                primary_key,
                foreign_keys,
            })
        })
        .await
    }

    async fn load_tables(&self, schema: &str) -> Result<Vec<TableDescriptor>> {
        let stmt = self.dialect.list_tables_query(schema);
        let tables = self
            .rows(&stmt)
            .await?
            .iter()
            .map(|row| introspect::table(row, &stmt.sql))
            .collect::<Result<Vec<_>>>()?;
        debug!("Found {} tables in {}", tables.len(), schema);
        Ok(tables)
    }

    async fn load_comment(&self, schema: &str, table: &str) -> Result<String> {
        let Some(stmt) = self.dialect.table_comment_query(schema, table) else {
            return Ok(String::new());
        };
        let comment = self
            .timed(self.raw.fetch_scalar(&stmt.sql, &stmt.params))
            .await?
            .and_then(|v| v.to_text())
            .unwrap_or_default();
        Ok(comment)
    }

    async fn load_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let stmt = self.dialect.list_columns_query(schema, table);
        let columns = self
            .rows(&stmt)
            .await?
            .iter()
            .map(|row| introspect::column(row, &stmt.sql))
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} columns for {}.{}", columns.len(), schema, table);
        Ok(columns)
    }

    async fn load_primary_keys(&self, schema: &str, table: &str) -> Result<PrimaryKeySet> {
        let stmt = self.dialect.list_primary_keys_query(schema, table);
        self.rows(&stmt)
            .await?
            .iter()
            .map(|row| introspect::primary_key_column(row, &stmt.sql))
            .collect()
    }

    async fn load_foreign_keys(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ForeignKeyDescriptor>> {
        let stmt = self.dialect.list_foreign_keys_query(schema, table);
        let fks = self
            .rows(&stmt)
            .await?
            .iter()
            .map(|row| introspect::foreign_key(row, &stmt.sql))
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} foreign key columns for {}.{}", fks.len(), schema, table);
        Ok(fks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type Responder = Box<dyn Fn(&str) -> Vec<Row> + Send + Sync>;

    /// Raw connection that answers from a closure and records every statement.
    struct MockRaw {
        respond: Responder,
        log: Arc<Mutex<Vec<(String, Params)>>>,
        delay: Option<Duration>,
    }

    impl MockRaw {
        fn new(respond: impl Fn(&str) -> Vec<Row> + Send + Sync + 'static) -> Self {
            Self {
                respond: Box::new(respond),
                log: Arc::new(Mutex::new(Vec::new())),
                delay: None,
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl RawConnection for MockRaw {
        async fn execute(&self, sql: &str, params: &Params) -> Result<u64> {
            Ok(self.fetch_all(sql, params).await?.len() as u64)
        }

        async fn fetch_all(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.log
                .lock()
                .unwrap()
                .push((sql.to_string(), params.clone()));
            Ok((self.respond)(sql))
        }

        async fn is_open(&self) -> bool {
            true
        }

        async fn close(&self) {}

        fn db_type(&self) -> &str {
            "mock"
        }
    }

    fn postgres(raw: MockRaw) -> Connection {
        Connection::new(
            Box::new(raw),
            DialectImpl::for_driver(Driver::Postgres),
            "public",
        )
    }

    #[tokio::test]
    async fn test_columns_shaped_from_postgres_catalog() {
        let raw = MockRaw::new(|_| {
            vec![Row::default()
                .with("column_name", "price")
                .with("data_type", "numeric")
                .with("character_maximum_length", SqlValue::Null)
                .with("numeric_precision", 10i32)
                .with("is_nullable", "YES")
                .with("column_default", SqlValue::Null)
                .with("column_comment", "")
                .with("extra", "")]
        });
        let log = raw.log.clone();
        let conn = postgres(raw);

        let columns = conn.get_columns("products", None).await.unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].length, Some(10));

        let log = log.lock().unwrap();
        let (sql, params) = &log[0];
        assert!(sql.contains("pg_description"));
        assert_eq!(params.get("schema"), Some(&SqlValue::from("public")));
        assert_eq!(params.get("table"), Some(&SqlValue::from("products")));
    }

    #[tokio::test]
    async fn test_explicit_schema_overrides_default() {
        let raw = MockRaw::new(|_| Vec::new());
        let log = raw.log.clone();
        let conn = postgres(raw);

        let tables = conn.get_tables(Some("audit")).await.unwrap();
        assert!(tables.is_empty());
        assert_eq!(
            log.lock().unwrap()[0].1.get("schema"),
            Some(&SqlValue::from("audit"))
        );
    }

    #[tokio::test]
    async fn test_missing_comment_is_empty_string() {
        let conn = postgres(MockRaw::new(|_| Vec::new()));
        assert_eq!(conn.get_comment("users", None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_empty_keys_are_empty_lists() {
        let conn = postgres(MockRaw::new(|_| Vec::new()));
        assert!(conn.get_primary_keys("log", None).await.unwrap().is_empty());
        assert!(conn.get_foreign_keys("log", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_describe_table_runs_under_one_guard() {
        let raw = MockRaw::new(|sql| {
            if sql.contains("indisprimary") {
                vec![Row::default().with("column_name", "id")]
            } else if sql.contains("'FOREIGN KEY'") {
                vec![Row::default()
                    .with("column_name", "user_id")
                    .with("referenced_table", "users")
                    .with("referenced_column", "id")
                    .with("constraint_name", "orders_user_id_fkey")]
            } else if sql.contains("objsubid = 0") {
                vec![Row::default().with("table_comment", "customer orders")]
            } else {
                vec![Row::default()
                    .with("column_name", "id")
                    .with("data_type", "int4")
                    .with("numeric_precision", 32i32)
                    .with("is_nullable", "NO")
                    .with("extra", "auto_increment")]
            }
        });
        let conn = postgres(raw);

        let schema = conn.describe_table("orders", None).await.unwrap();
        assert_eq!(schema.table.name, "orders");
        assert_eq!(schema.table.comment, "customer orders");
        assert_eq!(schema.primary_key, vec!["id".to_string()]);
        assert_eq!(schema.foreign_keys[0].referenced_table, "users");
        assert_eq!(schema.columns[0].extra, "auto_increment");
        assert!(schema.has_pk());
    }

    #[tokio::test]
    async fn test_overlapping_call_fails_fast() {
        let conn = postgres(MockRaw::new(|_| Vec::new()).slow(Duration::from_millis(200)));

        let empty = Params::new();
        let (first, second) = tokio::join!(conn.query("SELECT 1", &empty), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            conn.query("SELECT 2", &empty).await
        });
        assert!(first.is_ok());
        assert!(matches!(second.unwrap_err(), DbError::Busy));

        // Released once the first call finished
        assert!(conn.query("SELECT 3", &Params::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_statement_timeout() {
        let conn = postgres(MockRaw::new(|_| Vec::new()).slow(Duration::from_secs(5)))
            .with_statement_timeout(Some(Duration::from_millis(20)));

        let err = conn.ping().await.unwrap_err();
        assert!(matches!(err, DbError::Timeout { .. }));
        assert!(err.is_connection_error());

        // The guard is released when the timed-out future is dropped
        assert!(!conn.guard.is_busy());
    }

    #[tokio::test]
    async fn test_fetch_scalar_none_on_no_rows() {
        let conn = postgres(MockRaw::new(|_| Vec::new()));
        assert_eq!(
            conn.fetch_scalar("SELECT 1 WHERE false", &Params::new())
                .await
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_date_parses_token_and_rejects_unknown() {
        let conn = postgres(MockRaw::new(|_| Vec::new()));
        assert_eq!(
            conn.date("Ym", Some("created_at"), Some("int")).unwrap(),
            "TO_CHAR(created_at, 'YYYYmm')::int"
        );
        let err = conn.date("H", None, None).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedDateToken(t) if t == "H"));
    }

    #[test]
    fn test_set_limit_and_xml_delegate_to_dialect() {
        let conn = postgres(MockRaw::new(|_| Vec::new()));
        assert_eq!(
            conn.set_limit("SELECT * FROM t", 10, 20),
            "SELECT * FROM t LIMIT 10 OFFSET 20"
        );

        let opts = XmlOptions::default()
            .namespace("ns")
            .data_format(crate::dialect::XmlDataFormat::Xml);
        assert_eq!(
            conn.xml("col", &["a/b"], &opts).unwrap().into_vec(),
            vec!["BTRIM(XPATH('/n:a/n:b/text()', col, '{{n,ns}}')::TEXT, '{\"}')".to_string()]
        );
    }

    #[test]
    fn test_mysql_xml_is_unsupported() {
        let conn = Connection::new(
            Box::new(MockRaw::new(|_| Vec::new())),
            DialectImpl::for_driver(Driver::Mysql),
            "shop",
        );
        let err = conn.xml("payload", &["a"], &XmlOptions::default()).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedCapability { .. }));
    }
}
