//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific SQL syntax for identifier quoting, pagination,
//! date formatting and `information_schema` introspection.

use crate::core::params::{Params, PlaceholderStyle};
use crate::core::traits::{Dialect, Statement};
use crate::dialect::DateToken;

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

/// MySQL `DATE_FORMAT` string for a token. Shared with SQLite's `strftime`.
pub(crate) fn mysql_date_format(token: DateToken) -> &'static str {
    match token {
        DateToken::YearMonth => "%Y%m",
        DateToken::Year => "%Y",
        DateToken::Month => "%m",
        DateToken::Day => "%e",
    }
}

/// Append `LIMIT offset,count`. Offset comes first in this form.
pub(crate) fn limit_offset_first(sql: &str, records: u64, offset: u64) -> String {
    format!("{} LIMIT {},{}", sql, offset, records)
}

fn schema_table_params(schema: &str, table: &str) -> Params {
    Params::new().bind("schema", schema).bind("table", table)
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // MySQL uses backticks for identifier quoting
        // Handle names that contain backticks by doubling them
        format!("`{}`", name.replace('`', "``"))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn apply_limit(&self, sql: &str, records: u64, offset: u64) -> String {
        limit_offset_first(sql, records, offset)
    }

    fn date_format(&self, token: DateToken) -> &'static str {
        mysql_date_format(token)
    }

    fn date_expression(
        &self,
        token: DateToken,
        datetime: Option<&str>,
        _cast: Option<&str>,
    ) -> String {
        format!(
            "DATE_FORMAT({}, '{}')",
            datetime.unwrap_or("NOW()"),
            self.date_format(token)
        )
    }

    fn list_tables_query(&self, schema: &str) -> Statement {
        // CAST to CHAR to handle collation differences where information_schema
        // may return VARBINARY instead of VARCHAR
        let sql = r#"
            SELECT
                CAST(TABLE_NAME AS CHAR(255)) AS table_name,
                CAST(COALESCE(TABLE_COMMENT, '') AS CHAR(2048)) AS table_comment
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = :schema AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;
        Statement::new(sql, Params::new().bind("schema", schema))
    }

    fn table_comment_query(&self, schema: &str, table: &str) -> Option<Statement> {
        let sql = r#"
            SELECT CAST(COALESCE(TABLE_COMMENT, '') AS CHAR(2048)) AS table_comment
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = :schema AND TABLE_NAME = :table
        "#;
        Some(Statement::new(sql, schema_table_params(schema, table)))
    }

    fn list_columns_query(&self, schema: &str, table: &str) -> Statement {
        // Lengths above i64 range cannot occur (LONGTEXT is 4294967295), so a
        // SIGNED cast is lossless and avoids unsigned decoding.
        let sql = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
                CAST(DATA_TYPE AS CHAR(255)) AS data_type,
                CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS character_maximum_length,
                CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
                CAST(IS_NULLABLE AS CHAR(3)) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR(4000)) AS column_default,
                CAST(COALESCE(COLUMN_COMMENT, '') AS CHAR(2048)) AS column_comment,
                CAST(COALESCE(EXTRA, '') AS CHAR(255)) AS extra
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = :schema AND TABLE_NAME = :table
            ORDER BY ORDINAL_POSITION
        "#;
        Statement::new(sql, schema_table_params(schema, table))
    }

    fn list_primary_keys_query(&self, schema: &str, table: &str) -> Statement {
        let sql = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS column_name
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = :schema AND TABLE_NAME = :table
              AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;
        Statement::new(sql, schema_table_params(schema, table))
    }

    fn list_foreign_keys_query(&self, schema: &str, table: &str) -> Statement {
        let sql = r#"
            SELECT
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS column_name,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS referenced_table,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS referenced_column,
                CAST(tc.CONSTRAINT_NAME AS CHAR(255)) AS constraint_name
            FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND tc.TABLE_NAME = kcu.TABLE_NAME
            WHERE tc.TABLE_SCHEMA = :schema AND tc.TABLE_NAME = :table
              AND tc.CONSTRAINT_TYPE = 'FOREIGN KEY'
            ORDER BY tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
        "#;
        Statement::new(sql, schema_table_params(schema, table))
    }
}
