//! SQLite SQL dialect.
//!
//! Pagination follows the MySQL form. Dates go through `strftime`, and
//! introspection reads `sqlite_master` and the `pragma_*` table-valued functions.

use crate::core::params::{Params, PlaceholderStyle};
use crate::core::traits::{Dialect, Statement};
use crate::dialect::DateToken;
use crate::drivers::mysql::{limit_offset_first, mysql_date_format};

/// SQLite dialect implementation (3.16+ for table-valued pragmas).
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Create a new SQLite dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
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
        let expr = datetime.unwrap_or("'now'");
        match token {
            // strftime has no unpadded day
            DateToken::Day => format!("LTRIM(strftime('%d', {}), '0')", expr),
            _ => format!("strftime('{}', {})", self.date_format(token), expr),
        }
    }

    fn list_tables_query(&self, schema: &str) -> Statement {
        let sql = format!(
            r#"
            SELECT name AS table_name, '' AS table_comment
            FROM {}.sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#,
            self.quote_ident(schema)
        );
        Statement::new(sql, Params::new())
    }

    fn table_comment_query(&self, _schema: &str, _table: &str) -> Option<Statement> {
        None
    }

    fn list_columns_query(&self, schema: &str, table: &str) -> Statement {
        // A PRIMARY KEY only implies NOT NULL for the INTEGER rowid alias.
        let sql = r#"
            SELECT
                name AS column_name,
                type AS data_type,
                NULL AS character_maximum_length,
                NULL AS numeric_precision,
                CASE
                    WHEN "notnull" = 1 THEN 'NO'
                    WHEN pk = 1 AND UPPER(type) = 'INTEGER' AND (
                        SELECT COUNT(*) FROM pragma_table_info(:table, :schema) WHERE pk > 0
                    ) = 1 THEN 'NO'
                    ELSE 'YES'
                END AS is_nullable,
                dflt_value AS column_default,
                '' AS column_comment,
                '' AS extra
            FROM pragma_table_info(:table, :schema)
            ORDER BY cid
        "#;
        Statement::new(sql, table_params(schema, table))
    }

    fn list_primary_keys_query(&self, schema: &str, table: &str) -> Statement {
        let sql = r#"
            SELECT name AS column_name
            FROM pragma_table_info(:table, :schema)
            WHERE pk > 0
            ORDER BY pk
        "#;
        Statement::new(sql, table_params(schema, table))
    }

    fn list_foreign_keys_query(&self, schema: &str, table: &str) -> Statement {
        let sql = r#"
            SELECT
                "from" AS column_name,
                "table" AS referenced_table,
                "to" AS referenced_column,
                'fk_' || :table || '_' || id AS constraint_name
            FROM pragma_foreign_key_list(:table, :schema)
            ORDER BY id, seq
        "#;
        Statement::new(sql, table_params(schema, table))
    }
}

fn table_params(schema: &str, table: &str) -> Params {
    Params::new().bind("schema", schema).bind("table", table)
}
