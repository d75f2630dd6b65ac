//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! PostgreSQL is the only engine with XPath extraction. Its comments live in
//! `pg_description`, keyed by the table OID and, for columns, `objsubid`.

use crate::core::params::{Params, PlaceholderStyle};
use crate::core::traits::{Dialect, Statement};
use crate::dialect::{DateToken, XmlFragments, XmlOptions};
use crate::error::Result;

use super::xml;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

fn schema_table_params(schema: &str, table: &str) -> Params {
    Params::new().bind("schema", schema).bind("table", table)
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        // PostgreSQL uses double quotes for identifier quoting
        // Handle names that contain double quotes by doubling them
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn apply_limit(&self, sql: &str, records: u64, offset: u64) -> String {
        format!("{} LIMIT {} OFFSET {}", sql, records, offset)
    }

    fn date_format(&self, token: DateToken) -> &'static str {
        match token {
            DateToken::YearMonth => "YYYYmm",
            DateToken::Year => "YYYY",
            DateToken::Month => "mm",
            DateToken::Day => "DD",
        }
    }

    fn date_expression(
        &self,
        token: DateToken,
        datetime: Option<&str>,
        cast: Option<&str>,
    ) -> String {
        let mut sql = format!(
            "TO_CHAR({}, '{}')",
            datetime.unwrap_or("NOW()"),
            self.date_format(token)
        );
        if let Some(cast) = cast.filter(|c| !c.is_empty()) {
            sql.push_str("::");
            sql.push_str(cast);
        }
        sql
    }

    fn xml_extract(
        &self,
        column: &str,
        paths: &[&str],
        options: &XmlOptions,
    ) -> Result<XmlFragments> {
        Ok(xml::build_fragments(column, paths, options))
    }

    fn list_tables_query(&self, schema: &str) -> Statement {
        let sql = r#"
            SELECT
                t.table_name::text AS table_name,
                COALESCE(d.description, '') AS table_comment
            FROM information_schema.tables t
            JOIN pg_catalog.pg_namespace n ON n.nspname = t.table_schema
            JOIN pg_catalog.pg_class c ON c.relname = t.table_name AND c.relnamespace = n.oid
            LEFT JOIN pg_catalog.pg_description d ON d.objoid = c.oid AND d.objsubid = 0
            WHERE t.table_schema = :schema AND t.table_type = 'BASE TABLE'
            ORDER BY t.table_name
        "#;
        Statement::new(sql, Params::new().bind("schema", schema))
    }

    fn table_comment_query(&self, schema: &str, table: &str) -> Option<Statement> {
        let sql = r#"
            SELECT COALESCE(d.description, '') AS table_comment
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_catalog.pg_description d ON d.objoid = c.oid AND d.objsubid = 0
            WHERE n.nspname = :schema AND c.relname = :table
        "#;
        Some(Statement::new(sql, schema_table_params(schema, table)))
    }

    fn list_columns_query(&self, schema: &str, table: &str) -> Statement {
        let sql = r#"
            SELECT
                col.column_name::text AS column_name,
                col.udt_name::text AS data_type,
                col.character_maximum_length::int4 AS character_maximum_length,
                col.numeric_precision::int4 AS numeric_precision,
                col.is_nullable::text AS is_nullable,
                col.column_default::text AS column_default,
                COALESCE(d.description, '') AS column_comment,
                CASE
                    WHEN col.is_identity = 'YES' OR col.column_default LIKE 'nextval(%'
                        THEN 'auto_increment'
                    ELSE ''
                END AS extra
            FROM information_schema.columns col
            JOIN pg_catalog.pg_namespace n ON n.nspname = col.table_schema
            JOIN pg_catalog.pg_class c ON c.relname = col.table_name AND c.relnamespace = n.oid
            LEFT JOIN pg_catalog.pg_description d
                ON d.objoid = c.oid AND d.objsubid = col.ordinal_position
            WHERE col.table_schema = :schema AND col.table_name = :table
            ORDER BY col.ordinal_position
        "#;
        Statement::new(sql, schema_table_params(schema, table))
    }

    fn list_primary_keys_query(&self, schema: &str, table: &str) -> Statement {
        // The index flagged indisprimary names the constraint whose columns
        // constraint_column_usage lists; indkey supplies the key order.
        let sql = r#"
            SELECT ccu.column_name::text AS column_name
            FROM pg_catalog.pg_index i
            JOIN pg_catalog.pg_class t ON t.oid = i.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_class ic ON ic.oid = i.indexrelid
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_schema = n.nspname
                AND ccu.constraint_name = ic.relname
                AND ccu.table_name = t.relname
            JOIN pg_catalog.pg_attribute a
                ON a.attrelid = t.oid AND a.attname = ccu.column_name
            WHERE i.indisprimary AND n.nspname = :schema AND t.relname = :table
            ORDER BY array_position(i.indkey::int2[], a.attnum)
        "#;
        Statement::new(sql, schema_table_params(schema, table))
    }

    fn list_foreign_keys_query(&self, schema: &str, table: &str) -> Statement {
        let sql = r#"
            SELECT
                kcu.column_name::text AS column_name,
                ccu.table_name::text AS referenced_table,
                ccu.column_name::text AS referenced_column,
                tc.constraint_name::text AS constraint_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_name = tc.constraint_name
                AND ccu.constraint_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = :schema AND tc.table_name = :table
            ORDER BY tc.constraint_name, kcu.ordinal_position
        "#;
        Statement::new(sql, schema_table_params(schema, table))
    }
}
