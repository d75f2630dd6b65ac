//! Shaping of catalog rows into schema descriptors.
//!
//! Each dialect's introspection query returns the normalized column aliases
//! listed on [`Dialect`](crate::core::Dialect); this module reads those rows
//! without knowing which engine produced them.

use crate::core::schema::{
    base_type_name, declared_length, ColumnDescriptor, ForeignKeyDescriptor, TableDescriptor,
};
use crate::core::value::Row;
use crate::error::{DbError, Result};

fn required(row: &Row, column: &str, sql: &str) -> Result<String> {
    row.get_text(column).ok_or_else(|| {
        DbError::query(
            format!("introspection row has no value for '{}'", column),
            sql,
        )
    })
}

pub(crate) fn table(row: &Row, sql: &str) -> Result<TableDescriptor> {
    Ok(TableDescriptor {
        name: required(row, "table_name", sql)?,
        comment: row.get_text("table_comment").unwrap_or_default(),
    })
}

pub(crate) fn column(row: &Row, sql: &str) -> Result<ColumnDescriptor> {
    let declared = required(row, "data_type", sql)?;
    // Character length wins; numeric precision next; SQLite only has the
    // declared type to go on.
    let length = row
        .get_i64("character_maximum_length")
        .or_else(|| row.get_i64("numeric_precision"))
        .or_else(|| declared_length(&declared));

    Ok(ColumnDescriptor {
        name: required(row, "column_name", sql)?,
        data_type: base_type_name(&declared),
        length,
        nullable: row
            .get_text("is_nullable")
            .is_some_and(|v| v.eq_ignore_ascii_case("YES")),
        default: row.get_text("column_default"),
        comment: row.get_text("column_comment").unwrap_or_default(),
        extra: row.get_text("extra").unwrap_or_default(),
    })
}

pub(crate) fn primary_key_column(row: &Row, sql: &str) -> Result<String> {
    required(row, "column_name", sql)
}

pub(crate) fn foreign_key(row: &Row, sql: &str) -> Result<ForeignKeyDescriptor> {
    Ok(ForeignKeyDescriptor {
        column: required(row, "column_name", sql)?,
        referenced_table: required(row, "referenced_table", sql)?,
        referenced_column: required(row, "referenced_column", sql)?,
        constraint_name: row.get_text("constraint_name").unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;

    #[test]
    fn test_numeric_length_falls_back_to_precision() {
        let row = Row::default()
            .with("column_name", "price")
            .with("data_type", "numeric")
            .with("character_maximum_length", SqlValue::Null)
            .with("numeric_precision", 10i32)
            .with("is_nullable", "NO")
            .with("column_default", SqlValue::Null)
            .with("column_comment", "")
            .with("extra", "");

        let col = column(&row, "").unwrap();
        assert_eq!(col.name, "price");
        assert_eq!(col.data_type, "numeric");
        assert_eq!(col.length, Some(10));
        assert!(!col.nullable);
        assert_eq!(col.default, None);
    }

    #[test]
    fn test_character_length_preferred() {
        let row = Row::default()
            .with("column_name", "email")
            .with("data_type", "varchar")
            .with("character_maximum_length", 255i64)
            .with("numeric_precision", SqlValue::Null)
            .with("is_nullable", "YES");

        let col = column(&row, "").unwrap();
        assert_eq!(col.length, Some(255));
        assert!(col.nullable);
        assert_eq!(col.comment, "");
        assert_eq!(col.extra, "");
    }

    #[test]
    fn test_declared_type_suffix_is_stripped() {
        let row = Row::default()
            .with("column_name", "amount")
            .with("data_type", "NUMERIC(10,2)")
            .with("is_nullable", "YES")
            .with("column_default", "0");

        let col = column(&row, "").unwrap();
        assert_eq!(col.data_type, "NUMERIC");
        assert_eq!(col.length, Some(10));
        assert_eq!(col.default.as_deref(), Some("0"));
    }

    #[test]
    fn test_missing_table_comment_is_empty() {
        let row = Row::default()
            .with("table_name", "users")
            .with("table_comment", SqlValue::Null);
        let t = table(&row, "").unwrap();
        assert_eq!(t.name, "users");
        assert_eq!(t.comment, "");
    }

    #[test]
    fn test_upper_case_catalog_columns() {
        let row = Row::default()
            .with("COLUMN_NAME", "user_id")
            .with("REFERENCED_TABLE", "users")
            .with("REFERENCED_COLUMN", "id")
            .with("CONSTRAINT_NAME", "fk_orders_user");
        let fk = foreign_key(&row, "").unwrap();
        assert_eq!(fk.column, "user_id");
        assert_eq!(fk.referenced_table, "users");
        assert_eq!(fk.constraint_name, "fk_orders_user");
    }

    #[test]
    fn test_missing_required_column_is_query_error() {
        let row = Row::default().with("table_comment", "x");
        let err = table(&row, "SELECT 1").unwrap_err();
        assert!(matches!(err, DbError::Query { .. }));
    }
}
