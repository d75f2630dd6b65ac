//! Dialect-neutral schema descriptors produced by introspection.
//!
//! Every value here is rebuilt from the live catalog on each call; nothing in
//! this layer caches schema state.

use serde::{Deserialize, Serialize};

/// A base table (views are never reported).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,

    /// Catalog comment, empty when none is recorded.
    pub comment: String,
}

/// A table column, in physical column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,

    /// Base type name without any parenthesised length/precision suffix.
    #[serde(rename = "type")]
    pub data_type: String,

    /// Character length when the type has one, else numeric precision.
    pub length: Option<i64>,

    /// Whether NULL is allowed.
    pub nullable: bool,

    /// Default expression as the catalog reports it.
    pub default: Option<String>,

    /// Column comment, empty when none.
    pub comment: String,

    /// Engine-specific extras (e.g. `auto_increment`).
    pub extra: String,
}

/// Primary key column names in key order. Empty when the table declares none.
pub type PrimaryKeySet = Vec<String>;

/// One column pair of a foreign key.
///
/// Composite keys produce one descriptor per column; `constraint_name` is the
/// only thing tying them together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Referencing column in this table.
    pub column: String,

    /// Referenced table.
    pub referenced_table: String,

    /// Referenced column.
    pub referenced_column: String,

    /// Name of the constraint this pair belongs to.
    pub constraint_name: String,
}

/// Everything introspection knows about one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name and comment.
    pub table: TableDescriptor,

    /// Columns in ordinal order.
    pub columns: Vec<ColumnDescriptor>,

    /// Primary key column names.
    pub primary_key: PrimaryKeySet,

    /// Foreign key column pairs.
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableSchema {
    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Find a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Foreign key pairs grouped by constraint, in first-seen order.
    pub fn foreign_key_groups(&self) -> Vec<(&str, Vec<&ForeignKeyDescriptor>)> {
        let mut groups: Vec<(&str, Vec<&ForeignKeyDescriptor>)> = Vec::new();
        for fk in &self.foreign_keys {
            match groups
                .iter_mut()
                .find(|(name, _)| *name == fk.constraint_name)
            {
                Some((_, members)) => members.push(fk),
                None => groups.push((fk.constraint_name.as_str(), vec![fk])),
            }
        }
        groups
    }
}

/// Strip a parenthesised suffix from a declared type: `varchar(50)` -> `varchar`.
pub fn base_type_name(declared: &str) -> String {
    declared
        .split('(')
        .next()
        .unwrap_or(declared)
        .trim()
        .to_string()
}

/// First number inside a parenthesised type suffix: `numeric(10,2)` -> 10.
pub fn declared_length(declared: &str) -> Option<i64> {
    let open = declared.find('(')?;
    let rest = &declared[open + 1..];
    let end = rest.find(|c: char| c == ',' || c == ')')?;
    rest[..end].trim().parse().ok()
}
