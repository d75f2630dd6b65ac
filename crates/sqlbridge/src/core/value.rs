//! SQL value and row types shared by every driver.
//!
//! Drivers decode engine-native results into [`SqlValue`]s and group them into
//! [`Row`]s; bound parameters travel the other way in the same representation.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A single SQL value, owned.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer column, widened to 64 bits.
    I64(i64),

    /// Any floating point column, widened to 64 bits.
    F64(f64),

    /// Exact numeric (decimal/numeric).
    Decimal(Decimal),

    /// Text data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Date without time.
    Date(NaiveDate),

    /// Time without date.
    Time(NaiveTime),

    /// Timestamp without timezone (timezone-aware values are normalised to UTC).
    DateTime(NaiveDateTime),

    /// UUID value.
    Uuid(Uuid),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Borrow the value as text.
    ///
    /// Byte strings that are valid UTF-8 are accepted too: MySQL reports some
    /// `information_schema` columns as VARBINARY depending on collation.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            SqlValue::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Read the value as an integer, parsing text and truncating exact numerics.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::I64(v) => Some(*v),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            SqlValue::Decimal(d) => d.trunc().to_string().parse().ok(),
            SqlValue::F64(f) if f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Text(_) | SqlValue::Bytes(_) => self.as_str()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the value as text for display (NULL renders as `None`).
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::I64(v) => Some(v.to_string()),
            SqlValue::F64(v) => Some(v.to_string()),
            SqlValue::Decimal(v) => Some(v.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            SqlValue::Date(v) => Some(v.to_string()),
            SqlValue::Time(v) => Some(v.to_string()),
            SqlValue::DateTime(v) => Some(v.to_string()),
            SqlValue::Uuid(v) => Some(v.to_string()),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I64(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::I64(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One result row: an ordered mapping from column name to value.
///
/// Inserting a column name that already exists replaces the earlier value in
/// place, so an unaliased join column resolves to the last one the engine sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create an empty row with room for `capacity` columns.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Insert a value; last write wins on duplicate names.
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        let column = column.into();
        match self.columns.iter().position(|c| *c == column) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    /// Builder form of [`Row::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// Look up a value by column name. Names are matched exactly first, then
    /// case-insensitively (MySQL returns catalog columns upper-cased).
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
            })
            .map(|idx| &self.values[idx])
    }

    /// Text value of a column, `None` when missing or NULL.
    pub fn get_text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(SqlValue::to_text)
    }

    /// Integer value of a column, `None` when missing, NULL or non-numeric.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(SqlValue::as_i64)
    }

    /// Value of the first column.
    pub fn first(&self) -> Option<&SqlValue> {
        self.values.first()
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in result order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Consume the row, keeping only its first value.
    pub fn into_first(self) -> Option<SqlValue> {
        self.values.into_iter().next()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_last_write_wins_keeps_position() {
        let mut row = Row::default();
        row.insert("id", SqlValue::I64(1));
        row.insert("name", SqlValue::Text("a".into()));
        row.insert("id", SqlValue::I64(2));

        assert_eq!(row.len(), 2);
        assert_eq!(row.columns(), &["id".to_string(), "name".to_string()]);
        assert_eq!(row.get("id"), Some(&SqlValue::I64(2)));
        assert_eq!(row.first(), Some(&SqlValue::I64(2)));
    }

    #[test]
    fn test_row_get_is_case_insensitive_fallback() {
        let row = Row::default().with("COLUMN_NAME", "id");
        assert_eq!(row.get_text("column_name").as_deref(), Some("id"));
    }

    #[test]
    fn test_as_i64_conversions() {
        assert_eq!(SqlValue::Text(" 42 ".into()).as_i64(), Some(42));
        assert_eq!(SqlValue::Decimal(Decimal::new(1050, 2)).as_i64(), Some(10));
        assert_eq!(SqlValue::Bytes(b"7".to_vec()).as_i64(), Some(7));
        assert_eq!(SqlValue::Null.as_i64(), None);
        assert_eq!(SqlValue::Text("abc".into()).as_i64(), None);
    }

    #[test]
    fn test_as_str_accepts_utf8_bytes() {
        assert_eq!(SqlValue::Bytes(b"users".to_vec()).as_str(), Some("users"));
        assert_eq!(SqlValue::Bytes(vec![0xff, 0xfe]).as_str(), None);
        assert_eq!(SqlValue::I64(1).as_str(), None);
    }

    #[test]
    fn test_option_into_value() {
        let none: Option<i64> = None;
        assert!(SqlValue::from(none).is_null());
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }
}
