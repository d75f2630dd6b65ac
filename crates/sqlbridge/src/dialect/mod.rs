//! Dialect-neutral intent types.
//!
//! Callers describe *what* they want (a date part, an XML value, a page of
//! rows); each [`Dialect`](crate::core::Dialect) turns that into engine SQL.

use std::fmt;
use std::str::FromStr;

use crate::error::DbError;

/// A date-format token understood by every dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateToken {
    /// Year and month, e.g. `202410`.
    YearMonth,
    /// Four-digit year.
    Year,
    /// Two-digit month.
    Month,
    /// Day of month.
    Day,
}

impl DateToken {
    /// All tokens, in declaration order.
    pub const ALL: [DateToken; 4] = [
        DateToken::YearMonth,
        DateToken::Year,
        DateToken::Month,
        DateToken::Day,
    ];

    /// The token's short name (`Ym`, `Y`, `m`, `d`).
    pub fn as_str(&self) -> &'static str {
        match self {
            DateToken::YearMonth => "Ym",
            DateToken::Year => "Y",
            DateToken::Month => "m",
            DateToken::Day => "d",
        }
    }
}

impl FromStr for DateToken {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ym" => Ok(DateToken::YearMonth),
            "Y" => Ok(DateToken::Year),
            "m" => Ok(DateToken::Month),
            "d" => Ok(DateToken::Day),
            other => Err(DbError::UnsupportedDateToken(other.to_string())),
        }
    }
}

impl fmt::Display for DateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How XML is stored in the column being extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlDataFormat {
    /// Base64 text of ISO-8859-1 encoded XML.
    #[default]
    Base64Latin1,
    /// ISO-8859-1 encoded bytes.
    Latin1,
    /// Base64 text of UTF-8 XML.
    Base64,
    /// Plain text, cast directly.
    Text,
    /// Already an XML value; used as is.
    Xml,
}

impl XmlDataFormat {
    /// Parse the short names used in configuration: `base64_ISO8859-1`,
    /// `ISO8859-1`, `base64`, `xml`. Anything else means a direct cast.
    pub fn from_name(name: &str) -> Self {
        match name {
            "base64_ISO8859-1" => XmlDataFormat::Base64Latin1,
            "ISO8859-1" => XmlDataFormat::Latin1,
            "base64" => XmlDataFormat::Base64,
            "xml" => XmlDataFormat::Xml,
            _ => XmlDataFormat::Text,
        }
    }
}

/// Options for XML extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    /// Default element namespace URI, registered under the `n` alias.
    pub namespace: Option<String>,
    /// Strip the `{`, `}` and `"` wrapping of the array-as-text result.
    pub trim: bool,
    /// Storage format of the column.
    pub data_format: XmlDataFormat,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            trim: true,
            data_format: XmlDataFormat::default(),
        }
    }
}

impl XmlOptions {
    /// Set the default element namespace.
    pub fn namespace(mut self, uri: impl Into<String>) -> Self {
        self.namespace = Some(uri.into());
        self
    }

    /// Enable or disable trimming.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    /// Set the storage format.
    pub fn data_format(mut self, format: XmlDataFormat) -> Self {
        self.data_format = format;
        self
    }
}

/// SQL fragments produced by XML extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlFragments {
    /// Exactly one path was requested.
    Single(String),
    /// One fragment per requested path, by the caller's path index.
    Many(Vec<String>),
}

impl XmlFragments {
    /// Fragment for the path at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            XmlFragments::Single(s) if index == 0 => Some(s),
            XmlFragments::Single(_) => None,
            XmlFragments::Many(v) => v.get(index).map(String::as_str),
        }
    }

    /// All fragments in path order.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            XmlFragments::Single(s) => vec![s],
            XmlFragments::Many(v) => v,
        }
    }
}
