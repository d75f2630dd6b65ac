//! Named placeholder binding.
//!
//! All query text uses `:name` placeholders with a string-keyed [`Params`] map.
//! [`compile`] rewrites the text into the positional form the driver expects and
//! orders the values to match.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::value::SqlValue;
use crate::error::{DbError, Result};

/// Positional placeholder style of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` per occurrence (MySQL, SQLite). A name used twice binds twice.
    QuestionMark,
    /// `$1`, `$2`, ... per distinct name (PostgreSQL).
    Numbered,
}

/// How a single-quoted literal escapes characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEscapes {
    /// Only a doubled quote escapes (SQL standard, PostgreSQL, SQLite).
    Standard,
    /// A backslash also escapes the next character (MySQL).
    Backslash,
}

/// Named parameter values for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: HashMap<String, SqlValue>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value. The name is given without the leading colon.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind a value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        let name = name.into();
        let name = name.strip_prefix(':').map(str::to_string).unwrap_or(name);
        self.values.insert(name, value.into());
    }

    /// Look up a bound value.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.values.get(name)
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// A statement rewritten for a positional driver.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    /// SQL with positional placeholders.
    pub sql: String,
    /// Values in placeholder order.
    pub values: Vec<SqlValue>,
}

/// Rewrite `:name` placeholders into `style`.
///
/// Text inside single-quoted literals, double-quoted or backtick identifiers and
/// comments is copied untouched, and `::` (PostgreSQL cast) is never a placeholder.
/// `escapes` decides whether a backslash inside a single-quoted literal escapes.
pub fn compile(
    sql: &str,
    params: &Params,
    style: PlaceholderStyle,
    escapes: StringEscapes,
) -> Result<CompiledStatement> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut numbered: HashMap<String, usize> = HashMap::new();
    let mut used: HashSet<String> = HashSet::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                let end = skip_quoted(&chars, i, c, escapes);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| i + p);
                out.extend(&chars[i..end]);
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = find_block_comment_end(&chars, i + 2);
                out.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|ch| is_ident_start(*ch)) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                let value = params
                    .get(&name)
                    .ok_or_else(|| DbError::MissingParameter(name.clone()))?;

                match style {
                    PlaceholderStyle::QuestionMark => {
                        out.push('?');
                        values.push(value.clone());
                    }
                    PlaceholderStyle::Numbered => {
                        let next = numbered.len() + 1;
                        let idx = *numbered.entry(name.clone()).or_insert_with(|| {
                            values.push(value.clone());
                            next
                        });
                        out.push('$');
                        out.push_str(&idx.to_string());
                    }
                }
                used.insert(name);
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    for name in params.values.keys().filter(|n| !used.contains(*n)) {
        warn!("Parameter ':{}' is bound but not used by the statement", name);
    }

    Ok(CompiledStatement { sql: out, values })
}

/// Index just past the closing quote. A doubled quote character is an escape.
fn skip_quoted(chars: &[char], start: usize, quote: char, escapes: StringEscapes) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        if chars[i] == '\\' && quote == '\'' && escapes == StringEscapes::Backslash {
            i += 2;
            continue;
        }
        i += 1;
    }
    chars.len()
}

fn find_block_comment_end(chars: &[char], from: usize) -> usize {
    let mut i = from;
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
