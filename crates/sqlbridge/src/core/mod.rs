//! Core abstractions for the connection layer.
//!
//! - [`schema`]: table, column and key descriptors returned by introspection
//! - [`value`]: SQL values and result rows
//! - [`params`]: named placeholders and their positional rewrite
//! - [`traits`]: the [`Dialect`] and [`RawConnection`] seams
//!
//! Driver modules (`drivers/mysql`, `drivers/postgres`, `drivers/sqlite`)
//! implement the traits; nothing here knows about a specific engine.

pub mod params;
pub mod schema;
pub mod traits;
pub mod value;

pub use params::{compile, CompiledStatement, Params, PlaceholderStyle, StringEscapes};
pub use schema::{ColumnDescriptor, ForeignKeyDescriptor, PrimaryKeySet, TableDescriptor, TableSchema};
pub use traits::{Dialect, RawConnection, Statement};
pub use value::{Row, SqlValue};
