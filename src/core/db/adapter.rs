/// Result Adapter Module
///
/// A `ResultAdapter` is the thin, engine-specific cursor over one raw result
/// set. `QueryResult` builds the portable normalization on top of it.

use crate::core::db::row::RawRow;
use crate::core::Result;
use indexmap::IndexMap;

/// Normalization bucket of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    String,
    Int,
    Float,
    Bool,
    DateTime,
    /// Converted by the driver, using the native type tag
    DriverSpecific,
    /// Passed through untouched
    AsIs,
}

/// The portable bucket of a column together with its native type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    pub kind: ColumnKind,
    pub native: String,
}

impl ColumnType {
    pub fn new(kind: ColumnKind, native: impl Into<String>) -> Self {
        ColumnType {
            kind,
            native: native.into(),
        }
    }
}

/// Cursor over one native result set.
pub trait ResultAdapter {
    /// Returns the next raw row, or `None` once the result is exhausted.
    fn fetch(&mut self) -> Result<Option<RawRow>>;

    /// Repositions the cursor. Forward-only engines accept only `0`.
    fn seek(&mut self, index: usize) -> Result<()>;

    /// Bucket and native type per column, in column order.
    fn types(&self) -> IndexMap<String, ColumnType>;

    /// Total number of rows, when the engine can tell without consuming the cursor.
    fn rows_count(&self) -> Result<usize>;

    /// Column names in order.
    fn columns(&self) -> &[String];
}
