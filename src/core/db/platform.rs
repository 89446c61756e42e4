/// Platform Module
///
/// Per-engine capability and schema-metadata facade. The driver and result
/// layers never depend on it; it exists for higher layers.

use crate::core::Result;

/// Features a platform may or may not offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFeature {
    /// `EXPLAIN` style query plans
    QueryExplain,
}

/// Represents a database table as listed by a platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub is_view: bool,
}

/// Represents a database column with its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Declared type name (e.g., "INTEGER", "TEXT")
    pub type_name: String,
    /// Whether the column allows NULL values
    pub nullable: bool,
    /// Whether this column is part of the primary key
    pub primary_key: bool,
    /// Default value expression (if any)
    pub default: Option<String>,
}

/// Represents a foreign key relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyInfo {
    /// The column in this table that is the foreign key
    pub column: String,
    /// The table this foreign key references
    pub referenced_table: String,
    /// The referenced column in the foreign table
    pub referenced_column: String,
}

/// Capability and metadata queries for one engine.
///
/// Implementations that cannot answer an introspection query reject it with
/// `DbalError::NotSupported`.
pub trait Platform {
    /// Engine name, e.g. `sqlite`.
    fn name(&self) -> &'static str;

    fn is_supported(&self, feature: PlatformFeature) -> bool;

    fn tables(&self) -> Result<Vec<TableInfo>>;

    fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>>;

    /// Name of the sequence backing the table's primary key, if the engine
    /// has named sequences.
    fn primary_sequence_name(&self, table: &str) -> Result<Option<String>>;
}
