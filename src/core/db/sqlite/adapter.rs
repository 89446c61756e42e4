/// SQLite Result Adapter
///
/// Owns the prepared statement together with its running `Rows` cursor and
/// steps it once per fetch. The statement is reset and finalized when the
/// adapter is dropped. Rewinding resets the statement and executes it again,
/// like `sqlite3_reset`.

use crate::core::db::adapter::{ColumnKind, ColumnType, ResultAdapter};
use crate::core::db::row::{RawRow, Value};
use crate::core::db::sqlite::driver::native_error;
use crate::core::{DbalError, Result};
use indexmap::IndexMap;
use ouroboros::self_referencing;
use rusqlite::types::ValueRef;
use rusqlite::{Rows, Statement};
use std::fmt;
use std::sync::Arc;

#[self_referencing]
struct OpenStatement<'conn> {
    statement: Statement<'conn>,
    #[borrows(mut statement)]
    #[not_covariant]
    rows: Rows<'this>,
}

impl<'conn> OpenStatement<'conn> {
    fn execute(statement: Statement<'conn>) -> rusqlite::Result<Self> {
        OpenStatement::try_new(statement, |statement| statement.query([]))
    }

    /// Steps the statement and copies out the row it lands on.
    fn step(&mut self, width: usize) -> rusqlite::Result<Option<Vec<Value>>> {
        self.with_rows_mut(|rows| match rows.next()? {
            Some(row) => (0..width)
                .map(|i| row.get_ref(i).map(from_value_ref))
                .collect::<rusqlite::Result<Vec<Value>>>()
                .map(Some),
            None => Ok(None),
        })
    }
}

pub struct SqliteResultAdapter<'conn> {
    sql: String,
    columns: Arc<[String]>,
    types: IndexMap<String, ColumnType>,
    open: Option<OpenStatement<'conn>>,
    /// First row, stepped while executing and not handed out yet
    pending: Option<Vec<Value>>,
    fetched: usize,
}

impl<'conn> SqliteResultAdapter<'conn> {
    /// Executes `statement` up to its first row.
    ///
    /// Statements without a result set run to completion here. Reading a
    /// SELECT stops after one row; the rest is stepped on demand.
    pub fn execute(statement: Statement<'conn>, sql: &str) -> rusqlite::Result<Self> {
        let columns: Arc<[String]> = statement.column_names().into_iter().map(String::from).collect();
        let declared: Vec<Option<String>> = statement
            .columns()
            .iter()
            .map(|c| c.decl_type().map(str::to_string))
            .collect();

        let mut open = OpenStatement::execute(statement)?;
        let pending = open.step(columns.len())?;

        let types = columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let declared = declared.get(i).and_then(|d| d.as_deref());
                let sample = pending.as_ref().and_then(|row| row.get(i));
                (name.clone(), column_type(declared, sample))
            })
            .collect();

        Ok(SqliteResultAdapter {
            sql: sql.to_string(),
            columns,
            types,
            open: Some(open),
            pending,
            fetched: 0,
        })
    }

    fn error(&self, err: &rusqlite::Error) -> DbalError {
        native_error(err, Some(&self.sql))
    }
}

impl ResultAdapter for SqliteResultAdapter<'_> {
    fn fetch(&mut self) -> Result<Option<RawRow>> {
        let values = match self.pending.take() {
            Some(values) => Some(values),
            None => match self.open.as_mut() {
                Some(open) => match open.step(self.columns.len()) {
                    Ok(values) => values,
                    Err(e) => return Err(self.error(&e)),
                },
                None => None,
            },
        };
        let Some(values) = values else {
            return Ok(None);
        };
        self.fetched += 1;
        Ok(Some(RawRow {
            columns: Arc::clone(&self.columns),
            values,
        }))
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        if index != 0 {
            return Err(DbalError::NotSupported(
                "Only seeking at the beginning is supported.".to_string(),
            ));
        }
        if self.fetched == 0 {
            return Ok(());
        }
        let Some(open) = self.open.take() else {
            return Ok(());
        };

        // dropping the cursor resets the statement
        let statement = open.into_heads().statement;
        let mut reopened = OpenStatement::execute(statement).map_err(|e| self.error(&e))?;
        self.pending = reopened.step(self.columns.len()).map_err(|e| self.error(&e))?;
        self.open = Some(reopened);
        self.fetched = 0;
        Ok(())
    }

    fn types(&self) -> IndexMap<String, ColumnType> {
        self.types.clone()
    }

    fn rows_count(&self) -> Result<usize> {
        Err(DbalError::NotSupported(
            "SQLite cannot count result rows without reading them.".to_string(),
        ))
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl fmt::Debug for SqliteResultAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteResultAdapter")
            .field("sql", &self.sql)
            .field("columns", &self.columns)
            .field("fetched", &self.fetched)
            .field("open", &self.open.is_some())
            .finish()
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => match String::from_utf8(t.to_vec()) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

/// Bucket for a column: by declared type when there is one, otherwise by
/// the storage class of the first value.
fn column_type(declared: Option<&str>, sample: Option<&Value>) -> ColumnType {
    if let Some(declared) = declared.filter(|d| !d.trim().is_empty()) {
        return ColumnType::new(declared_kind(declared), declared);
    }
    match sample {
        Some(Value::Int(_)) => ColumnType::new(ColumnKind::Int, "INTEGER"),
        Some(Value::Float(_)) => ColumnType::new(ColumnKind::Float, "REAL"),
        Some(Value::String(_)) => ColumnType::new(ColumnKind::String, "TEXT"),
        Some(Value::Bytes(_)) => ColumnType::new(ColumnKind::AsIs, "BLOB"),
        _ => ColumnType::new(ColumnKind::AsIs, "NULL"),
    }
}

/// SQLite affinity rules, extended with the BOOL, DATE/TIME and JSON
/// naming conventions.
fn declared_kind(declared: &str) -> ColumnKind {
    let upper = declared.to_ascii_uppercase();
    let has = |needles: &[&str]| needles.iter().any(|n| upper.contains(n));

    if has(&["BOOL"]) {
        ColumnKind::Bool
    } else if has(&["DATE", "TIME"]) {
        ColumnKind::DateTime
    } else if has(&["JSON"]) {
        ColumnKind::DriverSpecific
    } else if has(&["INT"]) {
        ColumnKind::Int
    } else if has(&["CHAR", "CLOB", "TEXT"]) {
        ColumnKind::String
    } else if has(&["REAL", "FLOA", "DOUB"]) {
        ColumnKind::Float
    } else {
        ColumnKind::AsIs
    }
}
