/// Query Result Module
///
/// `QueryResult` is the engine-agnostic cursor over a `ResultAdapter`. Each
/// fetched row is normalized column by column according to a bucket map
/// built once from the adapter's type report.

use crate::core::db::adapter::{ColumnKind, ResultAdapter};
use crate::core::db::driver::Driver;
use crate::core::db::row::{PairKey, Row, Value};
use crate::core::db::timezone::{from_unix_timestamp, parse_datetime, TimeZoneSpec};
use crate::core::{DbalError, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Order in which the normalization passes run.
const PASS_ORDER: [ColumnKind; 6] = [
    ColumnKind::DriverSpecific,
    ColumnKind::Int,
    ColumnKind::Float,
    ColumnKind::Bool,
    ColumnKind::String,
    ColumnKind::DateTime,
];

/// Bucket assignment of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnCast {
    kind: ColumnKind,
    native: Option<String>,
}

/// The shapes `fetch_pairs` can return.
#[derive(Debug, Clone, PartialEq)]
pub enum Pairs {
    /// Only a value column was given
    Values(Vec<Value>),
    /// Only a key column was given: key → whole row
    Rows(IndexMap<PairKey, Row>),
    /// Key and value columns were given
    Map(IndexMap<PairKey, Value>),
}

/// Normalizing cursor over one result set.
pub struct QueryResult<'d> {
    adapter: Box<dyn ResultAdapter + 'd>,
    driver: &'d dyn Driver,
    /// `None` before the first fetch
    position: Option<usize>,
    current: Option<Row>,
    /// Each column sits in at most one bucket
    casts: HashMap<String, ColumnCast>,
    application_timezone: TimeZoneSpec,
}

impl<'d> QueryResult<'d> {
    pub fn new(adapter: Box<dyn ResultAdapter + 'd>, driver: &'d dyn Driver) -> Self {
        let mut result = QueryResult {
            adapter,
            driver,
            position: None,
            current: None,
            casts: HashMap::new(),
            application_timezone: TimeZoneSpec::Local,
        };
        result.init_column_conversions();
        result
    }

    pub fn adapter(&self) -> &dyn ResultAdapter {
        self.adapter.as_ref()
    }

    pub fn columns(&self) -> &[String] {
        self.adapter.columns()
    }

    /// Timezone fetched date-times are expressed in. Defaults to local time.
    pub fn set_application_timezone(&mut self, zone: TimeZoneSpec) {
        self.application_timezone = zone;
    }

    /// Enables or disables value normalization.
    ///
    /// Enabling restores the buckets reported by the adapter, dropping any
    /// overrides; disabling passes every value through untouched.
    pub fn set_value_normalization(&mut self, enabled: bool) {
        if enabled {
            self.init_column_conversions();
        } else {
            self.casts.clear();
        }
    }

    /// Moves one column into another bucket, leaving every other column as is.
    pub fn set_value_normalization_type(&mut self, column: &str, kind: ColumnKind, native_type: Option<&str>) {
        self.casts.insert(
            column.to_string(),
            ColumnCast {
                kind,
                native: native_type.map(str::to_string),
            },
        );
    }

    fn init_column_conversions(&mut self) {
        self.casts = self
            .adapter
            .types()
            .into_iter()
            .map(|(column, column_type)| {
                (
                    column,
                    ColumnCast {
                        kind: column_type.kind,
                        native: Some(column_type.native),
                    },
                )
            })
            .collect();
    }

    /// Fetches and normalizes the next row, `None` at the end of the result.
    ///
    /// A row that fails to normalize still counts as fetched: the cursor
    /// moves past it and `current()` is left empty.
    pub fn fetch(&mut self) -> Result<Option<Row>> {
        let raw = self.adapter.fetch()?;
        self.position = Some(self.position.map_or(0, |p| p + 1));
        self.current = None;

        let row = match raw {
            Some(raw) => {
                let values = self.normalize(&raw.columns, raw.values)?;
                Some(Row::new(raw.columns, values))
            }
            None => None,
        };
        self.current = row.clone();
        Ok(row)
    }

    /// Fetches the next row and returns its value at `column`.
    pub fn fetch_field(&mut self, column: usize) -> Result<Option<Value>> {
        Ok(self.fetch()?.and_then(|row| row.get_nth(column).cloned()))
    }

    /// Collects every remaining row. Not meant for unbounded results.
    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Re-reads the whole result into a list or an ordered map.
    ///
    /// Duplicate keys keep their first position and the last row's value.
    pub fn fetch_pairs(&mut self, key: Option<&str>, value: Option<&str>) -> Result<Pairs> {
        if key.is_none() && value.is_none() {
            return Err(DbalError::InvalidArgument(
                "fetch_pairs() requires defined key or value.".to_string(),
            ));
        }

        self.seek(0)?;

        match (key, value) {
            (None, Some(value)) => {
                let mut values = Vec::new();
                while let Some(row) = self.fetch()? {
                    values.push(column_value(&row, value)?.clone());
                }
                Ok(Pairs::Values(values))
            }
            (Some(key), None) => {
                let mut rows = IndexMap::new();
                while let Some(row) = self.fetch()? {
                    let k = column_value(&row, key)?.to_pair_key();
                    rows.insert(k, row);
                }
                Ok(Pairs::Rows(rows))
            }
            (Some(key), Some(value)) => {
                let mut map = IndexMap::new();
                while let Some(row) = self.fetch()? {
                    let k = column_value(&row, key)?.to_pair_key();
                    map.insert(k, column_value(&row, value)?.clone());
                }
                Ok(Pairs::Map(map))
            }
            (None, None) => unreachable!("checked above"),
        }
    }

    /// Position of the current row, `None` before the first fetch.
    pub fn key(&self) -> Option<usize> {
        self.position
    }

    /// The most recently fetched row.
    pub fn current(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// Advances to the next row.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        self.fetch()
    }

    /// Returns to the first row and fetches it.
    pub fn rewind(&mut self) -> Result<Option<Row>> {
        self.seek(0)?;
        self.fetch()
    }

    /// Repositions the cursor so the next fetch returns row `index`.
    pub fn seek(&mut self, index: usize) -> Result<()> {
        self.adapter.seek(index)?;
        self.position = index.checked_sub(1);
        self.current = None;
        Ok(())
    }

    /// Total number of rows, if the adapter can tell.
    ///
    /// Not named `count`: `QueryResult` is an `Iterator`, and `Iterator::count`
    /// would win method resolution and consume the cursor.
    pub fn rows_count(&self) -> Result<usize> {
        self.adapter.rows_count()
    }

    fn normalize(&self, columns: &[String], mut values: Vec<Value>) -> Result<Vec<Value>> {
        if self.casts.is_empty() {
            return Ok(values);
        }

        for pass in PASS_ORDER {
            for (index, column) in columns.iter().enumerate() {
                let cast = match self.casts.get(column) {
                    Some(cast) if cast.kind == pass => cast,
                    _ => continue,
                };
                let Some(slot) = values.get_mut(index) else { continue };
                if slot.is_null() {
                    continue;
                }
                let raw = std::mem::replace(slot, Value::Null);
                *slot = match pass {
                    ColumnKind::DriverSpecific => self.driver.convert_to_native(raw, cast.native.as_deref())?,
                    ColumnKind::Int => to_int(raw),
                    ColumnKind::Float => to_float(raw),
                    ColumnKind::Bool => to_bool(raw),
                    ColumnKind::String => to_string(raw),
                    ColumnKind::DateTime => self.to_datetime(raw),
                    ColumnKind::AsIs => raw,
                };
            }
        }

        Ok(values)
    }

    fn to_datetime(&self, value: Value) -> Value {
        let connection_zone = self.driver.connection_timezone();
        let parsed = match &value {
            Value::String(s) => parse_datetime(s, &connection_zone),
            Value::Int(i) => from_unix_timestamp(*i as f64),
            Value::Float(f) => from_unix_timestamp(*f),
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        };
        match parsed {
            Some(instant) => Value::DateTime(self.application_timezone.convert(&instant)),
            None => passthrough("datetime", value),
        }
    }
}

impl Iterator for QueryResult<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch().transpose()
    }
}

impl fmt::Debug for QueryResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("columns", &self.adapter.columns())
            .field("position", &self.position)
            .field("current", &self.current)
            .finish()
    }
}

fn column_value<'r>(row: &'r Row, column: &str) -> Result<&'r Value> {
    row.get(column)
        .ok_or_else(|| DbalError::InvalidArgument(format!("Column '{}' is not part of the result", column)))
}

fn passthrough(target: &str, value: Value) -> Value {
    trace!(?value, target, "value left unnormalized");
    value
}

fn to_int(value: Value) -> Value {
    match value {
        Value::Int(_) => value,
        Value::Float(f) if f.is_finite() => Value::Int(f.trunc() as i64),
        Value::Bool(b) => Value::Int(i64::from(b)),
        Value::String(s) => match parse_number(&s) {
            Some(Number::Int(i)) => Value::Int(i),
            Some(Number::Float(f)) => Value::Int(f.trunc() as i64),
            None => passthrough("int", Value::String(s)),
        },
        Value::DateTime(dt) => Value::Int(dt.timestamp()),
        other => passthrough("int", other),
    }
}

fn to_float(value: Value) -> Value {
    match value {
        Value::Float(_) => value,
        Value::Int(i) => Value::Float(i as f64),
        Value::Bool(b) => Value::Float(if b { 1.0 } else { 0.0 }),
        Value::String(s) => match parse_number(&s) {
            Some(Number::Int(i)) => Value::Float(i as f64),
            Some(Number::Float(f)) => Value::Float(f),
            None => passthrough("float", Value::String(s)),
        },
        other => passthrough("float", other),
    }
}

fn to_bool(value: Value) -> Value {
    match value {
        Value::Bool(_) => value,
        Value::Int(i) => Value::Bool(i != 0),
        Value::Float(f) => Value::Bool(f != 0.0),
        Value::String(s) => Value::Bool(!(s.is_empty() || s == "0")),
        Value::Bytes(b) => Value::Bool(!(b.is_empty() || b == b"0")),
        other => passthrough("bool", other),
    }
}

fn to_string(value: Value) -> Value {
    match value {
        Value::String(_) => value,
        Value::Int(i) => Value::String(i.to_string()),
        Value::Float(f) => Value::String(f.to_string()),
        Value::Bool(b) => Value::String(if b { "1" } else { "0" }.to_string()),
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(e) => passthrough("string", Value::Bytes(e.into_bytes())),
        },
        Value::DateTime(dt) => Value::String(dt.to_rfc3339()),
        Value::Json(j) => Value::String(j.to_string()),
        Value::Null => Value::Null,
    }
}

enum Number {
    Int(i64),
    Float(f64),
}

fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::Int(i));
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Number::Float)
}
