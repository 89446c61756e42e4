/// Row and Value Module
///
/// Normalized values and the immutable rows handed out by `QueryResult`.

use chrono::{DateTime, FixedOffset};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::sync::Arc;

/// A single column value, either as the native client returned it or after
/// normalization.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// An absolute instant, expressed in the application timezone
    DateTime(DateTime<FixedOffset>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Converts the value into a key usable in `fetch_pairs` maps.
    ///
    /// Date-times use their canonical RFC 3339 text.
    pub fn to_pair_key(&self) -> PairKey {
        match self {
            Value::Null => PairKey::Null,
            Value::Bool(b) => PairKey::Bool(*b),
            Value::Int(i) => PairKey::Int(*i),
            Value::Float(f) => PairKey::Text(f.to_string()),
            Value::String(s) => PairKey::Text(s.clone()),
            Value::Bytes(b) => PairKey::Bytes(b.clone()),
            Value::DateTime(dt) => PairKey::Text(dt.to_rfc3339()),
            Value::Json(j) => PairKey::Text(j.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<BLOB: {} bytes>", b.len()),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Json(j) => write!(f, "{}", j),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

/// Hashable key derived from a `Value`, used by `fetch_pairs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PairKey {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<&str> for PairKey {
    fn from(v: &str) -> Self {
        PairKey::Text(v.to_string())
    }
}

impl From<i64> for PairKey {
    fn from(v: i64) -> Self {
        PairKey::Int(v)
    }
}

/// A raw row as produced by a `ResultAdapter`: native values in column order.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub columns: Arc<[String]>,
    pub values: Vec<Value>,
}

/// An immutable record of normalized values, addressable by position and by
/// column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Row { columns, values }
    }

    /// Value of the named column, `None` if the row has no such column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Value at the given position.
    pub fn get_nth(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_row() -> Row {
        let columns: Arc<[String]> = vec!["id".to_string(), "name".to_string()].into();
        Row::new(columns, vec![Value::Int(1), Value::from("alice")])
    }

    #[test]
    fn test_row_access_by_name_and_position() {
        let row = sample_row();
        assert_eq!(row.get("id"), Some(&Value::Int(1)));
        assert_eq!(row.get("name").and_then(Value::as_str), Some("alice"));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_nth(1), Some(&Value::from("alice")));
        assert_eq!(row.get_nth(2), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_row_serializes_as_object() {
        let row = sample_row();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"alice"}"#);
    }

    #[test]
    fn test_datetime_pair_key_is_canonical_text() {
        let dt = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2015, 1, 1, 12, 0, 0)
            .unwrap();
        assert_eq!(
            Value::DateTime(dt).to_pair_key(),
            PairKey::Text("2015-01-01T12:00:00+01:00".to_string())
        );
        assert_eq!(Value::Int(3).to_pair_key(), PairKey::Int(3));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Bytes(vec![1, 2, 3]).to_string(), "<BLOB: 3 bytes>");
    }
}
