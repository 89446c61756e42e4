/// # Test Utilities Module
///
/// Shared fixtures for the unit and integration tests:
/// - Isolated in-memory driver fixtures, optionally with sample data
/// - A query observer that records every event
/// - An in-memory `ResultAdapter` for driving `QueryResult` directly
/// - Error assertion macros

use crate::config::ConnectionConfig;
use crate::core::db::adapter::{ColumnType, ResultAdapter};
use crate::core::db::driver::{silent_observer, Driver, QueryEvent, QueryObserver};
use crate::core::db::row::{RawRow, Value};
use crate::core::db::sqlite::SqliteDriver;
use crate::core::{DbalError, Result};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Isolated database test fixture
///
/// Every fixture owns its own `:memory:` database whose connection runs in UTC.
#[derive(Debug)]
pub struct DriverFixture {
    pub driver: SqliteDriver,
}

impl DriverFixture {
    pub fn new() -> Result<Self> {
        Self::with_observer(silent_observer())
    }

    pub fn with_observer(observer: QueryObserver) -> Result<Self> {
        let config = ConnectionConfig::sqlite(":memory:").with_timezone("UTC");
        Ok(DriverFixture {
            driver: SqliteDriver::connect(&config, observer)?,
        })
    }

    /// Create fixture with sample data schema
    pub fn with_sample_data() -> Result<Self> {
        let fixture = Self::new()?;
        fixture.setup_standard_schema()?;
        fixture.populate_sample_data()?;
        Ok(fixture)
    }

    /// Set up standard test schema
    pub fn setup_standard_schema(&self) -> Result<()> {
        for sql in [
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email VARCHAR(255) UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            "CREATE TABLE orders (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users (id),
                amount REAL,
                paid BOOLEAN DEFAULT 0,
                meta JSON
            )",
        ] {
            self.driver.query(sql)?;
        }
        Ok(())
    }

    /// Populate with realistic sample data
    pub fn populate_sample_data(&self) -> Result<()> {
        for sql in [
            "INSERT INTO users (id, name, email, created_at) VALUES
                (1, 'alice', 'alice@example.com', '2020-01-01 10:00:00'),
                (2, 'bob', 'bob@example.com', '2020-06-15 08:30:00'),
                (3, 'charlie', NULL, NULL)",
            "INSERT INTO orders (id, user_id, amount, paid, meta) VALUES
                (1, 1, 9.5, 1, '{\"coupon\": \"X1\"}'),
                (2, 1, 20, 0, NULL),
                (3, 2, 3.25, 1, '[]')",
        ] {
            self.driver.query(sql)?;
        }
        Ok(())
    }
}

/// One observed statement, detached from the driver's borrows.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub sql: String,
    pub elapsed: Duration,
    pub columns: Vec<String>,
    pub error: Option<String>,
}

impl RecordedEvent {
    fn from_event(event: &QueryEvent<'_>) -> Self {
        RecordedEvent {
            sql: event.sql.to_string(),
            elapsed: event.elapsed,
            columns: event.result.map(|r| r.columns().to_vec()).unwrap_or_default(),
            error: event.error.map(DbalError::to_string),
        }
    }
}

/// An observer that appends every event to the returned log.
pub fn recording_observer() -> (QueryObserver, Arc<Mutex<Vec<RecordedEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let observer: QueryObserver = Box::new(move |event: &QueryEvent<'_>| {
        if let Ok(mut log) = sink.lock() {
            log.push(RecordedEvent::from_event(event));
        }
    });
    (observer, events)
}

/// In-memory result adapter with a fixed type report.
#[derive(Debug)]
pub struct MemoryAdapter {
    columns: Arc<[String]>,
    types: IndexMap<String, ColumnType>,
    rows: Vec<Vec<Value>>,
    cursor: usize,
    rewind_only: bool,
}

impl MemoryAdapter {
    pub fn new(columns: Vec<(&str, ColumnType)>, rows: Vec<Vec<Value>>) -> Self {
        let names: Vec<String> = columns.iter().map(|(name, _)| name.to_string()).collect();
        MemoryAdapter {
            columns: names.into(),
            types: columns.into_iter().map(|(name, ty)| (name.to_string(), ty)).collect(),
            rows,
            cursor: 0,
            rewind_only: false,
        }
    }

    /// Behave like an engine cursor that can only restart.
    pub fn rewind_only(mut self) -> Self {
        self.rewind_only = true;
        self
    }
}

impl ResultAdapter for MemoryAdapter {
    fn fetch(&mut self) -> Result<Option<RawRow>> {
        let row = self.rows.get(self.cursor).map(|values| RawRow {
            columns: Arc::clone(&self.columns),
            values: values.clone(),
        });
        if row.is_some() {
            self.cursor += 1;
        }
        Ok(row)
    }

    fn seek(&mut self, index: usize) -> Result<()> {
        if self.rewind_only && index != 0 {
            return Err(DbalError::NotSupported("Only seeking at the beginning is supported.".to_string()));
        }
        if index > self.rows.len() {
            return Err(DbalError::InvalidArgument(format!("Unable to seek to row {}", index)));
        }
        self.cursor = index;
        Ok(())
    }

    fn types(&self) -> IndexMap<String, ColumnType> {
        self.types.clone()
    }

    fn rows_count(&self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }
}

#[macro_export]
macro_rules! assert_dbal_error {
    ($result:expr, $expected:pat, $context:expr) => {
        match $result {
            Err($expected) => {}
            Ok(_) => panic!("Expected {} but got Ok in {}", stringify!($expected), $context),
            Err(other) => panic!("Expected {} but got {:?} in {}", stringify!($expected), other, $context),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::adapter::ColumnKind;

    #[test]
    fn test_sample_data_fixture() {
        let fixture = DriverFixture::with_sample_data().unwrap();
        let mut result = fixture.driver.query("SELECT COUNT(*) AS n FROM users").unwrap();
        assert_eq!(result.fetch_field(0).unwrap(), Some(Value::Int(3)));
    }

    #[test]
    fn test_recording_observer() {
        let (observer, events) = recording_observer();
        let fixture = DriverFixture::with_observer(observer).unwrap();
        let _ = fixture.driver.query("SELECT 1 AS a, 2 AS b");
        let _ = fixture.driver.query("SELEC 1");

        let events = events.lock().unwrap();
        let last_two = &events[events.len() - 2..];
        assert_eq!(last_two[0].columns, vec!["a".to_string(), "b".to_string()]);
        assert!(last_two[0].error.is_none());
        assert!(last_two[1].error.as_deref().unwrap_or_default().contains("syntax error"));
    }

    #[test]
    fn test_memory_adapter_seek() {
        let mut adapter = MemoryAdapter::new(
            vec![("v", ColumnType::new(ColumnKind::Int, "INTEGER"))],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        );
        adapter.seek(1).unwrap();
        assert_eq!(adapter.fetch().unwrap().unwrap().values, vec![Value::Int(2)]);
        assert_dbal_error!(adapter.seek(5), DbalError::InvalidArgument(_), "seek past end");

        let mut rewind_only = adapter.rewind_only();
        assert_dbal_error!(rewind_only.seek(1), DbalError::NotSupported(_), "rewind-only seek");
    }
}
