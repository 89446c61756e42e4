/// Driver Module
///
/// The engine-neutral driver contract. A driver owns exactly one native
/// connection; every statement it runs, including its own transaction and
/// bootstrap statements, is reported to the query observer.

use crate::config::{ConnectionConfig, DriverKind};
use crate::core::db::literal::{Interval, LikeMode};
use crate::core::db::platform::Platform;
use crate::core::db::result::QueryResult;
use crate::core::db::row::Value;
use crate::core::db::sqlite::SqliteDriver;
use crate::core::db::timezone::TimeZoneSpec;
use crate::core::{DbalError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use std::time::Duration;

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Idle,
    /// Transaction in progress
    InTransaction,
}

/// Portable transaction isolation levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// What the query observer learns about one executed statement.
#[derive(Debug)]
pub struct QueryEvent<'a> {
    pub sql: &'a str,
    /// Time spent in the native call
    pub elapsed: Duration,
    pub result: Option<&'a QueryResult<'a>>,
    pub error: Option<&'a DbalError>,
}

/// Callback invoked exactly once per executed statement.
pub type QueryObserver = Box<dyn Fn(&QueryEvent<'_>) + Send>;

/// An observer that ignores every event.
pub fn silent_observer() -> QueryObserver {
    Box::new(|_| {})
}

/// The per-engine driver contract.
pub trait Driver {
    fn kind(&self) -> DriverKind;

    /// Releases the native connection. Safe to call repeatedly.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Executes one statement and wraps its result.
    ///
    /// Native failures are classified with `create_exception`; the observer
    /// sees the statement whether it succeeds or fails.
    fn query(&self, sql: &str) -> Result<QueryResult<'_>>;

    /// Identifier generated by the most recent insert. Engines without named
    /// sequences ignore `sequence_name`.
    fn last_inserted_id(&self, sequence_name: Option<&str>) -> Result<Value>;

    /// Rows changed by the most recent statement.
    fn affected_rows(&self) -> u64;

    /// Native execution time of the most recent statement.
    fn query_elapsed_time(&self) -> Duration;

    /// Timezone date-times are written in and naive values are read in.
    fn connection_timezone(&self) -> TimeZoneSpec;

    fn server_version(&self) -> Result<String>;

    fn ping(&self) -> bool;

    fn platform(&self) -> Result<Box<dyn Platform + '_>>;

    fn transaction_state(&self) -> TransactionState;

    /// Open savepoints, outermost first.
    fn savepoints(&self) -> Vec<String>;

    fn set_transaction_isolation_level(&self, level: IsolationLevel) -> Result<()>;

    fn begin_transaction(&self) -> Result<()>;

    fn commit_transaction(&self) -> Result<()>;

    fn rollback_transaction(&self) -> Result<()>;

    fn create_savepoint(&self, name: &str) -> Result<()>;

    fn release_savepoint(&self, name: &str) -> Result<()>;

    fn rollback_savepoint(&self, name: &str) -> Result<()>;

    /// Converts a raw value of a driver-specific column.
    fn convert_to_native(&self, value: Value, native_type: Option<&str>) -> Result<Value>;

    fn convert_string_to_sql(&self, value: &str) -> String;

    fn convert_json_to_sql(&self, value: &serde_json::Value) -> Result<String>;

    fn convert_like_to_sql(&self, value: &str, mode: LikeMode) -> String;

    fn convert_bool_to_sql(&self, value: bool) -> String;

    fn convert_identifier_to_sql(&self, value: &str) -> String;

    /// Writes an absolute instant, converted to the connection timezone.
    fn convert_datetime_to_sql(&self, value: &DateTime<FixedOffset>) -> String;

    /// Writes a wall-clock date-time as is.
    fn convert_datetime_simple_to_sql(&self, value: &NaiveDateTime) -> String;

    fn convert_interval_to_sql(&self, value: &Interval) -> String;

    fn convert_blob_to_sql(&self, value: &[u8]) -> String;

    fn modify_limit_query(&self, sql: &str, limit: Option<u64>, offset: Option<u64>) -> String;

    /// Classifies a native failure into the error taxonomy.
    fn create_exception(&self, message: &str, code: i32, sql: Option<&str>) -> DbalError;
}

/// Opens a driver for the engine named in `config`.
pub fn connect(config: &ConnectionConfig, observer: QueryObserver) -> Result<Box<dyn Driver>> {
    match config.driver {
        DriverKind::Sqlite => Ok(Box::new(SqliteDriver::connect(config, observer)?)),
    }
}

/// Serializes any value to JSON, mapping encode failures to `InvalidArgument`.
pub fn to_json_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| DbalError::InvalidArgument(format!("JSON Encode Error: {}", e)))
}

/// Encodes any serializable value as a JSON string literal for `driver`.
pub fn convert_serializable_to_sql<T: serde::Serialize + ?Sized>(driver: &dyn Driver, value: &T) -> Result<String> {
    driver.convert_json_to_sql(&to_json_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::DriverFixture;
    use std::collections::BTreeMap;

    #[test]
    fn test_connect_selects_engine() {
        let config = ConnectionConfig::sqlite(":memory:");
        let driver = connect(&config, silent_observer()).unwrap();
        assert_eq!(driver.kind(), DriverKind::Sqlite);
        assert!(driver.ping());
        assert!(!driver.server_version().unwrap().is_empty());
    }

    #[test]
    fn test_serializable_to_sql() {
        let fixture = DriverFixture::new().unwrap();
        let value = serde_json::json!({"path": "a/b", "name": "žluť", "ratio": 1.0});
        assert_eq!(
            convert_serializable_to_sql(&fixture.driver, &value).unwrap(),
            r#"'{"name":"žluť","path":"a/b","ratio":1.0}'"#
        );

        // map keys must be strings in JSON
        let mut bad = BTreeMap::new();
        bad.insert(vec![1u8], 1);
        assert!(matches!(
            convert_serializable_to_sql(&fixture.driver, &bad),
            Err(DbalError::InvalidArgument(_))
        ));
    }
}
