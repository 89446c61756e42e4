/// SQLite Driver
///
/// Owns one `rusqlite::Connection`. Every statement, including bootstrap
/// pragmas and transaction control, goes through `logged_query`, which
/// times the native call, classifies failures and notifies the observer.

use crate::config::{ConnectionConfig, DriverKind, OpenMode};
use crate::core::db::classify::{build_error, match_rules, FailureKind, MessageRule};
use crate::core::db::driver::{Driver, IsolationLevel, QueryEvent, QueryObserver, TransactionState};
use crate::core::db::literal::{
    append_limit_clauses, escape_like_metacharacters, escape_quotes, wrap_like_pattern, Interval,
    LikeMode,
};
use crate::core::db::platform::Platform;
use crate::core::db::result::QueryResult;
use crate::core::db::row::Value;
use crate::core::db::sqlite::{SqlitePlatform, SqliteResultAdapter};
use crate::core::db::timezone::TimeZoneSpec;
use crate::core::{DbalError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{ffi, Connection, OpenFlags};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Message rules for SQLite failures, in priority order.
const SQLITE_ERROR_RULES: &[MessageRule] = &[
    MessageRule {
        kind: FailureKind::ForeignKeyViolation,
        needles: &["foreign key constraint failed"],
        case_insensitive: true,
    },
    MessageRule {
        kind: FailureKind::UniqueViolation,
        needles: &["must be unique", "is not unique", "are not unique", "UNIQUE constraint failed"],
        case_insensitive: false,
    },
    MessageRule {
        kind: FailureKind::NotNullViolation,
        needles: &["may not be NULL", "NOT NULL constraint failed"],
        case_insensitive: false,
    },
    MessageRule {
        kind: FailureKind::Connection,
        needles: &["unable to open database file"],
        case_insensitive: false,
    },
];

/// Extra keys handled natively instead of through a pragma.
const BUSY_TIMEOUT: &str = "busy_timeout";

static PRAGMA_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub struct SqliteDriver {
    connection: Option<Connection>,
    connection_tz: TimeZoneSpec,
    on_query: QueryObserver,
    affected_rows: Cell<u64>,
    time_taken: Cell<Duration>,
    savepoints: RefCell<Vec<String>>,
}

impl SqliteDriver {
    /// Opens the database named by `config` and runs the bootstrap pragmas.
    pub fn connect(config: &ConnectionConfig, observer: QueryObserver) -> Result<Self> {
        config.validate()?;
        let connection_tz = match config.timezone.as_deref() {
            Some(tz) => tz.parse()?,
            // CURRENT_TIMESTAMP and the date functions produce UTC
            None => TimeZoneSpec::utc(),
        };

        let connection = Connection::open_with_flags(&config.database, open_flags(config.open_mode))
            .map_err(|e| native_error(&e, None))?;

        if let Some(timeout) = config.extras.get(BUSY_TIMEOUT) {
            let millis: u64 = timeout
                .parse()
                .map_err(|_| DbalError::InvalidArgument(format!("Invalid busy_timeout: {}", timeout)))?;
            connection
                .busy_timeout(Duration::from_millis(millis))
                .map_err(|e| native_error(&e, None))?;
        }

        let driver = SqliteDriver {
            connection: Some(connection),
            connection_tz,
            on_query: observer,
            affected_rows: Cell::new(0),
            time_taken: Cell::new(Duration::ZERO),
            savepoints: RefCell::new(Vec::new()),
        };

        driver.logged_query("PRAGMA foreign_keys = ON")?;
        for (key, value) in config.extras.iter().filter(|(key, _)| key.as_str() != BUSY_TIMEOUT) {
            if !PRAGMA_NAME.is_match(key) {
                return Err(DbalError::InvalidArgument(format!("Invalid connection option name: {}", key)));
            }
            driver.logged_query(&format!("PRAGMA {} = {}", key, value))?;
        }

        debug!(database = %config.database, mode = ?config.open_mode, "connected to sqlite");
        Ok(driver)
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| DbalError::InvalidState("Driver is not connected.".to_string()))
    }

    /// Runs `sql` and reports the outcome to the observer.
    fn logged_query(&self, sql: &str) -> Result<QueryResult<'_>> {
        match self.run(sql) {
            Ok(result) => {
                (self.on_query)(&QueryEvent {
                    sql,
                    elapsed: self.time_taken.get(),
                    result: Some(&result),
                    error: None,
                });
                Ok(result)
            }
            Err(err) => {
                (self.on_query)(&QueryEvent {
                    sql,
                    elapsed: self.time_taken.get(),
                    result: None,
                    error: Some(&err),
                });
                Err(err)
            }
        }
    }

    fn run(&self, sql: &str) -> Result<QueryResult<'_>> {
        let connection = self.connection()?;

        let start = Instant::now();
        let outcome = execute(connection, sql);
        let elapsed = start.elapsed();
        self.time_taken.set(elapsed);
        debug!(sql, elapsed_us = elapsed.as_micros() as u64, "statement executed");

        let adapter = outcome.map_err(|e| {
            let err = native_error(&e, Some(sql));
            warn!(sql, error = %err, "query failed");
            err
        })?;

        self.affected_rows.set(connection.changes() as u64);
        if connection.is_autocommit() {
            self.savepoints.borrow_mut().clear();
        }
        Ok(QueryResult::new(Box::new(adapter), self))
    }
}

/// Prepares one statement and executes it up to its first row.
fn execute<'c>(connection: &'c Connection, sql: &str) -> rusqlite::Result<SqliteResultAdapter<'c>> {
    SqliteResultAdapter::execute(connection.prepare(sql)?, sql)
}

fn open_flags(mode: OpenMode) -> OpenFlags {
    let access = match mode {
        OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
        OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
        OpenMode::ReadWriteCreate => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    };
    access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

/// Message and extended result code of a native failure.
fn native_error_parts(err: &rusqlite::Error) -> (String, i32) {
    match err {
        rusqlite::Error::SqliteFailure(native, Some(message)) => (message.clone(), native.extended_code),
        other => (other.to_string(), other.sqlite_error().map_or(0, |native| native.extended_code)),
    }
}

pub(crate) fn native_error(err: &rusqlite::Error, sql: Option<&str>) -> DbalError {
    let (message, code) = native_error_parts(err);
    classify(&message, code, sql)
}

/// Message rules first, then the extended result code.
fn classify(message: &str, code: i32, sql: Option<&str>) -> DbalError {
    let kind = match_rules(SQLITE_ERROR_RULES, message).or_else(|| kind_from_code(code));
    build_error(kind, message, code, sql)
}

fn kind_from_code(code: i32) -> Option<FailureKind> {
    match code {
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(FailureKind::ForeignKeyViolation),
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(FailureKind::UniqueViolation),
        ffi::SQLITE_CONSTRAINT_NOTNULL => Some(FailureKind::NotNullViolation),
        c if c & 0xff == ffi::SQLITE_CANTOPEN => Some(FailureKind::Connection),
        _ => None,
    }
}

impl Driver for SqliteDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Sqlite
    }

    fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            if let Err((_, e)) = connection.close() {
                warn!(error = %e, "failed to close sqlite connection cleanly");
            }
            self.savepoints.borrow_mut().clear();
            debug!("disconnected from sqlite");
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn query(&self, sql: &str) -> Result<QueryResult<'_>> {
        self.logged_query(sql)
    }

    fn last_inserted_id(&self, _sequence_name: Option<&str>) -> Result<Value> {
        Ok(Value::Int(self.connection()?.last_insert_rowid()))
    }

    fn affected_rows(&self) -> u64 {
        self.affected_rows.get()
    }

    fn query_elapsed_time(&self) -> Duration {
        self.time_taken.get()
    }

    fn connection_timezone(&self) -> TimeZoneSpec {
        self.connection_tz
    }

    fn server_version(&self) -> Result<String> {
        self.connection()?;
        Ok(rusqlite::version().to_string())
    }

    fn ping(&self) -> bool {
        self.is_connected()
    }

    fn platform(&self) -> Result<Box<dyn Platform + '_>> {
        self.connection()?;
        Ok(Box::new(SqlitePlatform::new(self)))
    }

    fn transaction_state(&self) -> TransactionState {
        match &self.connection {
            Some(connection) if !connection.is_autocommit() => TransactionState::InTransaction,
            _ => TransactionState::Idle,
        }
    }

    fn savepoints(&self) -> Vec<String> {
        self.savepoints.borrow().clone()
    }

    fn set_transaction_isolation_level(&self, level: IsolationLevel) -> Result<()> {
        let sql = match level {
            IsolationLevel::ReadUncommitted => "PRAGMA read_uncommitted = 1",
            IsolationLevel::Serializable => "PRAGMA read_uncommitted = 0",
            other => {
                return Err(DbalError::NotSupported(format!(
                    "Unsupported transaction isolation level {:?}",
                    other
                )))
            }
        };
        self.logged_query(sql)?;
        Ok(())
    }

    fn begin_transaction(&self) -> Result<()> {
        self.logged_query("BEGIN")?;
        Ok(())
    }

    fn commit_transaction(&self) -> Result<()> {
        self.logged_query("COMMIT")?;
        Ok(())
    }

    fn rollback_transaction(&self) -> Result<()> {
        self.logged_query("ROLLBACK")?;
        Ok(())
    }

    fn create_savepoint(&self, name: &str) -> Result<()> {
        self.logged_query(&format!("SAVEPOINT {}", self.convert_identifier_to_sql(name)))?;
        self.savepoints.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn release_savepoint(&self, name: &str) -> Result<()> {
        self.logged_query(&format!("RELEASE SAVEPOINT {}", self.convert_identifier_to_sql(name)))?;
        let mut savepoints = self.savepoints.borrow_mut();
        if let Some(pos) = savepoints.iter().rposition(|s| s == name) {
            savepoints.truncate(pos);
        }
        Ok(())
    }

    fn rollback_savepoint(&self, name: &str) -> Result<()> {
        self.logged_query(&format!("ROLLBACK TO SAVEPOINT {}", self.convert_identifier_to_sql(name)))?;
        let mut savepoints = self.savepoints.borrow_mut();
        if let Some(pos) = savepoints.iter().rposition(|s| s == name) {
            savepoints.truncate(pos + 1);
        }
        Ok(())
    }

    fn convert_to_native(&self, value: Value, native_type: Option<&str>) -> Result<Value> {
        match native_type {
            Some(native) if native.eq_ignore_ascii_case("JSON") => Ok(match value {
                Value::String(text) => match serde_json::from_str(&text) {
                    Ok(json) => Value::Json(json),
                    Err(e) => {
                        trace!(error = %e, "JSON column holds invalid JSON");
                        Value::String(text)
                    }
                },
                other => other,
            }),
            other => Err(DbalError::InvalidState(format!(
                "No driver-specific conversion for native type {:?}.",
                other
            ))),
        }
    }

    fn convert_string_to_sql(&self, value: &str) -> String {
        format!("'{}'", escape_quotes(value))
    }

    fn convert_json_to_sql(&self, value: &serde_json::Value) -> Result<String> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| DbalError::InvalidArgument(format!("JSON Encode Error: {}", e)))?;
        Ok(self.convert_string_to_sql(&encoded))
    }

    fn convert_like_to_sql(&self, value: &str, mode: LikeMode) -> String {
        wrap_like_pattern(&escape_like_metacharacters(&escape_quotes(value)), mode)
    }

    fn convert_bool_to_sql(&self, value: bool) -> String {
        let literal = if value { "1" } else { "0" };
        literal.to_string()
    }

    fn convert_identifier_to_sql(&self, value: &str) -> String {
        value
            .split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    part.chars().filter(|c| *c != '[' && *c != ']').collect()
                }
            })
            .collect::<Vec<String>>()
            .join(".")
    }

    fn convert_datetime_to_sql(&self, value: &DateTime<FixedOffset>) -> String {
        let local = self.connection_tz.convert(value);
        format!("'{}'", local.format("%Y-%m-%d %H:%M:%S%.6f"))
    }

    fn convert_datetime_simple_to_sql(&self, value: &NaiveDateTime) -> String {
        format!("'{}'", value.format("%Y-%m-%d %H:%M:%S%.6f"))
    }

    fn convert_interval_to_sql(&self, value: &Interval) -> String {
        value.to_iso8601()
    }

    fn convert_blob_to_sql(&self, value: &[u8]) -> String {
        format!("X'{}'", hex::encode(value))
    }

    fn modify_limit_query(&self, sql: &str, limit: Option<u64>, offset: Option<u64>) -> String {
        append_limit_clauses(sql, limit, offset, Some("-1"))
    }

    fn create_exception(&self, message: &str, code: i32, sql: Option<&str>) -> DbalError {
        classify(message, code, sql)
    }
}

impl Drop for SqliteDriver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("connected", &self.is_connected())
            .field("connection_tz", &self.connection_tz)
            .field("savepoints", &self.savepoints.borrow())
            .finish_non_exhaustive()
    }
}
