// Core infrastructure modules
pub mod config;
pub mod core;

#[cfg(test)]
mod test_utils;

pub use crate::config::{load_config, ConnectionConfig, DriverKind, OpenMode};
pub use crate::core::db::{
    connect, ColumnKind, Driver, IsolationLevel, LikeMode, Pairs, Platform, QueryEvent, QueryObserver, QueryResult,
    Row, TimeZoneSpec, TransactionState, Value,
};
pub use crate::core::db::driver::silent_observer;
pub use crate::core::{DbalError, Result};
