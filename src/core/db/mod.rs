/// Database Module
///
/// The portable access layer, organized into focused submodules:
///
/// - **Driver** (`driver.rs`): the per-engine contract, transactions and SQL literals
/// - **Result** (`result.rs`, `adapter.rs`, `row.rs`): the row cursor and value normalization
/// - **Platform** (`platform.rs`): capability flags and schema metadata
/// - **Errors** (`classify.rs`): ordered classification of native failures
///
/// `sqlite` holds the SQLite engine built on `rusqlite`.
pub mod adapter;
pub mod classify;
pub mod driver;
pub mod literal;
pub mod platform;
pub mod result;
pub mod row;
pub mod sqlite;
pub mod timezone;

pub use adapter::{ColumnKind, ColumnType, ResultAdapter};
pub use driver::{connect, Driver, IsolationLevel, QueryEvent, QueryObserver, TransactionState};
pub use literal::{Interval, LikeMode};
pub use platform::{ColumnInfo, ForeignKeyInfo, Platform, PlatformFeature, TableInfo};
pub use result::{Pairs, QueryResult};
pub use row::{PairKey, Row, Value};
pub use timezone::TimeZoneSpec;
