/// SQLite engine: driver, result adapter and platform, built on `rusqlite`.
pub mod adapter;
pub mod driver;
pub mod platform;

pub use adapter::SqliteResultAdapter;
pub use driver::SqliteDriver;
pub use platform::SqlitePlatform;
