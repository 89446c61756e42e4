use crate::core::{DbalError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Database engines a driver can be selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Sqlite,
}

/// How the native database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
    /// Read-write, creating the database if it does not exist
    #[default]
    ReadWriteCreate,
}

/// Connection configuration, usually parsed from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub driver: DriverKind,
    /// File path, or ":memory:"
    pub database: String,
    #[serde(default)]
    pub open_mode: OpenMode,
    /// Connection timezone: "local", "UTC" or an offset like "+02:00"
    pub timezone: Option<String>,
    /// Engine-specific options passed through to the native client.
    #[serde(default)]
    pub extras: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// A read-write-create SQLite configuration for `database`.
    pub fn sqlite(database: impl Into<String>) -> Self {
        ConnectionConfig {
            driver: DriverKind::Sqlite,
            database: database.into(),
            open_mode: OpenMode::default(),
            timezone: None,
            extras: BTreeMap::new(),
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_open_mode(mut self, open_mode: OpenMode) -> Self {
        self.open_mode = open_mode;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ConnectionConfig = toml::from_str(content).map_err(|e| DbalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(DbalError::Config("`database` must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = dbal::config::load_config("connection.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConnectionConfig> {
    let content = fs::read_to_string(path)?;
    ConnectionConfig::from_toml_str(&content)
}

/// Default location of the connection file: `<config dir>/dbal/connection.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dbal").join("connection.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
driver = "sqlite"
database = "/var/lib/app/app.db"
open_mode = "read_only"
timezone = "+02:00"

[extras]
busy_timeout = "5000"
journal_mode = "WAL"
"#;

    #[test]
    fn test_load_config_from_str() {
        let config = ConnectionConfig::from_toml_str(SAMPLE_CONFIG).expect("Failed to parse sample config");
        assert_eq!(config.driver, DriverKind::Sqlite);
        assert_eq!(config.database, "/var/lib/app/app.db");
        assert_eq!(config.open_mode, OpenMode::ReadOnly);
        assert_eq!(config.timezone.as_deref(), Some("+02:00"));
        assert_eq!(config.extras.len(), 2);
        assert_eq!(config.extras["journal_mode"], "WAL");
    }

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::from_toml_str("driver = \"sqlite\"\ndatabase = \":memory:\"").unwrap();
        assert_eq!(config.open_mode, OpenMode::ReadWriteCreate);
        assert!(config.timezone.is_none());
        assert!(config.extras.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let unknown_driver = ConnectionConfig::from_toml_str("driver = \"oracle\"\ndatabase = \"x\"");
        assert!(matches!(unknown_driver, Err(DbalError::Config(_))));

        let empty_database = ConnectionConfig::from_toml_str("driver = \"sqlite\"\ndatabase = \"\"");
        assert!(matches!(empty_database, Err(DbalError::Config(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connection.toml");
        fs::write(&path, SAMPLE_CONFIG).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.open_mode, OpenMode::ReadOnly);

        assert!(matches!(load_config(dir.path().join("missing.toml")), Err(DbalError::Io(_))));
    }

    #[test]
    fn test_builder() {
        let config = ConnectionConfig::sqlite(":memory:")
            .with_timezone("UTC")
            .with_extra("cache_size", "-2000");
        assert_eq!(config.timezone.as_deref(), Some("UTC"));
        assert_eq!(config.extras["cache_size"], "-2000");
    }
}
