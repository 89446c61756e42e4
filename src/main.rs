use dbal::config::{default_config_path, load_config};
use dbal::{connect, silent_observer, ConnectionConfig, DbalError, Result};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};

const USAGE: &str = "usage: dbal [<database|config.toml>] <sql>";

fn main() -> ExitCode {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (target, sql) = match args.as_slice() {
        [sql] => (None, sql.as_str()),
        [target, sql] => (Some(target.as_str()), sql.as_str()),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match run(target, sql) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "statement failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(target: Option<&str>) -> Result<ConnectionConfig> {
    match target {
        Some(path) if path.ends_with(".toml") => load_config(path),
        Some(database) => Ok(ConnectionConfig::sqlite(database)),
        None => {
            let path = default_config_path()
                .ok_or_else(|| DbalError::Config("no configuration directory on this platform".to_string()))?;
            if !Path::new(&path).exists() {
                return Err(DbalError::Config(format!("{} does not exist", path.display())));
            }
            load_config(path)
        }
    }
}

fn run(target: Option<&str>, sql: &str) -> Result<()> {
    let config = resolve_config(target)?;
    info!(database = %config.database, "opening database");

    let driver = connect(&config, silent_observer())?;
    let mut result = driver.query(sql)?;
    while let Some(row) = result.fetch()? {
        let line = serde_json::to_string(&row)
            .map_err(|e| DbalError::InvalidArgument(format!("JSON Encode Error: {}", e)))?;
        println!("{}", line);
    }
    println!("{} row(s) affected", driver.affected_rows());
    Ok(())
}
