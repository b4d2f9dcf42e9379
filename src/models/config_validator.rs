use crate::models::config::Config;
use crate::models::error::{AuditError, Result};
use crate::repo::sqlite::is_in_memory;
use log::{info, warn};
use std::fs;
use std::net::IpAddr;
use std::path::Path;

/// Validates the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    info!("Validating configuration...");

    validate_listen_address(&config.address, config.port)?;
    validate_database_path(&config.database_file)?;

    if !config.seed_log_codes {
        warn!("seed_log_codes is disabled - the log_codes table must be populated externally");
    }

    info!("Configuration validation passed");
    Ok(())
}

fn validate_listen_address(address: &str, port: u16) -> Result<()> {
    if address.parse::<IpAddr>().is_err() {
        return Err(AuditError::InvalidConfig(format!(
            "address must be an IP address, got '{}'",
            address
        )));
    }

    if port == 0 {
        return Err(AuditError::InvalidConfig(
            "port must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate database file path
fn validate_database_path(db_file: &str) -> Result<()> {
    if db_file.is_empty() {
        return Err(AuditError::InvalidConfig(
            "database_file cannot be empty. Provide a path or ':memory:'".to_string(),
        ));
    }

    if is_in_memory(db_file) {
        warn!("Using in-memory database - audit entries are lost on shutdown");
        return Ok(());
    }

    let path = Path::new(db_file);

    if path.exists() {
        if !path.is_file() {
            return Err(AuditError::InvalidConfig(format!(
                "Database path exists but is not a file: {}",
                db_file
            )));
        }

        if let Err(e) = fs::OpenOptions::new().read(true).write(true).open(path) {
            return Err(AuditError::InvalidConfig(format!(
                "Database file is not readable/writable: {}\nError: {}",
                db_file, e
            )));
        }
    } else {
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let parent_exists = parent.as_os_str().is_empty() || parent.exists();

        if !parent_exists {
            return Err(AuditError::InvalidConfig(format!(
                "Database parent directory does not exist: {}",
                db_file
            )));
        }
    }

    Ok(())
}
