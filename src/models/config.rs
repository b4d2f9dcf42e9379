use crate::models::config_validator::validate_config;
use crate::models::error::{AuditError, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database_file: String,
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "bool_true")]
    pub seed_log_codes: bool,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}
const fn default_port() -> u16 {
    8081
}
const fn bool_true() -> bool {
    true
}

pub fn setup_config(config_file: String) -> Result<Config> {
    let config_path = PathBuf::from(config_file);
    info!("Loading config from: {}", config_path.display());

    let config_str = fs::read_to_string(&config_path).map_err(|cause| AuditError::ConfigRead {
        path: config_path.clone(),
        cause,
    })?;

    let config: Config =
        serde_json::from_str(&config_str).map_err(|cause| AuditError::ConfigParse {
            path: config_path,
            cause,
        })?;

    validate_config(&config)?;

    Ok(config)
}
