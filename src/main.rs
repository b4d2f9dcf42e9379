mod api_routes;
mod api_state;
mod models;
mod repo;

use crate::models::config::{setup_config, Config};
use crate::models::severity::Severity;
use crate::repo::sqlite::SqliteStorage;
use anyhow::{Context, Result};
use api_state::AppState;
use clap::Parser;
use log::{debug, info, warn};
use serde_json::json;
use std::sync::Arc;

#[macro_use]
extern crate rocket;

fn build_rocket(config: &Config) -> Result<rocket::Rocket<rocket::Build>> {
    let storage = SqliteStorage::open(&config.database_file)
        .context("Failed to initialize database connection pool")?;
    storage
        .setup_database(config.seed_log_codes)
        .context("Failed to set up database schema")?;
    info!("Database initialized successfully: {}", config.database_file);

    let startup = json!({ "address": config.address, "port": config.port });
    if let Err(e) = storage.insert_audit_entry("START", Severity::Information, &startup) {
        warn!("Failed to record startup audit entry: {}", e);
    }

    let figment = rocket::Config::figment()
        .merge(("address", config.address.clone()))
        .merge(("port", config.port));

    Ok(rocket::custom(figment)
        .manage(AppState::new(Arc::new(storage)))
        .mount("/", api_routes::routes()))
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    info!("Audit service starting...");

    // Strip any surrounding quotes from config file path
    let config_file_path = args
        .config_file
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    let config = setup_config(config_file_path).context("Failed to load configuration")?;
    debug!("Loaded config: {:?}", &config);

    if args.validate_only {
        info!("Configuration is valid. Exiting (--validate-only mode).");
        return Ok(());
    }

    build_rocket(&config)?.launch().await?;
    info!("Audit service stopped");
    Ok(())
}

#[derive(Parser)]
#[command(name = "audit-service")]
#[command(about = "REST service for querying the audit log", long_about = None)]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        default_value = "config.json",
        env = "AUDIT_SERVICE_CONFIG"
    )]
    config_file: String,

    #[arg(
        short = 'l',
        long = "log-level",
        default_value = "info",
        env = "LOG_LEVEL"
    )]
    log_level: String,

    #[arg(short = 'v', long = "validate-only")]
    validate_only: bool,
}
