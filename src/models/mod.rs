pub mod api;
pub mod audit_entry;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod log_code;
pub mod query_payload;
pub mod severity;
