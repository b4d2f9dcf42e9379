use crate::models::api::ErrorResponse;
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to read config file '{path}': {cause}")]
    ConfigRead { path: PathBuf, cause: io::Error },

    #[error("Failed to parse config file '{path}': {cause}")]
    ConfigParse {
        path: PathBuf,
        cause: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Database pool error: {0}")]
    DatabasePool(String),

    #[error("Database query failed for '{operation}': {cause}")]
    DatabaseQuery {
        operation: String,
        cause: rusqlite::Error,
    },

    #[error("Failed to insert into {table}: {cause}")]
    DatabaseInsert {
        table: String,
        cause: rusqlite::Error,
    },

    #[error("Unknown table '{0}'")]
    UnknownTable(String),

    #[error("Invalid query payload: {0}")]
    InvalidPayload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Limit must be a positive integer")]
    InvalidLimit,

    #[error("Skip/Offset must be a positive integer")]
    InvalidSkip,

    #[error("'{0}' is not a valid severity")]
    InvalidSeverity(String),

    #[error("{0} is not a valid source")]
    InvalidSource(String),
}

impl AuditError {
    /// Request parameter errors are the caller's fault, everything else is ours
    pub fn status(&self) -> Status {
        match self {
            AuditError::InvalidLimit
            | AuditError::InvalidSkip
            | AuditError::InvalidSeverity(_)
            | AuditError::InvalidSource(_) => Status::BadRequest,
            _ => Status::InternalServerError,
        }
    }

    /// Message safe to hand back to the client
    pub fn public_message(&self) -> String {
        if self.status() == Status::BadRequest {
            self.to_string()
        } else {
            "Internal Server Error".to_string()
        }
    }
}

impl<'r> Responder<'r, 'static> for AuditError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status == Status::BadRequest {
            log::warn!("Rejected {}: {}", request.uri(), self);
        } else {
            log::error!("Request {} failed: {}", request.uri(), self);
        }

        let body = ErrorResponse {
            error: self.public_message(),
            details: None,
        };
        (status, Json(body)).respond_to(request)
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
