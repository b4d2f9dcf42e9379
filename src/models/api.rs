use crate::models::audit_entry::AuditLogEntry;
use crate::models::log_code::LogCode;
use crate::models::severity::SeverityEntry;
use serde::{Deserialize, Serialize};

/// Rows returned by a storage query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
}

impl QueryResult {
    /// Deserialize every row into `T`
    pub fn rows_as<T: serde::de::DeserializeOwned>(self) -> serde_json::Result<Vec<T>> {
        self.rows.into_iter().map(serde_json::from_value).collect()
    }
}

/// Response for GET /audit/severity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityResponse {
    pub log_severity: Vec<SeverityEntry>,
}

/// Response for GET /audit/logcode
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCodeResponse {
    pub log_code: Vec<LogCode>,
}

/// Response for GET /audit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResponse {
    pub total_count: i64,
    pub audit: Vec<AuditLogEntry>,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}
