use crate::models::api::QueryResult;
use crate::models::error::{AuditError, Result};
use crate::repo::storage::StorageClient;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Storage service the audit endpoints read from
    storage: Arc<dyn StorageClient>,
}

impl AppState {
    /// Create a new application state around a storage client
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Read a whole table on the blocking pool
    pub async fn query_tbl(&self, table: &'static str) -> Result<QueryResult> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.query_tbl(table))
            .await
            .map_err(|e| AuditError::Task(e.to_string()))?
    }

    /// Run a payload query on the blocking pool
    pub async fn query_tbl_with_payload(
        &self,
        table: &'static str,
        payload: String,
    ) -> Result<QueryResult> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.query_tbl_with_payload(table, &payload))
            .await
            .map_err(|e| AuditError::Task(e.to_string()))?
    }
}
