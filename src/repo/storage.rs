use crate::models::api::QueryResult;
use crate::models::error::Result;

/// Table holding the known audit log codes
pub const LOG_CODES_TABLE: &str = "log_codes";
/// Table holding the audit entries
pub const LOG_TABLE: &str = "log";

/// Read access to the storage service backing the audit endpoints.
///
/// Calls block; route handlers move them off the async executor.
pub trait StorageClient: Send + Sync {
    /// Every row of `table`, in storage order
    fn query_tbl(&self, table: &str) -> Result<QueryResult>;

    /// Rows of `table` selected by a JSON-encoded
    /// [`QueryPayload`](crate::models::query_payload::QueryPayload)
    fn query_tbl_with_payload(&self, table: &str, payload: &str) -> Result<QueryResult>;
}
