//! Errors of a bulk retrieval run.

use thiserror::Error;

use crate::cache::StoreError;

/// Errors that end a bulk run.
#[derive(Debug, Error)]
pub enum BulkError {
    /// Cancellation was requested. Not a failure; the run stops cleanly.
    #[error("Bulk retrieval cancelled")]
    Cancelled,

    /// The tile cache could not be queried.
    #[error("Tile store error: {0}")]
    Store(#[from] StoreError),

    /// The request cannot be served by this layer.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The background task running the scheduler panicked or was aborted.
    #[error("Bulk task failed: {0}")]
    TaskFailed(String),
}

impl BulkError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BulkError::Cancelled)
    }
}
