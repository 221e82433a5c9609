//! Bulk run lifecycle.

use std::fmt;

use serde::Serialize;

/// State of a bulk run.
///
/// `Initializing → Running → (Completed | Cancelled | Failed)`. Cancellation
/// may also end a run directly from `Initializing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BulkState {
    /// Sampling the cache to seed progress totals.
    Initializing,
    /// Sweeping levels and regions.
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl BulkState {
    /// Returns true once the run has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BulkState::Completed | BulkState::Cancelled | BulkState::Failed
        )
    }
}

impl fmt::Display for BulkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BulkState::Initializing => "initializing",
            BulkState::Running => "running",
            BulkState::Completed => "completed",
            BulkState::Cancelled => "cancelled",
            BulkState::Failed => "failed",
        };
        f.write_str(name)
    }
}
