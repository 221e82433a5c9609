//! Per-tile retrieval events.

use std::fmt;

use crate::level::Tile;

/// Why a tile could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The service reported the tile does not exist; it is now marked absent.
    Absent,
    /// The URL builder produced no URL for the tile.
    NoUrl,
    /// Transient fetch failure (timeout, HTTP error, connection).
    Fetch(String),
    /// The payload could not be written to the cache.
    Store(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Absent => write!(f, "absent"),
            FailureReason::NoUrl => write!(f, "no url"),
            FailureReason::Fetch(e) => write!(f, "fetch failed: {}", e),
            FailureReason::Store(e) => write!(f, "store failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    Succeeded,
    Failed(FailureReason),
}

/// Notification emitted once per finished tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRetrievalEvent {
    pub tile: Tile,
    /// Resource URL, when one could be built.
    pub url: Option<String>,
    pub outcome: RetrievalOutcome,
}

impl BulkRetrievalEvent {
    pub fn is_success(&self) -> bool {
        self.outcome == RetrievalOutcome::Succeeded
    }
}

/// Receives tile events.
///
/// Called synchronously from retrieval completion context, possibly from
/// several tasks at once; implementations should return quickly.
pub trait BulkRetrievalListener: Send + Sync {
    fn on_event(&self, event: &BulkRetrievalEvent);
}

impl<F> BulkRetrievalListener for F
where
    F: Fn(&BulkRetrievalEvent) + Send + Sync,
{
    fn on_event(&self, event: &BulkRetrievalEvent) {
        self(event)
    }
}
