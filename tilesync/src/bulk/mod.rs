//! Bulk retrieval
//!
//! Brings every tile of a sector, from level 0 up to a target level, into the
//! local cache.
//!
//! - [`BulkScheduler`]: the run itself (estimate, then level and region sweep)
//! - [`BulkHandle`]: observe, cancel and await a spawned run
//! - [`RetrievalProgress`]: shared counters with consistent snapshots
//! - [`BulkRetrievalListener`]: per-tile success and failure events

mod config;
mod error;
mod handle;
mod listener;
mod progress;
mod scheduler;
mod state;

pub use config::{BulkConfig, DEFAULT_POLL_INTERVAL};
pub use error::BulkError;
pub use handle::BulkHandle;
pub use listener::{BulkRetrievalEvent, BulkRetrievalListener, FailureReason, RetrievalOutcome};
pub use progress::{ProgressSnapshot, RetrievalProgress};
pub use scheduler::{BulkOutcome, BulkScheduler};
pub use state::BulkState;
