//! Handle to a spawned bulk run.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::BulkError;
use super::progress::{ProgressSnapshot, RetrievalProgress};
use super::scheduler::BulkOutcome;
use super::state::BulkState;

/// Observes and controls a bulk run running on a background task.
///
/// Dropping the handle does not stop the run; call [`cancel`](Self::cancel).
pub struct BulkHandle {
    progress: Arc<RetrievalProgress>,
    state: watch::Receiver<BulkState>,
    cancel: CancellationToken,
    task: JoinHandle<Result<BulkOutcome, BulkError>>,
}

impl BulkHandle {
    pub(crate) fn new(
        progress: Arc<RetrievalProgress>,
        state: watch::Receiver<BulkState>,
        cancel: CancellationToken,
        task: JoinHandle<Result<BulkOutcome, BulkError>>,
    ) -> Self {
        Self {
            progress,
            state,
            cancel,
            task,
        }
    }

    pub fn progress(&self) -> &Arc<RetrievalProgress> {
        &self.progress
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    pub fn state(&self) -> BulkState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition.
    pub fn state_receiver(&self) -> watch::Receiver<BulkState> {
        self.state.clone()
    }

    /// Token cancelling the run; cloneable into signal handlers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests cancellation. The run stops at its next cancellation point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run to end.
    ///
    /// # Errors
    ///
    /// Returns the run's error, or [`BulkError::TaskFailed`] if the task
    /// panicked or was aborted.
    pub async fn wait(self) -> Result<BulkOutcome, BulkError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(BulkError::TaskFailed(e.to_string())),
        }
    }
}
