//! Progress tracking for bulk retrieval.
//!
//! Counters are mutated from the scheduler and from retrieval completion
//! callbacks, so every update happens under a single mutex and readers get a
//! consistent [`ProgressSnapshot`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// Consistent copy of the progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Tiles retrieved (or found local) so far.
    pub current_count: u64,
    /// Estimated number of tiles to retrieve.
    pub total_count: u64,
    /// Estimated bytes retrieved so far.
    pub current_size: u64,
    /// Estimated bytes to retrieve.
    pub total_size: u64,
    /// Tiles whose retrieval failed in this run.
    pub failed_count: u64,
    /// Time of the last counter change.
    pub last_update: DateTime<Utc>,
}

impl ProgressSnapshot {
    /// Progress as a ratio (0.0 to 1.0). An empty run counts as done.
    pub fn ratio(&self) -> f64 {
        if self.total_count == 0 {
            1.0
        } else {
            (self.current_count as f64 / self.total_count as f64).min(1.0)
        }
    }

    /// Progress as a percentage.
    pub fn percent(&self) -> f64 {
        self.ratio() * 100.0
    }

    /// Returns true if no counter changed for longer than `watchdog`.
    pub fn is_stalled(&self, watchdog: Duration) -> bool {
        self.stalled_for() > watchdog
    }

    /// Time since the last counter change.
    pub fn stalled_for(&self) -> Duration {
        (Utc::now() - self.last_update)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug)]
struct ProgressState {
    average_tile_size: u64,
    current_count: u64,
    total_count: u64,
    current_size: u64,
    total_size: u64,
    failed_count: u64,
    last_update: DateTime<Utc>,
}

impl ProgressState {
    /// Totals never fall below what was already retrieved.
    fn normalize(&mut self) {
        if self.total_count < self.current_count {
            self.total_count = self.current_count;
            self.total_size = self.current_size;
        }
    }

    fn touch(&mut self) {
        self.last_update = Utc::now();
    }
}

/// Shared progress tracker of one bulk run.
///
/// Sizes are estimates: every tile counts as the average tile size of the
/// layer, set by [`initialize`](Self::initialize).
#[derive(Debug)]
pub struct RetrievalProgress {
    state: Mutex<ProgressState>,
}

impl Default for RetrievalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl RetrievalProgress {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProgressState {
                average_tile_size: 0,
                current_count: 0,
                total_count: 0,
                current_size: 0,
                total_size: 0,
                failed_count: 0,
                last_update: Utc::now(),
            }),
        }
    }

    pub fn average_tile_size(&self) -> u64 {
        self.state.lock().average_tile_size
    }

    /// Seeds the totals from the estimated number of missing tiles.
    pub fn initialize(&self, estimated_tiles: u64, average_tile_size: u64) {
        let mut state = self.state.lock();
        state.average_tile_size = average_tile_size;
        state.total_count = estimated_tiles;
        state.total_size = estimated_tiles.saturating_mul(average_tile_size);
        state.touch();
        state.normalize();
    }

    /// A tile was retrieved or found already cached.
    pub fn record_retrieved(&self) {
        let mut state = self.state.lock();
        state.current_count += 1;
        state.current_size += state.average_tile_size;
        state.touch();
        state.normalize();
    }

    /// A tile turned out not to exist remotely; shrinks the totals.
    pub fn record_absent(&self) {
        let mut state = self.state.lock();
        state.total_count = state.total_count.saturating_sub(1);
        state.total_size = state.total_size.saturating_sub(state.average_tile_size);
        state.touch();
        state.normalize();
    }

    /// A tile retrieval failed; it stays missing for a later run.
    pub fn record_failed(&self) {
        let mut state = self.state.lock();
        state.failed_count += 1;
        state.touch();
    }

    /// The run made headway without changing a counter, such as probing a
    /// region that is already cached.
    pub fn record_activity(&self) {
        self.state.lock().touch();
    }

    /// Marks the run complete: totals collapse to what was retrieved.
    pub fn complete(&self) {
        let mut state = self.state.lock();
        state.total_count = state.current_count;
        state.total_size = state.current_size;
        state.touch();
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        ProgressSnapshot {
            current_count: state.current_count,
            total_count: state.total_count,
            current_size: state.current_size,
            total_size: state.total_size,
            failed_count: state.failed_count,
            last_update: state.last_update,
        }
    }
}
