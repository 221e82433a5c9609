//! Bulk retrieval scheduler.
//!
//! Drives one bulk run: seeds progress from a coverage estimate, then sweeps
//! levels from coarse to fine and regions in grid order, handing missing tiles
//! to the retrieval service whenever it has capacity.
//!
//! # Region loop
//!
//! ```text
//! probe region ─► pending queue ─► submit while service available
//!                      ▲                       │
//!                      └── wait (cancel | capacity | completion | poll) ◄┘
//! ```
//!
//! A region is finished when nothing is pending and nothing is in flight.
//! Each submission re-checks the tile: another run or an earlier region may
//! have fetched it or found it absent in the meantime.
//!
//! Tile store calls (the coverage estimate, region probes, re-checks and
//! writes) run on tokio's blocking pool so a slow cache never stalls the
//! runtime or delays cancellation.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::BulkConfig;
use super::error::BulkError;
use super::handle::BulkHandle;
use super::listener::{BulkRetrievalEvent, BulkRetrievalListener, FailureReason, RetrievalOutcome};
use super::progress::{ProgressSnapshot, RetrievalProgress};
use super::state::BulkState;
use crate::coord::{MercatorSector, Sector};
use crate::layer::TiledLayer;
use crate::level::{Level, Tile};
use crate::probe::MissingTileProbe;
use crate::region::RegionGrid;
use crate::retrieval::{CompletionHandler, FetchError, RetrievalRequest, RetrievalService};

/// How a bulk run ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BulkOutcome {
    /// [`BulkState::Completed`] or [`BulkState::Cancelled`].
    pub state: BulkState,
    pub progress: ProgressSnapshot,
}

type Listeners = Arc<Vec<Arc<dyn BulkRetrievalListener>>>;

/// Tiles of the current region handed to the retrieval service.
#[derive(Default)]
struct InFlight {
    tiles: Mutex<HashSet<Tile>>,
    finished: Notify,
}

impl InFlight {
    fn insert(&self, tile: Tile) {
        self.tiles.lock().insert(tile);
    }

    fn finish(&self, tile: &Tile) {
        self.tiles.lock().remove(tile);
        self.finished.notify_one();
    }

    fn is_empty(&self) -> bool {
        self.tiles.lock().is_empty()
    }
}

/// Scheduler of one bulk run over a sector and target level.
pub struct BulkScheduler {
    layer: Arc<TiledLayer>,
    retrieval: Arc<dyn RetrievalService>,
    probe: MissingTileProbe,
    sector: MercatorSector,
    target_level: u32,
    config: BulkConfig,
    progress: Arc<RetrievalProgress>,
    listeners: Vec<Arc<dyn BulkRetrievalListener>>,
    state: watch::Sender<BulkState>,
}

impl BulkScheduler {
    /// Creates a scheduler.
    ///
    /// # Arguments
    ///
    /// * `layer` - Layer whose pyramid, cache and URL builder are used
    /// * `retrieval` - Service executing the fetches
    /// * `sector` - Area to bring into the cache
    /// * `target_level` - Finest level to retrieve; all coarser non-empty
    ///   levels are retrieved too
    /// * `config` - Scheduler tuning
    pub fn new(
        layer: Arc<TiledLayer>,
        retrieval: Arc<dyn RetrievalService>,
        sector: &Sector,
        target_level: u32,
        config: BulkConfig,
    ) -> Self {
        let probe = layer.probe();
        let (state, _) = watch::channel(BulkState::Initializing);
        Self {
            layer,
            retrieval,
            probe,
            sector: MercatorSector::from_sector(sector),
            target_level,
            config,
            progress: Arc::new(RetrievalProgress::new()),
            listeners: Vec::new(),
            state,
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn BulkRetrievalListener>) {
        self.listeners.push(listener);
    }

    pub fn progress(&self) -> Arc<RetrievalProgress> {
        Arc::clone(&self.progress)
    }

    /// Receiver observing state transitions.
    pub fn subscribe(&self) -> watch::Receiver<BulkState> {
        self.state.subscribe()
    }

    /// Runs the scheduler on a new tokio task.
    pub fn spawn(self, cancel: CancellationToken) -> BulkHandle {
        let progress = self.progress();
        let state = self.subscribe();
        let task = tokio::spawn(self.run(cancel.clone()));
        BulkHandle::new(progress, state, cancel, task)
    }

    /// Runs the bulk retrieval to completion or cancellation.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the run to [`BulkState::Failed`].
    /// Cancellation is not an error; it yields [`BulkState::Cancelled`].
    pub async fn run(self, cancel: CancellationToken) -> Result<BulkOutcome, BulkError> {
        let listeners: Listeners = Arc::new(self.listeners.clone());

        match self.execute(&listeners, &cancel).await {
            Ok(()) => {
                self.progress.complete();
                self.state.send_replace(BulkState::Completed);
                let progress = self.progress.snapshot();
                info!(
                    layer = %self.layer.name(),
                    retrieved = progress.current_count,
                    failed = progress.failed_count,
                    "Bulk retrieval completed"
                );
                Ok(BulkOutcome {
                    state: BulkState::Completed,
                    progress,
                })
            }
            Err(BulkError::Cancelled) => {
                self.state.send_replace(BulkState::Cancelled);
                let progress = self.progress.snapshot();
                info!(
                    layer = %self.layer.name(),
                    retrieved = progress.current_count,
                    "Bulk retrieval cancelled"
                );
                Ok(BulkOutcome {
                    state: BulkState::Cancelled,
                    progress,
                })
            }
            Err(e) => {
                self.state.send_replace(BulkState::Failed);
                error!(layer = %self.layer.name(), error = %e, "Bulk retrieval failed");
                Err(e)
            }
        }
    }

    async fn execute(&self, listeners: &Listeners, cancel: &CancellationToken) -> Result<(), BulkError> {
        self.initialize(cancel).await?;
        self.state.send_replace(BulkState::Running);

        let levels = Arc::clone(self.layer.levels());
        for level in levels.retrievable_levels(self.target_level) {
            let grid = RegionGrid::for_level(level, self.sector, self.config.max_tiles_per_region);
            debug!(
                level = level.number(),
                divisions = grid.divisions(),
                "Sweeping level"
            );

            let mut attempted = HashSet::new();
            for region in grid.iter() {
                if cancel.is_cancelled() {
                    return Err(BulkError::Cancelled);
                }
                self.retrieve_region(level, &region, &mut attempted, listeners, cancel)
                    .await?;
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    async fn initialize(&self, cancel: &CancellationToken) -> Result<(), BulkError> {
        let layer = Arc::clone(&self.layer);
        let sector = self.sector;
        let target_level = self.target_level;
        let samples = self.config.progress_samples;
        let mut rng = self.config.rng();
        let token = cancel.clone();

        let (average_tile_size, estimate) = run_blocking(cancel, move || {
            let average_tile_size = layer.average_tile_size();
            let estimate = layer.estimator().estimate_missing(
                &sector,
                target_level,
                samples,
                &mut rng,
                &token,
            )?;
            Ok((average_tile_size, estimate))
        })
        .await?;
        self.progress.initialize(estimate, average_tile_size);

        info!(
            layer = %self.layer.name(),
            level = self.target_level,
            estimated_tiles = estimate,
            average_tile_size,
            "Bulk retrieval initialized"
        );
        Ok(())
    }

    async fn retrieve_region(
        &self,
        level: &Level,
        region: &MercatorSector,
        attempted: &mut HashSet<Tile>,
        listeners: &Listeners,
        cancel: &CancellationToken,
    ) -> Result<(), BulkError> {
        let probe = self.probe.clone();
        let (region, number, token) = (*region, level.number(), cancel.clone());
        let missing =
            run_blocking(cancel, move || probe.missing_tiles(&region, number, &token)).await?;
        // Cached regions change no counter.
        self.progress.record_activity();

        let mut pending: VecDeque<Tile> = missing
            .into_iter()
            .filter(|tile| !attempted.contains(tile))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let in_flight = Arc::new(InFlight::default());
        loop {
            self.submit_available(level, &mut pending, attempted, &in_flight, listeners, cancel)
                .await?;
            if pending.is_empty() && in_flight.is_empty() {
                return Ok(());
            }
            self.wait(&in_flight, cancel).await?;
        }
    }

    /// Submits pending tiles while the retrieval service has capacity.
    async fn submit_available(
        &self,
        level: &Level,
        pending: &mut VecDeque<Tile>,
        attempted: &mut HashSet<Tile>,
        in_flight: &Arc<InFlight>,
        listeners: &Listeners,
        cancel: &CancellationToken,
    ) -> Result<(), BulkError> {
        while !pending.is_empty() {
            if cancel.is_cancelled() {
                return Err(BulkError::Cancelled);
            }
            if !self.retrieval.is_available() {
                break;
            }
            let Some(tile) = pending.pop_front() else {
                break;
            };

            let key = level.cache_key(&tile);
            if self.layer.absent().is_absent(&key) {
                self.progress.record_absent();
                continue;
            }
            if self.is_local(&key, cancel).await? {
                self.progress.record_retrieved();
                continue;
            }

            attempted.insert(tile);
            let Some(url) = self.layer.url_builder().build_url(level, &tile) else {
                warn!(tile = %tile, "No URL for tile");
                self.progress.record_failed();
                notify(
                    listeners,
                    &BulkRetrievalEvent {
                        tile,
                        url: None,
                        outcome: RetrievalOutcome::Failed(FailureReason::NoUrl),
                    },
                );
                continue;
            };

            in_flight.insert(tile);
            let handler = self.completion_handler(tile, key, url.clone(), in_flight, listeners);
            self.retrieval.submit(RetrievalRequest { tile, url }, handler);
        }
        Ok(())
    }

    async fn is_local(&self, key: &str, cancel: &CancellationToken) -> Result<bool, BulkError> {
        let store = Arc::clone(self.layer.store());
        let expiry = self.layer.expiry();
        let key = key.to_string();
        run_blocking(cancel, move || Ok(store.is_local(&key, expiry)?)).await
    }

    async fn wait(&self, in_flight: &InFlight, cancel: &CancellationToken) -> Result<(), BulkError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(BulkError::Cancelled),
            _ = in_flight.finished.notified() => Ok(()),
            _ = self.retrieval.capacity_released() => Ok(()),
            _ = tokio::time::sleep(self.config.poll_interval) => Ok(()),
        }
    }

    fn completion_handler(
        &self,
        tile: Tile,
        key: String,
        url: String,
        in_flight: &Arc<InFlight>,
        listeners: &Listeners,
    ) -> CompletionHandler {
        let store = Arc::clone(self.layer.store());
        let absent = Arc::clone(self.layer.absent());
        let progress = Arc::clone(&self.progress);
        let in_flight = Arc::clone(in_flight);
        let listeners = Arc::clone(listeners);
        let runtime = tokio::runtime::Handle::current();

        // The write happens on the blocking pool; the tile leaves the
        // in-flight set only after progress and listeners have seen it.
        Box::new(move |result| {
            runtime.spawn_blocking(move || {
                let outcome = match result {
                    Ok(bytes) => match store.store(&key, &bytes) {
                        Ok(()) => {
                            absent.unmark(&key);
                            progress.record_retrieved();
                            RetrievalOutcome::Succeeded
                        }
                        Err(e) => {
                            warn!(tile = %tile, error = %e, "Failed to store tile");
                            progress.record_failed();
                            RetrievalOutcome::Failed(FailureReason::Store(e.to_string()))
                        }
                    },
                    Err(FetchError::NotFound) => {
                        absent.mark_absent(&key);
                        progress.record_absent();
                        RetrievalOutcome::Failed(FailureReason::Absent)
                    }
                    Err(e) => {
                        debug!(tile = %tile, url = %url, error = %e, "Tile retrieval failed");
                        progress.record_failed();
                        RetrievalOutcome::Failed(FailureReason::Fetch(e.to_string()))
                    }
                };

                notify(
                    &listeners,
                    &BulkRetrievalEvent {
                        tile,
                        url: Some(url),
                        outcome,
                    },
                );
                in_flight.finish(&tile);
            });
        })
    }
}

/// Runs cache-bound work on the blocking pool.
///
/// Returns [`BulkError::Cancelled`] as soon as `cancel` fires; the work itself
/// observes the same token at its next tile check.
async fn run_blocking<T, F>(cancel: &CancellationToken, work: F) -> Result<T, BulkError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BulkError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    tokio::select! {
        _ = cancel.cancelled() => Err(BulkError::Cancelled),
        joined = task => joined.map_err(|e| BulkError::TaskFailed(e.to_string()))?,
    }
}

fn notify(listeners: &Listeners, event: &BulkRetrievalEvent) {
    for listener in listeners.iter() {
        listener.on_event(event);
    }
}
