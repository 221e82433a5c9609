//! Integration tests for bulk synchronization.
//!
//! These tests drive the scheduler end to end against an in-memory tile
//! store and fake retrieval services:
//! - missing tiles are fetched exactly once, cached and absent ones skipped
//! - the concurrency ceiling of the retrieval service is respected
//! - cancellation stops submissions at the next cancellation point
//! - not-found responses mark tiles absent and shrink the totals
//! - tiles without a URL and transient failures stay missing for a later run
//! - a slow tile store neither stalls the runtime nor delays cancellation
//!
//! Run with: `cargo test --test bulk_sync`

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use bytes::Bytes;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use tilesync::bulk::{
    BulkConfig, BulkRetrievalEvent, BulkScheduler, BulkState, FailureReason, RetrievalOutcome,
};
use tilesync::cache::{AbsentRegistry, AbsentResourceList, MemoryTileStore, StoreError, TileStore};
use tilesync::coord::{MercatorSector, Sector};
use tilesync::layer::TiledLayer;
use tilesync::level::{Level, LevelSet, LevelSetConfig, Tile};
use tilesync::provider::{TemplateUrlBuilder, TileScheme, TileUrlBuilder};
use tilesync::retrieval::{
    BoxFuture, CompletionHandler, FetchError, PooledRetrievalService, RetrievalRequest,
    RetrievalService, TileFetcher,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Level-2 tile block used by most tests: rows and columns 16..20.
const BLOCK_MIN: u32 = 16;
const BLOCK_SIZE: u32 = 4;

struct Fixture {
    layer: Arc<TiledLayer>,
    store: Arc<MemoryTileStore>,
    absent: Arc<AbsentResourceList>,
}

impl Fixture {
    /// Three levels, the first two empty: only level 2 is retrieved.
    fn new() -> Self {
        Self::with_levels(3, 2)
    }

    fn with_levels(num_levels: u32, num_empty_levels: u32) -> Self {
        Self::build(
            num_levels,
            num_empty_levels,
            |store| store as Arc<dyn TileStore>,
            Arc::new(template_builder()),
        )
    }

    /// Layer whose cache is `wrap` applied to the fixture's memory store.
    fn build(
        num_levels: u32,
        num_empty_levels: u32,
        wrap: impl FnOnce(Arc<MemoryTileStore>) -> Arc<dyn TileStore>,
        builder: Arc<dyn TileUrlBuilder>,
    ) -> Self {
        let levels = LevelSet::new(LevelSetConfig {
            cache_name: "test".to_string(),
            num_levels,
            num_empty_levels,
            ..Default::default()
        });
        let store = Arc::new(MemoryTileStore::new());
        let absent = Arc::new(AbsentResourceList::default());
        let layer = Arc::new(TiledLayer::new(
            "test",
            levels,
            builder,
            wrap(Arc::clone(&store)),
            Arc::clone(&absent) as Arc<dyn AbsentRegistry>,
        ));
        Self {
            layer,
            store,
            absent,
        }
    }

    fn key(&self, tile: &Tile) -> String {
        self.layer
            .levels()
            .level(tile.level)
            .unwrap()
            .cache_key(tile)
    }

    fn block_tiles(&self) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for row in BLOCK_MIN..BLOCK_MIN + BLOCK_SIZE {
            for col in BLOCK_MIN..BLOCK_MIN + BLOCK_SIZE {
                tiles.push(Tile::new(2, row, col));
            }
        }
        tiles
    }

    /// Geographic sector covering exactly the level-2 block.
    fn block_sector(&self) -> Sector {
        self.square_sector(2, BLOCK_MIN, BLOCK_SIZE)
    }

    /// Geographic sector covering `size × size` tiles of `level` from
    /// `(first, first)`.
    fn square_sector(&self, level: u32, first: u32, size: u32) -> Sector {
        let level = self.layer.levels().level(level).unwrap();
        let sw = level.footprint(&Tile::new(level.number(), first, first));
        let ne = level.footprint(&Tile::new(
            level.number(),
            first + size - 1,
            first + size - 1,
        ));
        MercatorSector::new(sw.min_y(), ne.max_y(), sw.min_lon(), ne.max_lon()).to_geographic()
    }

    fn cache(&self, tile: &Tile) {
        self.store.store(&self.key(tile), b"cached").unwrap();
    }
}

fn template_builder() -> TemplateUrlBuilder {
    TemplateUrlBuilder::new(
        "test",
        "https://tiles.test/{z}/{x}/{y}.png",
        TileScheme::XYZ,
    )
    .unwrap()
}

fn config() -> BulkConfig {
    BulkConfig::default()
        .with_seed(1)
        .with_poll_interval(Duration::from_millis(20))
}

/// Retrieval service completing every request on a tokio task after a short
/// delay, with a fixed concurrency ceiling.
struct FakeService {
    ceiling: usize,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    submitted: Mutex<Vec<Tile>>,
    released: Arc<Notify>,
    not_found: HashSet<Tile>,
    timeouts: HashSet<Tile>,
    cancel_at: Option<(usize, CancellationToken)>,
}

impl FakeService {
    fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            submitted: Mutex::new(Vec::new()),
            released: Arc::new(Notify::new()),
            not_found: HashSet::new(),
            timeouts: HashSet::new(),
            cancel_at: None,
        }
    }

    fn with_not_found(mut self, tiles: impl IntoIterator<Item = Tile>) -> Self {
        self.not_found.extend(tiles);
        self
    }

    fn with_timeouts(mut self, tiles: impl IntoIterator<Item = Tile>) -> Self {
        self.timeouts.extend(tiles);
        self
    }

    /// Cancels `token` when the `n`th request is submitted.
    fn cancel_at(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_at = Some((n, token));
        self
    }

    fn submitted(&self) -> Vec<Tile> {
        self.submitted.lock().unwrap().clone()
    }
}

impl RetrievalService for FakeService {
    fn is_available(&self) -> bool {
        self.active.load(Ordering::SeqCst) < self.ceiling
    }

    fn submit(&self, request: RetrievalRequest, on_complete: CompletionHandler) {
        let count = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(request.tile);
            submitted.len()
        };
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        if let Some((n, token)) = &self.cancel_at {
            if count == *n {
                token.cancel();
            }
        }

        let result = if self.not_found.contains(&request.tile) {
            Err(FetchError::NotFound)
        } else if self.timeouts.contains(&request.tile) {
            Err(FetchError::Timeout)
        } else {
            Ok(Bytes::from(request.url.into_bytes()))
        };
        let active = Arc::clone(&self.active);
        let released = Arc::clone(&self.released);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            on_complete(result);
            active.fetch_sub(1, Ordering::SeqCst);
            released.notify_waiters();
        });
    }

    fn capacity_released(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.released.notified())
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// 16-tile block with 6 cached and 2 absent: only the other 8 are fetched.
#[tokio::test]
async fn test_fetches_only_missing_tiles() {
    let fixture = Fixture::new();
    let tiles = fixture.block_tiles();
    for tile in &tiles[..6] {
        fixture.cache(tile);
    }
    for tile in &tiles[6..8] {
        fixture.absent.mark_absent(&fixture.key(tile));
    }

    let service = Arc::new(FakeService::new(2));
    let scheduler = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &fixture.block_sector(),
        2,
        config(),
    );
    let outcome = scheduler.run(CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.state, BulkState::Completed);
    let submitted = service.submitted();
    assert_eq!(submitted.len(), 8);
    let expected: HashSet<Tile> = tiles[8..].iter().copied().collect();
    assert_eq!(submitted.iter().copied().collect::<HashSet<_>>(), expected);

    assert_eq!(outcome.progress.current_count, 8);
    assert_eq!(outcome.progress.total_count, 8);
    assert!(service.max_active.load(Ordering::SeqCst) <= 2);

    for tile in &tiles[8..] {
        assert!(fixture.store.contains(&fixture.key(tile)).unwrap());
    }
}

/// Cancelling during the third submission stops the run before a fourth.
#[tokio::test]
async fn test_cancellation_stops_submissions() {
    let fixture = Fixture::new();
    let cancel = CancellationToken::new();
    let service = Arc::new(FakeService::new(2).cancel_at(3, cancel.clone()));

    let scheduler = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &fixture.block_sector(),
        2,
        config(),
    );
    let state = scheduler.subscribe();
    let progress = scheduler.progress();
    let outcome = scheduler.run(cancel).await.unwrap();

    assert_eq!(outcome.state, BulkState::Cancelled);
    assert_eq!(*state.borrow(), BulkState::Cancelled);
    assert_eq!(service.submitted().len(), 3);

    // Fetches in flight at cancellation still land in the cache and progress.
    tokio::time::timeout(Duration::from_secs(2), async {
        while progress.snapshot().current_count < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("in-flight completions recorded");
    assert_eq!(progress.snapshot().current_count, 3);
    for tile in service.submitted() {
        assert!(fixture.store.contains(&fixture.key(&tile)).unwrap());
    }
}

/// Cancelling before the run starts submits nothing.
#[tokio::test]
async fn test_cancelled_before_start() {
    let fixture = Fixture::new();
    let service = Arc::new(FakeService::new(4));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &fixture.block_sector(),
        2,
        config(),
    )
    .run(cancel)
    .await
    .unwrap();

    assert_eq!(outcome.state, BulkState::Cancelled);
    assert!(service.submitted().is_empty());
}

/// Not-found responses mark tiles absent, emit failure events and shrink the
/// expected total.
#[tokio::test]
async fn test_not_found_marks_absent() {
    let fixture = Fixture::new();
    let tiles = fixture.block_tiles();
    let missing: Vec<Tile> = tiles[..3].to_vec();
    let service = Arc::new(FakeService::new(3).with_not_found(missing.clone()));

    let events = Arc::new(Mutex::new(Vec::<BulkRetrievalEvent>::new()));
    let sink = Arc::clone(&events);

    let mut scheduler = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &fixture.block_sector(),
        2,
        config(),
    );
    scheduler.add_listener(Arc::new(move |event: &BulkRetrievalEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    let outcome = scheduler.run(CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.state, BulkState::Completed);
    assert_eq!(outcome.progress.current_count, 13);
    assert_eq!(outcome.progress.total_count, 13);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 16);
    assert_eq!(events.iter().filter(|e| e.is_success()).count(), 13);
    for event in events.iter().filter(|e| !e.is_success()) {
        assert!(missing.contains(&event.tile));
        assert!(matches!(event.outcome, RetrievalOutcome::Failed(_)));
        assert!(event.url.is_some());
    }
    for tile in &missing {
        assert!(fixture.absent.is_absent(&fixture.key(tile)));
    }
}

/// Tiles the URL builder cannot address fail once and are never submitted.
#[tokio::test]
async fn test_tiles_without_url_fail_once() {
    let tiles = Fixture::new().block_tiles();
    let holes: HashSet<Tile> = [tiles[0], tiles[5]].into_iter().collect();
    let fixture = Fixture::build(
        3,
        2,
        |store| store as Arc<dyn TileStore>,
        Arc::new(PartialBuilder {
            inner: template_builder(),
            holes: holes.clone(),
        }),
    );
    let service = Arc::new(FakeService::new(2));

    let events = Arc::new(Mutex::new(Vec::<BulkRetrievalEvent>::new()));
    let sink = Arc::clone(&events);
    let mut scheduler = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &fixture.block_sector(),
        2,
        config().with_max_tiles_per_region(2),
    );
    scheduler.add_listener(Arc::new(move |event: &BulkRetrievalEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    let outcome = scheduler.run(CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.state, BulkState::Completed);
    assert_eq!(outcome.progress.failed_count, 2);
    assert_eq!(outcome.progress.current_count, 14);

    let submitted = service.submitted();
    assert_eq!(submitted.len(), 14);
    assert!(submitted.iter().all(|tile| !holes.contains(tile)));

    let events = events.lock().unwrap();
    let no_url: Vec<&BulkRetrievalEvent> = events
        .iter()
        .filter(|e| e.outcome == RetrievalOutcome::Failed(FailureReason::NoUrl))
        .collect();
    assert_eq!(no_url.len(), 2);
    assert!(no_url.iter().all(|e| e.url.is_none() && holes.contains(&e.tile)));
    assert_ne!(no_url[0].tile, no_url[1].tile);

    for tile in &holes {
        assert!(!fixture.absent.is_absent(&fixture.key(tile)));
        assert!(!fixture.store.contains(&fixture.key(tile)).unwrap());
    }
}

/// Transient fetch failures are counted but leave the tile missing, not
/// absent, so the next run tries again.
#[tokio::test]
async fn test_transient_failures_stay_missing() {
    let fixture = Fixture::new();
    let tiles = fixture.block_tiles();
    let flaky: Vec<Tile> = tiles[..2].to_vec();
    let service = Arc::new(FakeService::new(2).with_timeouts(flaky.clone()));
    let sector = fixture.block_sector();

    let events = Arc::new(Mutex::new(Vec::<BulkRetrievalEvent>::new()));
    let sink = Arc::clone(&events);
    let mut scheduler = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &sector,
        2,
        config(),
    );
    scheduler.add_listener(Arc::new(move |event: &BulkRetrievalEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    let outcome = scheduler.run(CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.state, BulkState::Completed);
    assert_eq!(outcome.progress.failed_count, 2);
    assert_eq!(outcome.progress.current_count, 14);
    assert_eq!(service.submitted().len(), 16);

    let events = events.lock().unwrap();
    let failed: Vec<&BulkRetrievalEvent> = events.iter().filter(|e| !e.is_success()).collect();
    assert_eq!(failed.len(), 2);
    assert!(failed
        .iter()
        .all(|e| matches!(e.outcome, RetrievalOutcome::Failed(FailureReason::Fetch(_)))));

    for tile in &flaky {
        assert!(!fixture.absent.is_absent(&fixture.key(tile)));
    }
    let missing = fixture
        .layer
        .probe()
        .missing_tiles(&MercatorSector::from_sector(&sector), 2, &CancellationToken::new())
        .unwrap();
    assert_eq!(
        missing.into_iter().collect::<HashSet<_>>(),
        flaky.into_iter().collect::<HashSet<_>>()
    );
}

/// Multi-level run split into many regions fetches every tile exactly once,
/// coarse levels first.
#[tokio::test]
async fn test_regions_cover_every_level_once() {
    let fixture = Fixture::with_levels(4, 1);
    let service = Arc::new(FakeService::new(4));
    let sector = fixture.block_sector();

    let scheduler = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &sector,
        3,
        config().with_max_tiles_per_region(5),
    );
    let outcome = scheduler.run(CancellationToken::new()).await.unwrap();
    assert_eq!(outcome.state, BulkState::Completed);

    let submitted = service.submitted();
    let unique: HashSet<Tile> = submitted.iter().copied().collect();
    assert_eq!(unique.len(), submitted.len(), "no tile submitted twice");

    let mercator = MercatorSector::from_sector(&sector);
    let expected: u64 = (1..=3)
        .map(|n| fixture.layer.levels().tile_count(&mercator, n))
        .sum();
    assert_eq!(submitted.len() as u64, expected);
    assert!(submitted.iter().all(|t| t.level >= 1));
    assert!(submitted.windows(2).all(|w| w[0].level <= w[1].level));
}

/// A second run over a fully synced sector has nothing to do.
#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let fixture = Fixture::new();
    let sector = fixture.block_sector();
    let run = |service: Arc<FakeService>| {
        BulkScheduler::new(
            Arc::clone(&fixture.layer),
            service as Arc<dyn RetrievalService>,
            &sector,
            2,
            config(),
        )
        .run(CancellationToken::new())
    };

    let first = Arc::new(FakeService::new(2));
    run(Arc::clone(&first)).await.unwrap();
    assert_eq!(first.submitted().len(), 16);
    assert_eq!(fixture.store.len(), 16);

    let second = Arc::new(FakeService::new(2));
    let outcome = run(Arc::clone(&second)).await.unwrap();
    assert_eq!(outcome.state, BulkState::Completed);
    assert!(second.submitted().is_empty());
    assert_eq!(outcome.progress.total_count, 0);
    assert_eq!(outcome.progress.ratio(), 1.0);
}

// ============================================================================
// Pooled retrieval
// ============================================================================

/// Fetcher answering 404 for URLs containing a marker.
struct MarkerFetcher {
    marker: String,
    calls: AtomicUsize,
}

impl TileFetcher for MarkerFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if url.contains(&self.marker) {
            Err(FetchError::NotFound)
        } else {
            Ok(Bytes::from_static(b"tile"))
        };
        async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            result
        }
    }
}

/// `make_local` through the semaphore pool brings the block into the cache.
#[tokio::test]
async fn test_make_local_with_pooled_service() {
    let fixture = Fixture::new();
    let level = fixture.layer.levels().level(2).unwrap().clone();
    let resolution = level.texel_size();

    // Column 17 of level 2 does not exist remotely.
    let pool = Arc::new(PooledRetrievalService::new(
        MarkerFetcher {
            marker: "/17/".to_string(),
            calls: AtomicUsize::new(0),
        },
        3,
    ));

    let handle = fixture
        .layer
        .make_local(
            &fixture.block_sector(),
            resolution,
            Arc::clone(&pool) as Arc<dyn RetrievalService>,
            config(),
            None,
        )
        .expect("sector overlaps the layer");
    let outcome = handle.wait().await.unwrap();

    assert_eq!(outcome.state, BulkState::Completed);
    assert_eq!(outcome.progress.current_count, 12);
    assert_eq!(fixture.store.len(), 12);
    assert_eq!(pool.stats().submitted, 16);
    for row in BLOCK_MIN..BLOCK_MIN + BLOCK_SIZE {
        assert!(fixture.absent.is_absent(&fixture.key(&Tile::new(2, row, 17))));
    }
}

/// Sectors outside the layer coverage start nothing.
#[tokio::test]
async fn test_make_local_outside_coverage() {
    let levels = LevelSet::new(LevelSetConfig {
        num_levels: 3,
        coverage: Sector::from_degrees(10.0, 20.0, 10.0, 20.0).unwrap(),
        ..Default::default()
    });
    let layer = Arc::new(TiledLayer::new(
        "partial",
        levels,
        Arc::new(
            TemplateUrlBuilder::new("partial", "https://t.test/{z}/{x}/{y}", TileScheme::XYZ)
                .unwrap(),
        ),
        Arc::new(MemoryTileStore::new()),
        Arc::new(AbsentResourceList::default()),
    ));
    let service = Arc::new(FakeService::new(1));

    let handle = layer.make_local(
        &Sector::from_degrees(-40.0, -30.0, 10.0, 20.0).unwrap(),
        1e-6,
        service,
        config(),
        None,
    );
    assert!(handle.is_none());
}

/// A spawned run reports its progress through the handle and can be
/// cancelled from outside.
#[tokio::test]
async fn test_handle_cancel() {
    let fixture = Fixture::new();
    let service = Arc::new(SlowService::default());

    let handle = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &fixture.block_sector(),
        2,
        config(),
    )
    .spawn(CancellationToken::new());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(handle.state(), BulkState::Running);
    assert_eq!(handle.snapshot().total_count, 16);

    handle.cancel();
    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.state, BulkState::Cancelled);
    assert_eq!(service.submitted.load(Ordering::SeqCst), 1);
}

/// Accepts one request and never completes it.
#[derive(Default)]
struct SlowService {
    submitted: AtomicUsize,
}

impl RetrievalService for SlowService {
    fn is_available(&self) -> bool {
        self.submitted.load(Ordering::SeqCst) == 0
    }

    fn submit(&self, _request: RetrievalRequest, on_complete: CompletionHandler) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        // Never completes.
        std::mem::forget(on_complete);
    }
}

// ============================================================================
// Slow caches
// ============================================================================

/// Memory store whose existence checks block for a fixed delay.
struct SlowStore {
    inner: Arc<MemoryTileStore>,
    delay: Duration,
}

impl TileStore for SlowStore {
    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.contains(key)
    }

    fn is_expired(&self, key: &str, expiry: Option<SystemTime>) -> Result<bool, StoreError> {
        self.inner.is_expired(key, expiry)
    }

    fn store(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.inner.store(key, data)
    }

    fn average_file_size(&self, dir: &str, max_subdirs: usize) -> Result<Option<u64>, StoreError> {
        self.inner.average_file_size(dir, max_subdirs)
    }
}

fn slow(delay: Duration) -> impl FnOnce(Arc<MemoryTileStore>) -> Arc<dyn TileStore> {
    move |inner| Arc::new(SlowStore { inner, delay }) as Arc<dyn TileStore>
}

/// URL builder with no URL for some tiles.
struct PartialBuilder {
    inner: TemplateUrlBuilder,
    holes: HashSet<Tile>,
}

impl TileUrlBuilder for PartialBuilder {
    fn name(&self) -> &str {
        "partial"
    }

    fn build_url(&self, level: &Level, tile: &Tile) -> Option<String> {
        if self.holes.contains(tile) {
            None
        } else {
            self.inner.build_url(level, tile)
        }
    }
}

/// Store checks run off the runtime threads: timers keep firing and
/// cancellation takes effect while the estimate is still probing.
#[tokio::test]
async fn test_slow_store_does_not_block_cancellation() {
    // Only level 4 is retrieved: 256 tiles at 5 ms per check.
    let fixture = Fixture::build(
        5,
        4,
        slow(Duration::from_millis(5)),
        Arc::new(template_builder()),
    );
    let service = Arc::new(FakeService::new(4));

    let handle = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &fixture.square_sector(4, 64, 16),
        4,
        config(),
    )
    .spawn(CancellationToken::new());

    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(
        started.elapsed() < Duration::from_millis(300),
        "runtime stalled for {:?}",
        started.elapsed()
    );

    let cancelled_at = Instant::now();
    handle.cancel();
    let outcome = tokio::time::timeout(Duration::from_millis(500), handle.wait())
        .await
        .expect("run stops promptly")
        .unwrap();
    assert_eq!(outcome.state, BulkState::Cancelled);
    assert!(cancelled_at.elapsed() < Duration::from_millis(500));
    assert!(service.submitted().is_empty());
}

/// Sweeping an already cached sector keeps the progress timestamp fresh, so
/// a stall watchdog does not mistake it for a hang.
#[tokio::test]
async fn test_cached_sweep_reports_activity() {
    let fixture = Fixture::build(
        3,
        2,
        slow(Duration::from_millis(10)),
        Arc::new(template_builder()),
    );
    for tile in fixture.block_tiles() {
        fixture.cache(&tile);
    }
    let service = Arc::new(FakeService::new(2));

    // One tile per region: 16 regions of about 10 ms each.
    let handle = BulkScheduler::new(
        Arc::clone(&fixture.layer),
        Arc::clone(&service) as Arc<dyn RetrievalService>,
        &fixture.block_sector(),
        2,
        config().with_max_tiles_per_region(1),
    )
    .spawn(CancellationToken::new());

    let mut longest = Duration::ZERO;
    let mut running_samples = 0;
    while !handle.is_finished() {
        if handle.state() == BulkState::Running {
            running_samples += 1;
            longest = longest.max(handle.snapshot().stalled_for());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let outcome = handle.wait().await.unwrap();
    assert_eq!(outcome.state, BulkState::Completed);
    assert!(service.submitted().is_empty());
    assert!(running_samples > 0);
    assert!(longest < Duration::from_millis(80), "no activity for {:?}", longest);
}
