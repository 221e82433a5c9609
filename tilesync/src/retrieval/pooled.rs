//! Semaphore-bounded retrieval pool.
//!
//! Each accepted request runs on its own tokio task holding one permit of a
//! shared semaphore; the permit count is the concurrency ceiling. The permit
//! is released as soon as the fetch ends, before the completion handler runs,
//! and each release stores a wakeup for
//! [`RetrievalService::capacity_released`] even when nobody is waiting yet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use super::http::TileFetcher;
use super::types::{BoxFuture, CompletionHandler, FetchError, RetrievalRequest, RetrievalService};

/// Default concurrency ceiling.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Counters of a pool, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Retrieval service running fetches on tokio tasks under a permit limit.
///
/// Must be used from within a tokio runtime.
pub struct PooledRetrievalService<F: TileFetcher> {
    fetcher: Arc<F>,
    permits: Arc<Semaphore>,
    capacity: usize,
    released: Arc<Notify>,
    counters: Arc<PoolCounters>,
}

impl<F: TileFetcher> PooledRetrievalService<F> {
    /// Creates a pool allowing `capacity` concurrent fetches (at least 1).
    pub fn new(fetcher: F, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            fetcher: Arc::new(fetcher),
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            released: Arc::new(Notify::new()),
            counters: Arc::new(PoolCounters::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of fetches currently holding a permit.
    pub fn active(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Stops accepting work; queued requests complete with [`FetchError::Closed`].
    pub fn shutdown(&self) {
        self.permits.close();
        self.released.notify_waiters();
    }
}

impl<F: TileFetcher> RetrievalService for PooledRetrievalService<F> {
    fn is_available(&self) -> bool {
        !self.permits.is_closed() && self.permits.available_permits() > 0
    }

    fn submit(&self, request: RetrievalRequest, on_complete: CompletionHandler) {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let immediate = Arc::clone(&self.permits).try_acquire_owned().ok();
        let permits = Arc::clone(&self.permits);
        let fetcher = Arc::clone(&self.fetcher);
        let released = Arc::clone(&self.released);
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            let permit: OwnedSemaphorePermit = match immediate {
                Some(permit) => permit,
                None => match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        on_complete(Err(FetchError::Closed));
                        return;
                    }
                },
            };

            let result = fetcher.fetch(&request.url).await;
            match &result {
                Ok(_) => counters.succeeded.fetch_add(1, Ordering::Relaxed),
                Err(e) => {
                    debug!(tile = %request.tile, url = %request.url, error = %e, "Fetch failed");
                    counters.failed.fetch_add(1, Ordering::Relaxed)
                }
            };

            drop(permit);
            released.notify_one();
            on_complete(result);
        });
    }

    fn capacity_released(&self) -> BoxFuture<'_, ()> {
        let released = Arc::clone(&self.released);
        Box::pin(async move { released.notified().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Tile;
    use bytes::Bytes;
    use std::future::Future;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Fetcher that tracks peak concurrency.
    struct SlowFetcher {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TileFetcher for SlowFetcher {
        fn fetch(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send {
            let not_found = url.ends_with("404");
            async move {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                if not_found {
                    Err(FetchError::NotFound)
                } else {
                    Ok(Bytes::from_static(b"tile"))
                }
            }
        }
    }

    fn request(i: u32, suffix: &str) -> RetrievalRequest {
        RetrievalRequest {
            tile: Tile::new(1, 0, i),
            url: format!("http://tiles/{}/{}", i, suffix),
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = PooledRetrievalService::new(
            SlowFetcher {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            3,
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        for i in 0..10 {
            let tx = tx.clone();
            pool.submit(
                request(i, "ok"),
                Box::new(move |result| {
                    let _ = tx.send(result);
                }),
            );
        }
        drop(tx);

        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }

        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(pool.fetcher.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(
            pool.stats(),
            PoolStats {
                submitted: 10,
                succeeded: 10,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_availability_tracks_permits() {
        let pool = PooledRetrievalService::new(
            SlowFetcher {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            1,
        );
        assert!(pool.is_available());

        let (tx, mut rx) = mpsc::unbounded_channel();
        pool.submit(
            request(0, "404"),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        assert!(!pool.is_available());
        assert_eq!(pool.active(), 1);

        let result = rx.recv().await.unwrap();
        assert_eq!(result, Err(FetchError::NotFound));

        tokio::time::timeout(Duration::from_secs(1), async {
            while !pool.is_available() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_release_without_waiter_is_not_lost() {
        let pool = PooledRetrievalService::new(
            SlowFetcher {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            1,
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        pool.submit(
            request(0, "ok"),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );

        // Nobody waits on capacity while the fetch runs and ends.
        assert!(rx.recv().await.unwrap().is_ok());
        assert!(pool.is_available());

        tokio::time::timeout(Duration::from_millis(50), pool.capacity_released())
            .await
            .expect("release is remembered for the next waiter");
    }

    #[tokio::test]
    async fn test_shutdown_completes_queued_requests() {
        let pool = PooledRetrievalService::new(
            SlowFetcher {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            1,
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        for i in 0..3 {
            let tx = tx.clone();
            pool.submit(
                request(i, "ok"),
                Box::new(move |result| {
                    let _ = tx.send(result);
                }),
            );
        }
        drop(tx);
        pool.shutdown();
        assert!(!pool.is_available());

        let mut closed = 0;
        let mut total = 0;
        while let Some(result) = rx.recv().await {
            total += 1;
            if result == Err(FetchError::Closed) {
                closed += 1;
            }
        }
        assert_eq!(total, 3);
        assert_eq!(closed, 2);
    }
}
