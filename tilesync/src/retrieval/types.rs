//! Retrieval service contract.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use crate::level::Tile;

/// A boxed future that is Send and has a lifetime.
///
/// Used instead of `async fn` so the retrieval service stays usable as a
/// trait object.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported for a single tile fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The service confirmed the tile does not exist.
    #[error("Tile not found")]
    NotFound,

    #[error("Request timed out")]
    Timeout,

    /// Any other non-success status.
    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Connection failed: {0}")]
    Connection(String),

    /// The retrieval service shut down before the request ran.
    #[error("Retrieval service closed")]
    Closed,
}

impl FetchError {
    /// Returns true if the failure means the tile does not exist remotely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound)
    }
}

/// One tile to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub tile: Tile,
    pub url: String,
}

/// Callback run exactly once when a submitted request finishes.
pub type CompletionHandler = Box<dyn FnOnce(Result<Bytes, FetchError>) + Send + 'static>;

/// Bounded pool executing tile fetches.
///
/// The scheduler never spawns fetches itself: it checks [`is_available`],
/// submits, and waits for capacity. Implementations must invoke the
/// completion handler of every accepted request exactly once, including when
/// they shut down.
///
/// [`is_available`]: RetrievalService::is_available
pub trait RetrievalService: Send + Sync {
    /// Returns true if a new request would start without queueing.
    fn is_available(&self) -> bool;

    /// Hands a request to the pool.
    fn submit(&self, request: RetrievalRequest, on_complete: CompletionHandler);

    /// Resolves when capacity may have been released.
    ///
    /// The default never resolves; callers combine it with a poll interval.
    fn capacity_released(&self) -> BoxFuture<'_, ()> {
        Box::pin(std::future::pending())
    }
}
