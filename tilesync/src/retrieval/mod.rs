//! Tile retrieval
//!
//! The bulk scheduler hands individual tile fetches to a
//! [`RetrievalService`], which owns the concurrency ceiling. The default
//! implementation, [`PooledRetrievalService`], runs a [`TileFetcher`] on tokio
//! tasks bounded by a semaphore; [`ReqwestFetcher`] is the HTTP fetcher.

mod http;
mod pooled;
mod types;

pub use http::{ReqwestFetcher, TileFetcher, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use pooled::{PoolStats, PooledRetrievalService, DEFAULT_CONCURRENCY};
pub use types::{BoxFuture, CompletionHandler, FetchError, RetrievalRequest, RetrievalService};
