//! TileSync - bulk synchronization of tiled raster imagery
//!
//! Brings every tile of a geographic sector, from the coarsest level up to a
//! target level, into a local cache. Work is split into bounded regions, the
//! remaining volume is estimated by sampling, and fetches run through a
//! bounded retrieval pool with cooperative cancellation.
//!
//! # High-Level API
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilesync::bulk::BulkConfig;
//! use tilesync::cache::{AbsentResourceList, DiskTileStore};
//! use tilesync::coord::Sector;
//! use tilesync::layer::TiledLayer;
//! use tilesync::provider::ProviderConfig;
//! use tilesync::retrieval::{PooledRetrievalService, ReqwestFetcher};
//!
//! let layer = Arc::new(TiledLayer::from_provider(
//!     &ProviderConfig::tencent(),
//!     Arc::new(DiskTileStore::new("/var/cache/tiles")),
//!     Arc::new(AbsentResourceList::default()),
//! )?);
//! let pool = Arc::new(PooledRetrievalService::new(ReqwestFetcher::new()?, 8));
//! let sector = Sector::from_degrees(47.0, 48.0, 8.0, 9.0)?;
//!
//! let handle = layer
//!     .make_local(&sector, 1e-5, pool, BulkConfig::default(), None)
//!     .expect("sector overlaps the layer");
//! let outcome = handle.wait().await?;
//! ```

pub mod addressing;
pub mod bulk;
pub mod cache;
pub mod config;
pub mod coord;
pub mod estimate;
pub mod layer;
pub mod level;
pub mod logging;
pub mod probe;
pub mod provider;
pub mod region;
pub mod retrieval;

/// Version of the library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
