//! Tile cache interfaces and implementations
//!
//! - [`TileStore`]: existence, expiry, write and size sampling of cached tiles
//! - [`DiskTileStore`]: filesystem layout `{root}/{cache_name}/{level}/{row}/{row}_{col}{suffix}`
//! - [`MemoryTileStore`]: concurrent map for tests and dry runs
//! - [`AbsentResourceList`]: decaying registry of tiles the service does not have

mod absent;
mod disk;
mod memory;
mod traits;

pub use absent::{
    AbsentResourceList, DEFAULT_MAX_TRIES, DEFAULT_MIN_CHECK_INTERVAL, DEFAULT_TRY_AGAIN_INTERVAL,
};
pub use disk::DiskTileStore;
pub use memory::MemoryTileStore;
pub use traits::{AbsentRegistry, StoreError, TileStore};
