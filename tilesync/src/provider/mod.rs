//! Tile vendor URL builders
//!
//! Each vendor numbers tiles differently: some count rows from the north,
//! zoom levels are offset from the level ordinal, and Baidu uses its own
//! projection. A [`TileUrlBuilder`] hides these differences behind
//! `build_url(level, tile)`.
//!
//! # Factory Pattern
//!
//! ```
//! use tilesync::provider::ProviderConfig;
//!
//! let config = ProviderConfig::from_name("tencent", None).unwrap();
//! let levels = config.level_set_config();
//! let builder = config.url_builder().unwrap();
//! assert_eq!(levels.num_levels, 16);
//! assert_eq!(builder.name(), "Tencent");
//! ```

mod baidu;
mod factory;
mod google;
mod tencent;
mod tianditu;
mod types;
mod xyz;

pub use baidu::{to_baidu_mercator, BaiduUrlBuilder, BAIDU_MAX_LAT, BAIDU_SERVICE};
pub use factory::ProviderConfig;
pub use google::{GoogleLayer, GoogleUrlBuilder, GOOGLE_SATELLITE_SERVICE};
pub use tencent::{TencentUrlBuilder, TENCENT_SERVICE};
pub use tianditu::{TiandituLayer, TiandituUrlBuilder};
pub use types::{with_server, ProviderError, TileScheme, TileUrlBuilder};
pub use xyz::TemplateUrlBuilder;
