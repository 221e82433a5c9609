//! Arguments shared across commands.

use std::path::PathBuf;

use clap::Args;
use tilesync::config::parse_size;
use tilesync::coord::Sector;
use tilesync::layer::TiledLayer;

use crate::error::CliError;

/// Geographic bounds in decimal degrees.
#[derive(Debug, Clone, Args)]
pub struct SectorArgs {
    /// Southern latitude
    #[arg(long, allow_hyphen_values = true)]
    pub min_lat: f64,

    /// Northern latitude
    #[arg(long, allow_hyphen_values = true)]
    pub max_lat: f64,

    /// Western longitude
    #[arg(long, allow_hyphen_values = true)]
    pub min_lon: f64,

    /// Eastern longitude
    #[arg(long, allow_hyphen_values = true)]
    pub max_lon: f64,
}

impl SectorArgs {
    pub fn to_sector(&self) -> Result<Sector, CliError> {
        Ok(Sector::from_degrees(
            self.min_lat,
            self.max_lat,
            self.min_lon,
            self.max_lon,
        )?)
    }
}

/// Vendor and layer selection; defaults come from the config file.
#[derive(Debug, Clone, Args)]
pub struct ProviderArgs {
    /// Tile vendor (google, tianditu, tencent, baidu, xyz)
    #[arg(long)]
    pub provider: Option<String>,

    /// Vendor layer, or the URL template for xyz
    #[arg(long)]
    pub layer: Option<String>,

    /// Cache directory (overrides cache.directory)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
}

/// Target detail: a level number or a resolution.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct DetailArgs {
    /// Finest level to retrieve
    #[arg(long)]
    pub level: Option<u32>,

    /// Target resolution in meters per pixel
    #[arg(long)]
    pub resolution: Option<f64>,
}

/// Mean Earth radius used to turn meters into radians.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

impl DetailArgs {
    /// Resolution in radians per texel for the layer.
    pub fn resolution(&self, layer: &TiledLayer) -> Result<f64, CliError> {
        if let Some(number) = self.level {
            let level = layer.levels().level(number).ok_or_else(|| {
                CliError::Config(format!(
                    "{} has levels 0 to {}",
                    layer.name(),
                    layer.levels().num_levels().saturating_sub(1)
                ))
            })?;
            return Ok(level.texel_size());
        }
        match self.resolution {
            Some(meters) if meters > 0.0 && meters.is_finite() => Ok(meters / EARTH_RADIUS_METERS),
            Some(meters) => Err(CliError::Config(format!(
                "resolution must be positive, got {}",
                meters
            ))),
            None => Err(CliError::Config("either --level or --resolution is required".to_string())),
        }
    }
}

/// Parses a `--max-download` value such as `2GB`.
pub fn parse_limit(value: &str) -> Result<u64, String> {
    parse_size(value).map_err(|e| e.to_string())
}
