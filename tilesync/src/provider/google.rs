//! Google Maps tile URLs.
//!
//! Google serves XYZ tiles: rows count from the north and the zoom equals
//! the level ordinal plus three. The service endpoint may contain a `{s}`
//! placeholder that is rotated across four hosts.

use super::types::{with_server, TileScheme, TileUrlBuilder};
use crate::level::{Level, Tile};

/// Default Google endpoint for satellite imagery.
pub const GOOGLE_SATELLITE_SERVICE: &str = "https://mt{s}.google.com/vt?lyrs=s";

/// Available Google layers and their `lyrs` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoogleLayer {
    Satellite,
    Hybrid,
    Roadmap,
    Terrain,
}

impl GoogleLayer {
    pub fn code(&self) -> &'static str {
        match self {
            GoogleLayer::Satellite => "s",
            GoogleLayer::Hybrid => "y",
            GoogleLayer::Roadmap => "m",
            GoogleLayer::Terrain => "p",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GoogleLayer::Satellite => "satellite",
            GoogleLayer::Hybrid => "hybrid",
            GoogleLayer::Roadmap => "roadmap",
            GoogleLayer::Terrain => "terrain",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "satellite" | "s" => Some(GoogleLayer::Satellite),
            "hybrid" | "y" => Some(GoogleLayer::Hybrid),
            "roadmap" | "m" => Some(GoogleLayer::Roadmap),
            "terrain" | "p" => Some(GoogleLayer::Terrain),
            _ => None,
        }
    }

    /// Endpoint for this layer, with the `{s}` server placeholder.
    pub fn service(&self) -> String {
        format!("https://mt{{s}}.google.com/vt?lyrs={}", self.code())
    }
}

/// URL builder for Google tiles.
#[derive(Debug, Clone)]
pub struct GoogleUrlBuilder {
    scheme: TileScheme,
}

impl GoogleUrlBuilder {
    pub fn new() -> Self {
        Self {
            scheme: TileScheme::XYZ,
        }
    }
}

impl Default for GoogleUrlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TileUrlBuilder for GoogleUrlBuilder {
    fn name(&self) -> &str {
        "Google"
    }

    fn build_url(&self, level: &Level, tile: &Tile) -> Option<String> {
        let service = with_server(level.service(), tile, 4);
        Some(format!(
            "{}&x={}&y={}&z={}",
            service,
            tile.col,
            self.scheme.row(level, tile),
            self.scheme.zoom(level)
        ))
    }
}
