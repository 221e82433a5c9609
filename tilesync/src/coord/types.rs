//! Geographic and Mercator sector types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum latitude representable in Web Mercator (degrees).
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Minimum latitude representable in Web Mercator (degrees).
pub const MIN_LAT: f64 = -MAX_LAT;

/// Minimum longitude (degrees).
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude (degrees).
pub const MAX_LON: f64 = 180.0;

/// Errors produced when constructing sectors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude range: min {min} > max {max}")]
    InvalidLatitudeRange { min: f64, max: f64 },

    #[error("Invalid longitude range: min {min} > max {max}")]
    InvalidLongitudeRange { min: f64, max: f64 },

    #[error("Coordinate is not a finite number: {0}")]
    NotFinite(f64),
}

/// A rectangular geographic area in degrees.
///
/// Bounds are inclusive and ordered (`min <= max` on both axes). Sectors are
/// immutable values; operations return new sectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Sector {
    /// The whole globe.
    pub const FULL_SPHERE: Sector = Sector {
        min_lat: -90.0,
        max_lat: 90.0,
        min_lon: MIN_LON,
        max_lon: MAX_LON,
    };

    /// Creates a sector from degree bounds.
    ///
    /// # Errors
    ///
    /// Returns an error if a bound is NaN/infinite or if a minimum exceeds
    /// its maximum.
    pub fn from_degrees(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, CoordError> {
        for value in [min_lat, max_lat, min_lon, max_lon] {
            if !value.is_finite() {
                return Err(CoordError::NotFinite(value));
            }
        }
        if min_lat > max_lat {
            return Err(CoordError::InvalidLatitudeRange {
                min: min_lat,
                max: max_lat,
            });
        }
        if min_lon > max_lon {
            return Err(CoordError::InvalidLongitudeRange {
                min: min_lon,
                max: max_lon,
            });
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn delta_lat(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn delta_lon(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Returns the centroid as `(lat, lon)`.
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Returns true if the point lies inside the sector (bounds inclusive).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// Returns true if the two sectors share any area or edge.
    pub fn intersects(&self, other: &Sector) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
    }

    /// Returns the overlap of two sectors, or `None` if they are disjoint.
    pub fn intersection(&self, other: &Sector) -> Option<Sector> {
        if !self.intersects(other) {
            return None;
        }
        Some(Sector {
            min_lat: self.min_lat.max(other.min_lat),
            max_lat: self.max_lat.min(other.max_lat),
            min_lon: self.min_lon.max(other.min_lon),
            max_lon: self.max_lon.min(other.max_lon),
        })
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}] x [{:.6}, {:.6}]",
            self.min_lat, self.max_lat, self.min_lon, self.max_lon
        )
    }
}

/// A sector whose vertical bounds are expressed in Mercator-y.
///
/// Mercator-y spans `[-1, 1]` where `-1` is the southern edge of the Web
/// Mercator band and `1` the northern edge. Longitudes stay in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MercatorSector {
    min_y: f64,
    max_y: f64,
    min_lon: f64,
    max_lon: f64,
}

impl MercatorSector {
    /// The full Web Mercator band.
    pub const FULL: MercatorSector = MercatorSector {
        min_y: -1.0,
        max_y: 1.0,
        min_lon: MIN_LON,
        max_lon: MAX_LON,
    };

    /// Creates a Mercator sector. Swapped bounds are reordered.
    pub fn new(min_y: f64, max_y: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_y: min_y.min(max_y),
            max_y: max_y.max(min_y),
            min_lon: min_lon.min(max_lon),
            max_lon: max_lon.max(min_lon),
        }
    }

    /// Projects a geographic sector into Mercator-y space.
    ///
    /// Latitudes beyond the Web Mercator band are clamped, so polar sectors
    /// map onto the edge rows instead of producing infinities.
    pub fn from_sector(sector: &Sector) -> Self {
        Self {
            min_y: super::mercator_y(sector.min_lat()),
            max_y: super::mercator_y(sector.max_lat()),
            min_lon: sector.min_lon(),
            max_lon: sector.max_lon(),
        }
    }

    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn delta_y(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn delta_lon(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Converts back to geographic degrees.
    pub fn to_geographic(&self) -> Sector {
        Sector {
            min_lat: super::gudermannian(self.min_y),
            max_lat: super::gudermannian(self.max_y),
            min_lon: self.min_lon,
            max_lon: self.max_lon,
        }
    }
}

impl fmt::Display for MercatorSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "y[{:.6}, {:.6}] x lon[{:.6}, {:.6}]",
            self.min_y, self.max_y, self.min_lon, self.max_lon
        )
    }
}
