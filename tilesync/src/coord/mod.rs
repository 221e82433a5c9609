//! Coordinate conversion module
//!
//! Provides the Web Mercator latitude warp used to address tiles: geographic
//! latitude maps to Mercator-y in `[-1, 1]` and back via the Gudermannian
//! function.

mod types;

pub use types::{CoordError, MercatorSector, Sector, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

use std::f64::consts::{FRAC_PI_4, PI};

/// Converts a latitude in degrees to Mercator-y.
///
/// The latitude is clamped to the Web Mercator band first and the result is
/// clamped to `[-1, 1]`, so ±90° yields ±1 instead of infinity.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees
#[inline]
pub fn mercator_y(lat: f64) -> f64 {
    if lat >= MAX_LAT {
        return 1.0;
    }
    if lat <= MIN_LAT {
        return -1.0;
    }
    let y = (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln() / PI;
    y.clamp(-1.0, 1.0)
}

/// Converts a Mercator-y value back to latitude in degrees.
///
/// Inverse of [`mercator_y`] within the Web Mercator band.
#[inline]
pub fn gudermannian(y: f64) -> f64 {
    (PI * y).sinh().atan().to_degrees()
}
