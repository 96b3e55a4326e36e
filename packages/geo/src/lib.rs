#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geohash codec and great-circle distance for the bookswap proximity
//! search.
//!
//! Everything here is pure: no I/O, no state. The same functions run on
//! the write path (computing the geohash stored with a record) and on the
//! read path (computing the geohash ranges a search scans), and both sides
//! share [`GEOHASH_PRECISION`].

pub mod distance;
pub mod geohash;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use distance::{distance_km, distance_m};
pub use geohash::{
    BASE32, BITS_PER_CHAR, GEOHASH_PRECISION, MAX_PRECISION, decode, encode, encode_default,
    query_bounds,
};

/// Errors from geohash encoding, decoding, and bound computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeohashError {
    /// Latitude outside `[-90, 90]` or not finite.
    #[error("Invalid latitude {value}: expected a finite value in [-90, 90]")]
    InvalidLatitude {
        /// The rejected latitude.
        value: f64,
    },

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("Invalid longitude {value}: expected a finite value in [-180, 180]")]
    InvalidLongitude {
        /// The rejected longitude.
        value: f64,
    },

    /// Requested precision outside `1..=MAX_PRECISION`.
    #[error("Invalid geohash precision {precision}: expected 1-{MAX_PRECISION}")]
    InvalidPrecision {
        /// The rejected precision.
        precision: usize,
    },

    /// A geohash contained a character outside the base32 alphabet, or
    /// was empty.
    #[error("Invalid geohash '{hash}'")]
    InvalidGeohash {
        /// The rejected geohash.
        hash: String,
    },

    /// Search radius was zero, negative, or not finite.
    #[error("Invalid radius {meters} m: expected a finite value greater than 0")]
    InvalidRadius {
        /// The rejected radius in meters.
        meters: f64,
    },
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether the point lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lng)
    }

    /// The `(lat, lng)` midpoint of the box.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            f64::midpoint(self.south, self.north),
            f64::midpoint(self.west, self.east),
        )
    }
}

/// An inclusive lexicographic range of geohash strings.
///
/// Every geohash with the cell prefix the range was built from sorts
/// between `low` and `high`, so a store can answer it with a single
/// ordered index scan (`geohash >= low AND geohash <= high`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeohashRange {
    /// Inclusive lower bound.
    pub low: String,
    /// Inclusive upper bound.
    pub high: String,
}

impl GeohashRange {
    /// Creates a range from its bounds.
    #[must_use]
    pub fn new(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }

    /// The range covering every geohash.
    #[must_use]
    pub fn whole_world() -> Self {
        Self::new("", geohash::RANGE_SENTINEL.to_string())
    }

    /// Whether `hash` sorts inside this range.
    #[must_use]
    pub fn contains(&self, hash: &str) -> bool {
        hash >= self.low.as_str() && hash <= self.high.as_str()
    }
}

impl fmt::Display for GeohashRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

/// Validates a latitude.
///
/// # Errors
///
/// Returns [`GeohashError::InvalidLatitude`] if `lat` is not finite or
/// lies outside `[-90, 90]`.
pub fn validate_latitude(lat: f64) -> Result<(), GeohashError> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(GeohashError::InvalidLatitude { value: lat })
    }
}

/// Validates a longitude.
///
/// # Errors
///
/// Returns [`GeohashError::InvalidLongitude`] if `lng` is not finite or
/// lies outside `[-180, 180]`.
pub fn validate_longitude(lng: f64) -> Result<(), GeohashError> {
    if lng.is_finite() && (-180.0..=180.0).contains(&lng) {
        Ok(())
    } else {
        Err(GeohashError::InvalidLongitude { value: lng })
    }
}
