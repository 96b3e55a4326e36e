//! Great-circle distance on a spherical Earth.
//!
//! Haversine on the mean Earth radius is within half a percent of the
//! ellipsoidal distance, which is plenty for city-scale radii.

use geo::{Distance as _, Haversine, Point};

/// Haversine distance between two points, in meters.
///
/// Points are `geo` points, so `x` is longitude and `y` is latitude.
#[must_use]
pub fn distance_m(from: Point<f64>, to: Point<f64>) -> f64 {
    Haversine.distance(from, to)
}

/// Haversine distance between two points, in kilometers.
#[must_use]
pub fn distance_km(from: Point<f64>, to: Point<f64>) -> f64 {
    distance_m(from, to) / 1000.0
}
