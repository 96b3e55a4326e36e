//! Base32 geohash encoding and search range computation.
//!
//! Geohashes interleave longitude and latitude bisection bits (longitude
//! first) and pack them five at a time into the base32 alphabet below.
//! Points that share a prefix share a cell, so a circle can be covered by
//! a handful of prefix ranges (see [`query_bounds`]).

use std::f64::consts::PI;

use crate::{BoundingBox, GeohashError, GeohashRange, validate_latitude, validate_longitude};

/// The geohash base32 alphabet. Sorted in ASCII order, which is what
/// makes prefix ranges work as string ranges.
pub const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision (in characters) of every geohash stored with a record.
///
/// Query bounds never use more bits than this, so a stored hash is always
/// at least as long as the range prefix it is compared against.
pub const GEOHASH_PRECISION: usize = 10;

/// Longest geohash [`encode`] will produce.
pub const MAX_PRECISION: usize = 22;

/// Bits packed into each base32 character.
pub const BITS_PER_CHAR: u32 = 5;

/// Sorts after every base32 character; used as an open upper bound.
pub(crate) const RANGE_SENTINEL: char = '~';

#[allow(clippy::cast_possible_truncation)]
const MAX_QUERY_BITS: u32 = GEOHASH_PRECISION as u32 * BITS_PER_CHAR;

/// Shortest length of one degree of latitude (at the equator). Using the
/// minimum keeps the search box at least as tall as the circle.
const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.0;

/// Sphere radius for longitude spans. Kept a little under the haversine
/// mean radius so longitude spans are never narrower than the circle.
const SPAN_EARTH_RADIUS_M: f64 = 6_371_000.0;

const EPSILON: f64 = 1e-12;

/// Encodes a point as a geohash of `precision` characters.
///
/// # Errors
///
/// Returns [`GeohashError`] if the coordinates are out of range or the
/// precision is outside `1..=MAX_PRECISION`.
pub fn encode(lat: f64, lng: f64, precision: usize) -> Result<String, GeohashError> {
    validate_latitude(lat)?;
    validate_longitude(lng)?;
    if precision == 0 || precision > MAX_PRECISION {
        return Err(GeohashError::InvalidPrecision { precision });
    }

    let (mut lat_min, mut lat_max) = (-90.0_f64, 90.0_f64);
    let (mut lng_min, mut lng_max) = (-180.0_f64, 180.0_f64);
    let mut hash = String::with_capacity(precision);
    let mut value = 0usize;
    let mut bits = 0;
    let mut even = true;

    while hash.len() < precision {
        let (coordinate, min, max) = if even {
            (lng, &mut lng_min, &mut lng_max)
        } else {
            (lat, &mut lat_min, &mut lat_max)
        };
        let mid = f64::midpoint(*min, *max);
        if coordinate > mid {
            value = (value << 1) | 1;
            *min = mid;
        } else {
            value <<= 1;
            *max = mid;
        }
        even = !even;

        bits += 1;
        if bits == BITS_PER_CHAR {
            hash.push(char::from(BASE32[value]));
            bits = 0;
            value = 0;
        }
    }

    Ok(hash)
}

/// Encodes a point at [`GEOHASH_PRECISION`], the precision every stored
/// record uses.
///
/// # Errors
///
/// Returns [`GeohashError`] if the coordinates are out of range.
pub fn encode_default(lat: f64, lng: f64) -> Result<String, GeohashError> {
    encode(lat, lng, GEOHASH_PRECISION)
}

/// Decodes a geohash into the bounds of its cell.
///
/// # Errors
///
/// Returns [`GeohashError::InvalidGeohash`] if the hash is empty, longer
/// than [`MAX_PRECISION`], or contains a character outside [`BASE32`].
pub fn decode(hash: &str) -> Result<BoundingBox, GeohashError> {
    let invalid = || GeohashError::InvalidGeohash {
        hash: hash.to_string(),
    };
    if hash.is_empty() || hash.len() > MAX_PRECISION {
        return Err(invalid());
    }

    let (mut lat_min, mut lat_max) = (-90.0_f64, 90.0_f64);
    let (mut lng_min, mut lng_max) = (-180.0_f64, 180.0_f64);
    let mut even = true;

    for c in hash.chars() {
        let value = char_value(c).ok_or_else(invalid)?;
        for shift in (0..BITS_PER_CHAR).rev() {
            let (min, max) = if even {
                (&mut lng_min, &mut lng_max)
            } else {
                (&mut lat_min, &mut lat_max)
            };
            let mid = f64::midpoint(*min, *max);
            if (value >> shift) & 1 == 1 {
                *min = mid;
            } else {
                *max = mid;
            }
            even = !even;
        }
    }

    Ok(BoundingBox::new(lng_min, lat_min, lng_max, lat_max))
}

/// Computes the geohash ranges covering a circle of `radius_m` meters
/// around `(lat, lng)`.
///
/// The cell size is chosen so a cell is at least as large as the radius
/// in both axes; the cells holding the nine points of the circle's
/// bounding box (corners, edge midpoints, center) then cover the whole
/// box. Each cell becomes one prefix range. Duplicate ranges are dropped,
/// keeping first-seen order, so the result holds between one and nine
/// ranges.
///
/// # Errors
///
/// Returns [`GeohashError`] if the center is out of range or the radius is
/// not a positive finite number.
pub fn query_bounds(lat: f64, lng: f64, radius_m: f64) -> Result<Vec<GeohashRange>, GeohashError> {
    validate_latitude(lat)?;
    validate_longitude(lng)?;
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(GeohashError::InvalidRadius { meters: radius_m });
    }

    let search_box = SearchBox::around(lat, radius_m);
    let bits = search_box.cell_bits(radius_m);

    // Zero bits, or a box spanning the whole longitude circle, can't be
    // covered by sampling nine points.
    if bits == 0 || search_box.lng_delta >= 180.0 {
        log::trace!("query_bounds: radius {radius_m} m at lat {lat} covers the whole world");
        return Ok(vec![GeohashRange::whole_world()]);
    }

    let precision = bits.div_ceil(BITS_PER_CHAR) as usize;
    let mut ranges: Vec<GeohashRange> = Vec::with_capacity(9);

    for (point_lat, point_lng) in search_box.sample_points(lat, lng) {
        let hash = encode(point_lat, point_lng, precision)?;
        let range = cell_range(&hash, bits)?;
        if !ranges.contains(&range) {
            ranges.push(range);
        }
    }

    log::trace!(
        "query_bounds: ({lat}, {lng}) r={radius_m} m -> {bits} bits, {} range(s)",
        ranges.len()
    );

    Ok(ranges)
}

/// The latitude/longitude extent of the box around a search circle.
struct SearchBox {
    north: f64,
    south: f64,
    lat_delta: f64,
    lng_delta: f64,
}

impl SearchBox {
    fn around(lat: f64, radius_m: f64) -> Self {
        let lat_delta = radius_m / METERS_PER_DEGREE_LATITUDE;
        let north = (lat + lat_delta).min(90.0);
        let south = (lat - lat_delta).max(-90.0);
        let lng_delta = meters_to_longitude_degrees(radius_m, north)
            .max(meters_to_longitude_degrees(radius_m, south));

        Self {
            north,
            south,
            lat_delta,
            lng_delta,
        }
    }

    /// Number of interleaved bits whose cells are at least as large as the
    /// box half-extent in both axes, capped at the stored precision.
    fn cell_bits(&self, radius_m: f64) -> u32 {
        let lat_bits = floor_log2(180.0 / self.lat_delta) * 2;
        let lng_bits_north = longitude_bits(radius_m, self.north) * 2 - 1;
        let lng_bits_south = longitude_bits(radius_m, self.south) * 2 - 1;

        lat_bits
            .min(lng_bits_north)
            .min(lng_bits_south)
            .min(MAX_QUERY_BITS)
    }

    fn sample_points(&self, lat: f64, lng: f64) -> [(f64, f64); 9] {
        let west = wrap_longitude(lng - self.lng_delta);
        let east = wrap_longitude(lng + self.lng_delta);

        [
            (lat, lng),
            (lat, west),
            (lat, east),
            (self.north, lng),
            (self.north, west),
            (self.north, east),
            (self.south, lng),
            (self.south, west),
            (self.south, east),
        ]
    }
}

/// Converts a prefix cell of `bits` significant bits into a string range.
///
/// `hash` must be exactly `ceil(bits / 5)` characters long.
fn cell_range(hash: &str, bits: u32) -> Result<GeohashRange, GeohashError> {
    let Some(last) = hash.chars().last() else {
        return Err(GeohashError::InvalidGeohash {
            hash: hash.to_string(),
        });
    };
    let base = &hash[..hash.len() - last.len_utf8()];
    let last_value = char_value(last).ok_or_else(|| GeohashError::InvalidGeohash {
        hash: hash.to_string(),
    })?;

    #[allow(clippy::cast_possible_truncation)]
    let significant = bits - base.len() as u32 * BITS_PER_CHAR;
    let unused = BITS_PER_CHAR - significant;
    let start = (last_value >> unused) << unused;
    let end = start + (1 << unused);

    let low = format!("{base}{}", char::from(BASE32[start]));
    let high = if end > 31 {
        format!("{base}{RANGE_SENTINEL}")
    } else {
        format!("{base}{}", char::from(BASE32[end]))
    };

    Ok(GeohashRange { low, high })
}

/// Degrees of longitude spanned by `meters` at `lat`, at most 360.
fn meters_to_longitude_degrees(meters: f64, lat: f64) -> f64 {
    let meters_per_degree = lat.to_radians().cos() * SPAN_EARTH_RADIUS_M * PI / 180.0;
    if meters_per_degree < EPSILON {
        if meters > 0.0 { 360.0 } else { 0.0 }
    } else {
        (meters / meters_per_degree).min(360.0)
    }
}

/// Longitude bits whose cells are at least `meters` wide at `lat`.
fn longitude_bits(meters: f64, lat: f64) -> u32 {
    let degrees = meters_to_longitude_degrees(meters, lat);
    if degrees > 0.0 {
        floor_log2(360.0 / degrees).max(1)
    } else {
        MAX_QUERY_BITS
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_log2(value: f64) -> u32 {
    if value < 1.0 {
        0
    } else {
        value.log2().floor().min(f64::from(MAX_QUERY_BITS)) as u32
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let adjusted = lng + 180.0;
    if adjusted > 0.0 {
        (adjusted % 360.0) - 180.0
    } else {
        180.0 - (-adjusted % 360.0)
    }
}

fn char_value(c: char) -> Option<usize> {
    BASE32.iter().position(|&b| char::from(b) == c)
}
