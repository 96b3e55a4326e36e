#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record, query, and result types for bookswap proximity search.
//!
//! These types describe partner locations and books as the search engine
//! sees them. Raw store documents ([`RecordDocument`]) are loosely typed;
//! converting one into a [`SearchableRecord`] validates the fields the
//! engine depends on and passes everything else through untouched.

pub mod document;
pub mod filter;
pub mod query;

use geo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

pub use document::{DocumentError, RecordDocument};
pub use filter::{FieldFilter, FilterOp, SearchFilters};
pub use query::{CompositeIndex, RangeQuery};

/// Name of the status field in every collection.
pub const STATUS_FIELD: &str = "status";

/// Errors from coordinate validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    /// A coordinate was outside its valid range or not finite.
    #[error("Invalid {field} {value}: expected a finite value in {expected}")]
    OutOfRange {
        /// Which coordinate was rejected (`"lat"` or `"lng"`).
        field: &'static str,
        /// The rejected value.
        value: f64,
        /// The accepted range, for messages.
        expected: &'static str,
    },
}

impl CoordinateError {
    /// Name of the rejected coordinate (`"lat"` or `"lng"`).
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::OutOfRange { field, .. } => field,
        }
    }
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in `[-180, 180]`.
    pub lng: f64,
}

impl Coordinates {
    /// Creates validated coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if either value is out of range or not
    /// finite.
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        let coordinates = Self { lat, lng };
        coordinates.validate()?;
        Ok(coordinates)
    }

    /// Checks both values are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] naming the first offending coordinate.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        if bookswap_geo::validate_latitude(self.lat).is_err() {
            return Err(CoordinateError::OutOfRange {
                field: "lat",
                value: self.lat,
                expected: "[-90, 90]",
            });
        }
        if bookswap_geo::validate_longitude(self.lng).is_err() {
            return Err(CoordinateError::OutOfRange {
                field: "lng",
                value: self.lng,
                expected: "[-180, 180]",
            });
        }
        Ok(())
    }

    /// Converts to a `geo` point (`x` = longitude, `y` = latitude).
    #[must_use]
    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }

    /// Geohash of these coordinates at the shared stored precision.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if the coordinates are invalid.
    pub fn geohash(self) -> Result<String, CoordinateError> {
        self.validate()?;
        bookswap_geo::encode_default(self.lat, self.lng).map_err(|_| CoordinateError::OutOfRange {
            field: "lat",
            value: self.lat,
            expected: "[-90, 90]",
        })
    }

    /// Great-circle distance to `other`, in kilometers.
    #[must_use]
    pub fn distance_km(self, other: Self) -> f64 {
        bookswap_geo::distance_km(self.to_point(), other.to_point())
    }
}

/// Lifecycle status of a record.
///
/// Locations are `active`/`inactive`; books are `available`, `in-swap`, or
/// `swapped`. Only [`RecordStatus::is_searchable`] statuses show up in
/// search results.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RecordStatus {
    /// Partner location open for swaps.
    Active,
    /// Partner location closed or suspended.
    Inactive,
    /// Book listed and free to request.
    Available,
    /// Book promised to a reader, swap in progress.
    InSwap,
    /// Book already handed over.
    Swapped,
}

impl RecordStatus {
    /// Whether records with this status participate in search.
    #[must_use]
    pub const fn is_searchable(self) -> bool {
        matches!(self, Self::Active | Self::Available)
    }
}

/// A searchable document collection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Collection {
    /// Partner locations (shops, cafés, libraries acting as swap hubs).
    Locations,
    /// Books listed by readers.
    Books,
}

impl Collection {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Locations, Self::Books]
    }

    /// The status a record must have to be returned by a search.
    #[must_use]
    pub const fn searchable_status(self) -> RecordStatus {
        match self {
            Self::Locations => RecordStatus::Active,
            Self::Books => RecordStatus::Available,
        }
    }

    /// Top-level field holding the `{ lat, lng }` object.
    #[must_use]
    pub const fn coordinates_field(self) -> &'static str {
        match self {
            Self::Locations => "geo",
            Self::Books => "location",
        }
    }

    /// Dotted path of the stored geohash.
    #[must_use]
    pub const fn geohash_field(self) -> &'static str {
        match self {
            Self::Locations => "geohash",
            Self::Books => "location.geohash",
        }
    }
}

/// A location or book as seen by the proximity engine.
///
/// The geohash always comes from the coordinates: [`SearchableRecord::new`]
/// and [`SearchableRecord::relocate`] compute it at the shared precision.
/// Records decoded from a store keep whatever geohash was stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchableRecord {
    id: String,
    coordinates: Coordinates,
    geohash: String,
    status: RecordStatus,
    attributes: Map<String, Value>,
}

impl SearchableRecord {
    /// Creates a record, deriving its geohash from `coordinates`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if the coordinates are invalid.
    pub fn new(
        id: impl Into<String>,
        coordinates: Coordinates,
        status: RecordStatus,
    ) -> Result<Self, CoordinateError> {
        let geohash = coordinates.geohash()?;
        Ok(Self {
            id: id.into(),
            coordinates,
            geohash,
            status,
            attributes: Map::new(),
        })
    }

    /// Builds a record from already-stored values without recomputing the
    /// geohash.
    pub(crate) const fn from_stored(
        id: String,
        coordinates: Coordinates,
        geohash: String,
        status: RecordStatus,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            coordinates,
            geohash,
            status,
            attributes,
        }
    }

    /// Adds a pass-through attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Moves the record, recomputing its geohash.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if the new coordinates are invalid; the
    /// record is left unchanged.
    pub fn relocate(&mut self, coordinates: Coordinates) -> Result<(), CoordinateError> {
        self.geohash = coordinates.geohash()?;
        self.coordinates = coordinates;
        Ok(())
    }

    /// Changes the lifecycle status.
    pub const fn set_status(&mut self, status: RecordStatus) {
        self.status = status;
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current coordinates.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    /// Geohash as stored (or computed) for this record.
    #[must_use]
    pub fn geohash(&self) -> &str {
        &self.geohash
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> RecordStatus {
        self.status
    }

    /// Domain attributes (name, city, type, title, ...).
    #[must_use]
    pub const fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Looks up a single attribute by dotted path.
    #[must_use]
    pub fn attribute(&self, path: &str) -> Option<&Value> {
        filter::lookup(&self.attributes, path)
    }
}

/// Parameters of a proximity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Center of the search circle.
    pub center: Coordinates,
    /// Requested radius in kilometers (clamped by the engine).
    pub radius_km: f64,
    /// Extra predicates evaluated by the store.
    #[serde(default)]
    pub filters: SearchFilters,
}

impl SearchQuery {
    /// Creates an unfiltered query.
    #[must_use]
    pub fn new(center: Coordinates, radius_km: f64) -> Self {
        Self {
            center,
            radius_km,
            filters: SearchFilters::default(),
        }
    }

    /// Replaces the filters.
    #[must_use]
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// A record that matched a search, with its distance from the center.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The matched record, unchanged.
    #[serde(flatten)]
    pub record: SearchableRecord,
    /// Great-circle distance from the query center, in kilometers.
    pub distance_km: f64,
}
