#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geohash proximity search for bookswap locations and books.
//!
//! [`ProximitySearchEngine`] turns a center and radius into a handful of
//! geohash range queries, runs them concurrently against an injected
//! [`RecordStore`], and returns the records inside the circle sorted by
//! great-circle distance.

pub mod config;
pub mod engine;
pub mod memory;
pub mod store;

use bookswap_geo::GeohashRange;

pub use config::{ConfigError, SearchConfig};
pub use engine::ProximitySearchEngine;
pub use memory::MemoryRecordStore;
pub use store::{RecordStore, StoreError};

/// Errors returned by a proximity search.
#[derive(Debug, thiserror::Error)]
pub enum ProximityError {
    /// The caller passed an unusable center or radius.
    #[error("Invalid {field}: {message}")]
    InvalidArgument {
        /// Offending parameter (`"center.lat"`, `"center.lng"`,
        /// `"radius_km"`).
        field: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// A range query against the store failed.
    #[error("Query for geohash range {range} failed: {source}")]
    Dependency {
        /// The range whose query failed.
        range: GeohashRange,
        /// The store's error.
        #[source]
        source: StoreError,
    },
}
