//! The proximity search itself.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bookswap_geo::{GeohashError, GeohashRange};
use bookswap_proximity_models::{
    Collection, CompositeIndex, Coordinates, RangeQuery, RecordDocument, SearchFilters,
    SearchQuery, SearchResult, SearchableRecord,
};
use futures::future::try_join_all;

use crate::config::SearchConfig;
use crate::store::{RecordStore, StoreError};
use crate::ProximityError;

/// Finds the records of one collection within a radius of a point.
///
/// The engine never writes to the store and keeps no state between
/// searches, so one instance can serve concurrent callers.
pub struct ProximitySearchEngine {
    store: Arc<dyn RecordStore>,
    collection: Collection,
    config: SearchConfig,
}

impl std::fmt::Debug for ProximitySearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProximitySearchEngine")
            .field("collection", &self.collection)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProximitySearchEngine {
    /// Creates an engine searching `collection` in `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, collection: Collection, config: SearchConfig) -> Self {
        Self {
            store,
            collection,
            config,
        }
    }

    /// The collection this engine searches.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// The limits this engine applies.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs a bundled [`SearchQuery`].
    ///
    /// # Errors
    ///
    /// See [`ProximitySearchEngine::find_nearby`].
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ProximityError> {
        self.find_nearby(query.center, query.radius_km, &query.filters)
            .await
    }

    /// Returns the searchable records within `radius_km` of `center`,
    /// nearest first.
    ///
    /// The radius is clamped to [`SearchConfig::max_radius_km`] and the
    /// boundary is inclusive. Equal distances are ordered by id. At most
    /// [`SearchConfig::max_results`] records are returned. Documents that
    /// fail validation are skipped with a warning.
    ///
    /// # Errors
    ///
    /// * [`ProximityError::InvalidArgument`] if the center or radius is
    ///   unusable. Nothing is sent to the store in that case.
    /// * [`ProximityError::Dependency`] if any range query fails or times
    ///   out. The remaining queries are dropped and no partial results are
    ///   returned.
    pub async fn find_nearby(
        &self,
        center: Coordinates,
        radius_km: f64,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchResult>, ProximityError> {
        validate_center(center)?;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(ProximityError::InvalidArgument {
                field: "radius_km",
                message: format!("expected a finite value greater than 0, got {radius_km}"),
            });
        }

        let radius_km = if radius_km > self.config.max_radius_km {
            log::debug!(
                "Clamping radius {radius_km} km to {} km",
                self.config.max_radius_km
            );
            self.config.max_radius_km
        } else {
            radius_km
        };

        let ranges = bookswap_geo::query_bounds(center.lat, center.lng, radius_km * 1000.0)
            .map_err(invalid_argument)?;

        let field_filters = filters.to_field_filters();
        let queries: Vec<RangeQuery> = ranges
            .into_iter()
            .map(|range| RangeQuery::for_range(self.collection, range, &field_filters))
            .collect();

        log::debug!(
            "Searching {} within {radius_km} km of ({}, {}) over {} geohash range(s)",
            self.collection,
            center.lat,
            center.lng,
            queries.len(),
        );

        let timeout = self.config.query_timeout();
        let batches = try_join_all(queries.iter().map(|query| self.run_query(query, timeout))).await?;

        let candidates = self.decode_unique(batches.into_iter().flatten());
        let candidate_count = candidates.len();

        let mut results: Vec<SearchResult> = candidates
            .into_values()
            .filter_map(|record| {
                let distance_km = center.distance_km(record.coordinates());
                (distance_km <= radius_km).then_some(SearchResult {
                    record,
                    distance_km,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.record.id().cmp(b.record.id()))
        });
        results.truncate(self.config.max_results);

        log::debug!(
            "{candidate_count} candidate(s), {} within {radius_km} km",
            results.len()
        );

        Ok(results)
    }

    /// Composite indexes a store needs to serve unfiltered searches and
    /// searches with `filters`.
    #[must_use]
    pub fn required_indexes(&self, filters: &SearchFilters) -> Vec<CompositeIndex> {
        let base = RangeQuery::for_range(self.collection, GeohashRange::whole_world(), &[])
            .required_index();
        let filtered = RangeQuery::for_range(
            self.collection,
            GeohashRange::whole_world(),
            &filters.to_field_filters(),
        )
        .required_index();

        if filtered == base {
            vec![base]
        } else {
            vec![base, filtered]
        }
    }

    async fn run_query(
        &self,
        query: &RangeQuery,
        timeout: Duration,
    ) -> Result<Vec<RecordDocument>, ProximityError> {
        let result = tokio::time::timeout(timeout, self.store.query(query))
            .await
            .unwrap_or(Err(StoreError::Timeout { after: timeout }));

        match result {
            Ok(documents) => {
                log::trace!("Range {} returned {} document(s)", query.range, documents.len());
                Ok(documents)
            }
            Err(source) => {
                log::debug!("Range {} failed: {source}", query.range);
                Err(ProximityError::Dependency {
                    range: query.range.clone(),
                    source,
                })
            }
        }
    }

    /// Validates documents and merges them by id, keeping the first
    /// occurrence.
    fn decode_unique(
        &self,
        documents: impl Iterator<Item = RecordDocument>,
    ) -> BTreeMap<String, SearchableRecord> {
        let searchable = self.collection.searchable_status();
        let mut candidates = BTreeMap::new();

        for document in documents {
            if candidates.contains_key(&document.id) {
                continue;
            }
            match SearchableRecord::from_document(self.collection, document) {
                Ok(record) if record.status() == searchable => {
                    candidates.insert(record.id().to_string(), record);
                }
                Ok(record) => {
                    log::warn!(
                        "Store returned {} record '{}' with status {}; skipping",
                        self.collection,
                        record.id(),
                        record.status()
                    );
                }
                Err(e) => {
                    log::warn!("Skipping {} document: {e}", self.collection);
                }
            }
        }

        candidates
    }
}

fn validate_center(center: Coordinates) -> Result<(), ProximityError> {
    center.validate().map_err(|e| ProximityError::InvalidArgument {
        field: if e.field() == "lat" {
            "center.lat"
        } else {
            "center.lng"
        },
        message: e.to_string(),
    })
}

fn invalid_argument(error: GeohashError) -> ProximityError {
    let field = match error {
        GeohashError::InvalidLatitude { .. } => "center.lat",
        GeohashError::InvalidLongitude { .. } => "center.lng",
        GeohashError::InvalidPrecision { .. }
        | GeohashError::InvalidGeohash { .. }
        | GeohashError::InvalidRadius { .. } => "radius_km",
    };
    ProximityError::InvalidArgument {
        field,
        message: error.to_string(),
    }
}
