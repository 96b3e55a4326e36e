//! The compound range query a store has to answer, and the composite index
//! it needs.

use std::fmt;

use bookswap_geo::GeohashRange;
use serde::{Deserialize, Serialize};

use crate::{Collection, FieldFilter, STATUS_FIELD};

/// One geohash-range scan: status equality, caller predicates, and an
/// inclusive range on the geohash field, ordered by that field ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeQuery {
    /// Collection to scan.
    pub collection: Collection,
    /// Predicates every returned document must satisfy. The status
    /// equality always comes first.
    pub filters: Vec<FieldFilter>,
    /// Field the range applies to.
    pub range_field: String,
    /// Inclusive bounds on `range_field`.
    pub range: GeohashRange,
    /// Field results are ordered by (ascending).
    pub order_by: String,
}

impl RangeQuery {
    /// Builds the scan of `range` over the searchable records of
    /// `collection`, with `filters` added after the status predicate.
    #[must_use]
    pub fn for_range(collection: Collection, range: GeohashRange, filters: &[FieldFilter]) -> Self {
        let mut all = Vec::with_capacity(filters.len() + 1);
        all.push(FieldFilter::equals(
            STATUS_FIELD,
            collection.searchable_status().to_string(),
        ));
        all.extend_from_slice(filters);

        let geohash_field = collection.geohash_field().to_string();

        Self {
            collection,
            filters: all,
            range_field: geohash_field.clone(),
            range,
            order_by: geohash_field,
        }
    }

    /// Lower bound of the range.
    #[must_use]
    pub fn low(&self) -> &str {
        &self.range.low
    }

    /// Upper bound of the range.
    #[must_use]
    pub fn high(&self) -> &str {
        &self.range.high
    }

    /// The composite index that serves this query: equality fields first,
    /// then other filtered fields, then the range field.
    #[must_use]
    pub fn required_index(&self) -> CompositeIndex {
        let mut fields: Vec<String> = Vec::with_capacity(self.filters.len() + 1);
        let ordered = self
            .filters
            .iter()
            .filter(|f| f.is_equality())
            .chain(self.filters.iter().filter(|f| !f.is_equality()));

        for filter in ordered {
            if filter.field != self.range_field && !fields.contains(&filter.field) {
                fields.push(filter.field.clone());
            }
        }
        fields.push(self.range_field.clone());

        CompositeIndex {
            collection: self.collection,
            fields,
        }
    }
}

/// An ascending composite index over a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositeIndex {
    /// Indexed collection.
    pub collection: Collection,
    /// Indexed fields, in order.
    pub fields: Vec<String>,
}

impl CompositeIndex {
    /// Creates an index definition.
    #[must_use]
    pub fn new<I, S>(collection: Collection, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collection,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CompositeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.collection, self.fields.join(", "))
    }
}
