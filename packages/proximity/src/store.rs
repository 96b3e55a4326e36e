//! The document store the engine queries.

use std::time::Duration;

use async_trait::async_trait;
use bookswap_proximity_models::{Collection, CompositeIndex, RangeQuery, RecordDocument};

/// Errors a [`RecordStore`] can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store unavailable: {message}")]
    Unavailable {
        /// Description of what went wrong.
        message: String,
    },

    /// The store refuses the query because no composite index serves it.
    #[error("Missing composite index {index}")]
    MissingIndex {
        /// The index the query needs.
        index: CompositeIndex,
    },

    /// The query did not finish in time.
    #[error("Query timed out after {after:?}")]
    Timeout {
        /// Elapsed limit.
        after: Duration,
    },

    /// No document with the given id exists.
    #[error("No {collection} document with id '{id}'")]
    NotFound {
        /// Collection searched.
        collection: Collection,
        /// Missing document id.
        id: String,
    },

    /// Any other store failure.
    #[error("Store error: {message}")]
    Other {
        /// Description of what went wrong.
        message: String,
    },
}

/// A queryable document store.
///
/// Implementations return every document of `query.collection` that
/// satisfies all of `query.filters` and whose `query.range_field` lies in
/// the inclusive range, ordered by `query.order_by` ascending. Document
/// contents are returned as stored; validation is the caller's job.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Runs one range query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is unreachable, rejects the
    /// query, or fails while running it.
    async fn query(&self, query: &RangeQuery) -> Result<Vec<RecordDocument>, StoreError>;
}
