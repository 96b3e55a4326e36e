//! In-memory [`RecordStore`] for tests, fixtures, and the CLI.
//!
//! Answers [`RangeQuery`]s the way a managed document store would: all
//! filters over dotted paths, an inclusive range on the geohash field, and
//! ascending order. With index enforcement on, queries without a declared
//! [`CompositeIndex`] are refused.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bookswap_proximity_models::{
    Collection, CompositeIndex, Coordinates, RangeQuery, RecordDocument, SearchableRecord,
    filter::lookup,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::store::{RecordStore, StoreError};

type Documents = BTreeMap<Collection, BTreeMap<String, RecordDocument>>;

/// JSON fixture layout: one array of raw documents per collection.
#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    locations: Vec<RecordDocument>,
    #[serde(default)]
    books: Vec<RecordDocument>,
}

/// A document store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    documents: RwLock<Documents>,
    indexes: Option<BTreeSet<CompositeIndex>>,
}

impl MemoryRecordStore {
    /// Creates an empty store without index enforcement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fixture of the form `{ "locations": [...], "books": [...] }`.
    ///
    /// Documents are stored as given; malformed ones are only rejected
    /// when a search decodes them.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the JSON doesn't match the fixture
    /// layout.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let fixture: Fixture = serde_json::from_str(json)?;
        let mut documents = Documents::new();

        for (collection, docs) in [
            (Collection::Locations, fixture.locations),
            (Collection::Books, fixture.books),
        ] {
            let entry = documents.entry(collection).or_default();
            for doc in docs {
                entry.insert(doc.id.clone(), doc);
            }
        }

        log::debug!(
            "Loaded fixture: {} location(s), {} book(s)",
            documents.get(&Collection::Locations).map_or(0, BTreeMap::len),
            documents.get(&Collection::Books).map_or(0, BTreeMap::len),
        );

        Ok(Self {
            documents: RwLock::new(documents),
            indexes: None,
        })
    }

    /// Turns on index enforcement with the given composite indexes
    /// declared.
    #[must_use]
    pub fn with_indexes(mut self, indexes: impl IntoIterator<Item = CompositeIndex>) -> Self {
        self.indexes
            .get_or_insert_with(BTreeSet::new)
            .extend(indexes);
        self
    }

    /// Stores `record` in `collection`, replacing any document with the
    /// same id.
    pub async fn insert(&self, collection: Collection, record: &SearchableRecord) {
        self.insert_document(collection, record.to_document(collection))
            .await;
    }

    /// Stores a raw document as-is.
    pub async fn insert_document(&self, collection: Collection, document: RecordDocument) {
        self.documents
            .write()
            .await
            .entry(collection)
            .or_default()
            .insert(document.id.clone(), document);
    }

    /// Moves a stored record, writing the new coordinates and their
    /// geohash together.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no document has this id, or
    /// [`StoreError::Other`] if the stored document or the new coordinates
    /// are invalid. The stored document is unchanged on error.
    pub async fn relocate(
        &self,
        collection: Collection,
        id: &str,
        coordinates: Coordinates,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let slot = documents
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        let mut record = SearchableRecord::from_document(collection, slot.clone())
            .map_err(|e| StoreError::Other {
                message: e.to_string(),
            })?;
        record
            .relocate(coordinates)
            .map_err(|e| StoreError::Other {
                message: e.to_string(),
            })?;

        *slot = record.to_document(collection);
        Ok(())
    }

    /// Number of documents stored in `collection`.
    pub async fn len(&self, collection: Collection) -> usize {
        self.documents
            .read()
            .await
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(&self, query: &RangeQuery) -> Result<Vec<RecordDocument>, StoreError> {
        if let Some(indexes) = &self.indexes {
            let required = query.required_index();
            if !indexes.contains(&required) {
                return Err(StoreError::MissingIndex { index: required });
            }
        }

        let documents = self.documents.read().await;
        let Some(docs) = documents.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(Value, &RecordDocument)> = docs
            .values()
            .filter(|doc| {
                lookup(&doc.fields, &query.range_field)
                    .and_then(Value::as_str)
                    .is_some_and(|hash| query.range.contains(hash))
            })
            .filter(|doc| query.filters.iter().all(|f| f.matches(&doc.fields)))
            .map(|doc| {
                let key = lookup(&doc.fields, &query.order_by)
                    .cloned()
                    .unwrap_or(Value::Null);
                (key, doc)
            })
            .collect();

        matched.sort_by(|(a, a_doc), (b, b_doc)| {
            a.as_str()
                .cmp(&b.as_str())
                .then_with(|| a_doc.id.cmp(&b_doc.id))
        });

        Ok(matched.into_iter().map(|(_, doc)| doc.clone()).collect())
    }
}
