//! Loosely-typed store documents and their conversion to and from
//! [`SearchableRecord`].
//!
//! Location documents look like
//! `{ id, name, city, type, status, geohash, geo: { lat, lng } }`; book
//! documents like `{ id, title, author, status, location: { lat, lng,
//! city, geohash } }`. Which field holds what comes from [`Collection`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{Collection, Coordinates, RecordStatus, STATUS_FIELD, SearchableRecord};

/// A raw document as stored: an id plus arbitrary JSON fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDocument {
    /// Document id.
    pub id: String,
    /// Every other field.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RecordDocument {
    /// Creates a document from an id and a JSON object.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// A document is missing a field the search engine depends on, or holds
/// it with the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Required field absent.
    #[error("Document {id}: missing field '{field}'")]
    MissingField {
        /// Document id.
        id: String,
        /// Dotted path of the missing field.
        field: String,
    },

    /// Required field present but unusable.
    #[error("Document {id}: invalid field '{field}': {message}")]
    InvalidField {
        /// Document id.
        id: String,
        /// Dotted path of the invalid field.
        field: String,
        /// Description of what went wrong.
        message: String,
    },
}

impl SearchableRecord {
    /// Validates a raw document of `collection` into a record.
    ///
    /// The stored geohash is kept as-is. Coordinate-object keys other than
    /// `lat`, `lng`, and a nested geohash stay in the attributes under the
    /// coordinates field.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if the status, coordinates, or geohash are
    /// missing or malformed.
    pub fn from_document(
        collection: Collection,
        document: RecordDocument,
    ) -> Result<Self, DocumentError> {
        let RecordDocument { id, mut fields } = document;
        let coordinates_field = collection.coordinates_field();
        let geohash_field = collection.geohash_field();
        let nested_geohash = nested_key(geohash_field, coordinates_field);

        let status = match fields.remove(STATUS_FIELD) {
            None => return Err(missing(&id, STATUS_FIELD)),
            Some(Value::String(s)) => s
                .parse::<RecordStatus>()
                .map_err(|_| invalid(&id, STATUS_FIELD, format!("unknown status '{s}'")))?,
            Some(other) => {
                return Err(invalid(&id, STATUS_FIELD, format!("expected string, got {other}")));
            }
        };

        let mut coordinates_object = match fields.remove(coordinates_field) {
            None => return Err(missing(&id, coordinates_field)),
            Some(Value::Object(object)) => object,
            Some(other) => {
                return Err(invalid(
                    &id,
                    coordinates_field,
                    format!("expected object, got {other}"),
                ));
            }
        };

        let lat = take_f64(&id, coordinates_field, "lat", &mut coordinates_object)?;
        let lng = take_f64(&id, coordinates_field, "lng", &mut coordinates_object)?;
        let coordinates = Coordinates::new(lat, lng).map_err(|e| {
            invalid(
                &id,
                &format!("{coordinates_field}.{}", e.field()),
                e.to_string(),
            )
        })?;

        let stored_geohash = match nested_geohash {
            Some(key) => coordinates_object.remove(key),
            None => fields.remove(geohash_field),
        };
        let geohash = match stored_geohash {
            None => return Err(missing(&id, geohash_field)),
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(other) => {
                return Err(invalid(
                    &id,
                    geohash_field,
                    format!("expected non-empty string, got {other}"),
                ));
            }
        };

        if !coordinates_object.is_empty() {
            fields.insert(
                coordinates_field.to_string(),
                Value::Object(coordinates_object),
            );
        }

        Ok(Self::from_stored(id, coordinates, geohash, status, fields))
    }

    /// Converts the record back into the document shape of `collection`.
    #[must_use]
    pub fn to_document(&self, collection: Collection) -> RecordDocument {
        let coordinates_field = collection.coordinates_field();
        let geohash_field = collection.geohash_field();
        let mut fields = self.attributes().clone();

        let mut coordinates_object = match fields.remove(coordinates_field) {
            Some(Value::Object(object)) => object,
            _ => Map::new(),
        };
        let coordinates = self.coordinates();
        coordinates_object.insert("lat".to_string(), Value::from(coordinates.lat));
        coordinates_object.insert("lng".to_string(), Value::from(coordinates.lng));

        match nested_key(geohash_field, coordinates_field) {
            Some(key) => {
                coordinates_object.insert(key.to_string(), Value::from(self.geohash()));
            }
            None => {
                fields.insert(geohash_field.to_string(), Value::from(self.geohash()));
            }
        }

        fields.insert(
            coordinates_field.to_string(),
            Value::Object(coordinates_object),
        );
        fields.insert(
            STATUS_FIELD.to_string(),
            Value::from(self.status().to_string()),
        );

        RecordDocument::new(self.id(), fields)
    }
}

/// If `path` is `"{parent}.{key}"`, returns `key`.
fn nested_key<'a>(path: &'a str, parent: &str) -> Option<&'a str> {
    path.strip_prefix(parent)?.strip_prefix('.')
}

fn take_f64(
    id: &str,
    parent: &str,
    key: &str,
    object: &mut Map<String, Value>,
) -> Result<f64, DocumentError> {
    let field = format!("{parent}.{key}");
    match object.remove(key) {
        None => Err(missing(id, &field)),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| invalid(id, &field, format!("expected number, got {value}"))),
    }
}

fn missing(id: &str, field: &str) -> DocumentError {
    DocumentError::MissingField {
        id: id.to_string(),
        field: field.to_string(),
    }
}

fn invalid(id: &str, field: &str, message: String) -> DocumentError {
    DocumentError::InvalidField {
        id: id.to_string(),
        field: field.to_string(),
        message,
    }
}
