//! Field predicates evaluated alongside the geohash range.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display};

/// Field compared by [`SearchFilters::record_type`].
pub const TYPE_FIELD: &str = "type";

/// Field compared by [`SearchFilters::hub_only`].
pub const MILESTONE_FIELD: &str = "milestoneLevel";

/// Comparison operator of a [`FieldFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterOp {
    /// `field == value`
    Eq,
    /// `field > value`
    Gt,
    /// `field >= value`
    Gte,
    /// `field < value`
    Lt,
    /// `field <= value`
    Lte,
}

/// A single predicate over a (possibly dotted) document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Dotted field path, e.g. `"type"` or `"location.city"`.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Value to compare against.
    pub value: Value,
}

impl FieldFilter {
    /// Creates a filter.
    #[must_use]
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// `field == value`
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// `field >= value`
    #[must_use]
    pub fn at_least(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte, value)
    }

    /// Whether this is an equality predicate.
    #[must_use]
    pub fn is_equality(&self) -> bool {
        self.op == FilterOp::Eq
    }

    /// Evaluates the filter against a document's fields.
    ///
    /// A missing field never matches. Ordering operators only compare
    /// numbers with numbers and strings with strings.
    #[must_use]
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        let Some(actual) = lookup(fields, &self.field) else {
            return false;
        };

        let ordering = || compare(actual, &self.value);

        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::Gt => ordering() == Some(Ordering::Greater),
            FilterOp::Gte => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => ordering() == Some(Ordering::Less),
            FilterOp::Lte => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

/// Caller-facing search filters.
///
/// `record_type` and `hub_only` cover the location map's filter controls;
/// `extra` carries anything else the caller wants the store to check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Only records whose `type` equals this value.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    /// Only hubs (`milestoneLevel >= 1`).
    #[serde(default)]
    pub hub_only: bool,
    /// Additional predicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<FieldFilter>,
}

impl SearchFilters {
    /// Whether no filter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record_type.is_none() && !self.hub_only && self.extra.is_empty()
    }

    /// Expands the filters into store predicates.
    #[must_use]
    pub fn to_field_filters(&self) -> Vec<FieldFilter> {
        let mut filters = Vec::with_capacity(self.extra.len() + 2);
        if let Some(record_type) = &self.record_type {
            filters.push(FieldFilter::equals(TYPE_FIELD, record_type.as_str()));
        }
        if self.hub_only {
            filters.push(FieldFilter::at_least(MILESTONE_FIELD, 1));
        }
        filters.extend(self.extra.iter().cloned());
        filters
    }
}

/// Resolves a dotted path (`"location.city"`) inside a JSON object.
#[must_use]
pub fn lookup<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn lookup_follows_dotted_paths() {
        let doc = fields(json!({ "location": { "city": "Milano", "lat": 45.4 } }));
        assert_eq!(lookup(&doc, "location.city"), Some(&json!("Milano")));
        assert_eq!(lookup(&doc, "location.zip"), None);
        assert_eq!(lookup(&doc, "location.city.name"), None);
        assert_eq!(lookup(&doc, "missing"), None);
    }

    #[test]
    fn equality_treats_integer_and_float_alike() {
        let doc = fields(json!({ "milestoneLevel": 1 }));
        assert!(FieldFilter::equals("milestoneLevel", 1.0).matches(&doc));
        assert!(!FieldFilter::equals("milestoneLevel", 2).matches(&doc));
    }

    #[test]
    fn ordering_operators() {
        let doc = fields(json!({ "milestoneLevel": 2, "name": "m" }));
        assert!(FieldFilter::at_least("milestoneLevel", 1).matches(&doc));
        assert!(FieldFilter::at_least("milestoneLevel", 2).matches(&doc));
        assert!(!FieldFilter::new("milestoneLevel", FilterOp::Gt, 2).matches(&doc));
        assert!(FieldFilter::new("milestoneLevel", FilterOp::Lt, 3).matches(&doc));
        assert!(FieldFilter::new("milestoneLevel", FilterOp::Lte, 2).matches(&doc));
        assert!(FieldFilter::new("name", FilterOp::Gt, "a").matches(&doc));
    }

    #[test]
    fn mismatched_types_and_missing_fields_never_match() {
        let doc = fields(json!({ "milestoneLevel": "high" }));
        assert!(!FieldFilter::at_least("milestoneLevel", 1).matches(&doc));
        assert!(!FieldFilter::new("milestoneLevel", FilterOp::Lte, 1).matches(&doc));
        assert!(!FieldFilter::new("milestoneLevel", FilterOp::Lt, 1).matches(&doc));
        assert!(!FieldFilter::equals("milestoneLevel", 1).matches(&doc));
        assert!(!FieldFilter::equals("type", "library").matches(&doc));
    }

    #[test]
    fn every_operator_at_the_boundary() {
        let doc = fields(json!({ "milestoneLevel": 1, "city": "Milano" }));
        let at = |op| FieldFilter::new("milestoneLevel", op, 1).matches(&doc);
        assert!(at(FilterOp::Eq));
        assert!(at(FilterOp::Gte));
        assert!(at(FilterOp::Lte));
        assert!(!at(FilterOp::Gt));
        assert!(!at(FilterOp::Lt));
        assert!(FieldFilter::equals("city", "Milano").matches(&doc));
        assert!(!FieldFilter::equals("city", "Roma").matches(&doc));
    }

    #[test]
    fn search_filters_expand_in_order() {
        let filters = SearchFilters {
            record_type: Some("library".to_string()),
            hub_only: true,
            extra: vec![FieldFilter::equals("city", "Milano")],
        };
        let expanded = filters.to_field_filters();
        assert_eq!(
            expanded,
            vec![
                FieldFilter::equals("type", "library"),
                FieldFilter::at_least("milestoneLevel", 1),
                FieldFilter::equals("city", "Milano"),
            ]
        );
        assert!(SearchFilters::default().is_empty());
        assert!(!filters.is_empty());
    }

    #[test]
    fn search_filters_deserialize_from_camel_case() {
        let filters: SearchFilters =
            serde_json::from_value(json!({ "type": "cafe", "hubOnly": true })).unwrap();
        assert_eq!(filters.record_type.as_deref(), Some("cafe"));
        assert!(filters.hub_only);
        assert!(filters.extra.is_empty());
    }
}
