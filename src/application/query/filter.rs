//! Conjunctive filter predicates with alias-aware, case-insensitive matching.

use databyte_api_types::Record;
use serde_json::Value;

use crate::domain::collections::{CollectionSpec, FilterDimension, MatchMode};

/// A filter value resolved against its dimension, ready to test records.
#[derive(Debug, Clone)]
pub struct Predicate<'a> {
    dimension: &'a FilterDimension,
    accepted: Vec<String>,
}

impl<'a> Predicate<'a> {
    pub fn new(dimension: &'a FilterDimension, value: &str) -> Self {
        Self {
            dimension,
            accepted: dimension.acceptable_values(value),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let Some(raw) = record.field(self.dimension.field) else {
            return false;
        };
        field_texts(raw)
            .iter()
            .any(|text| self.accepts(text.as_str()))
    }

    fn accepts(&self, text: &str) -> bool {
        self.accepted
            .iter()
            .any(|accepted| match self.dimension.mode {
                MatchMode::Exact => text == accepted,
                MatchMode::Contains => text.contains(accepted.as_str()),
            })
    }
}

/// Resolve every active filter the collection declares; unknown names are ignored.
pub fn predicates<'a, 'p>(
    spec: &'a CollectionSpec,
    filters: impl Iterator<Item = (&'p str, &'p str)>,
) -> Vec<Predicate<'a>> {
    filters
        .filter_map(|(name, value)| {
            spec.filter(name)
                .map(|dimension| Predicate::new(dimension, value))
        })
        .collect()
}

/// Lowercased textual forms of a field; arrays contribute each element.
fn field_texts(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => vec![text.trim().to_lowercase()],
        Value::Number(number) => vec![number.to_string()],
        Value::Bool(flag) => vec![flag.to_string()],
        Value::Array(items) => items.iter().flat_map(field_texts).collect(),
        Value::Null | Value::Object(_) => Vec::new(),
    }
}
