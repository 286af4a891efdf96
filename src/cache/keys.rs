//! Canonical request keys.

use std::fmt;

use url::form_urlencoded;

use crate::{application::query::is_active_filter, domain::collections};

const PAGE_PARAM: &str = "page";
const LIMIT_PARAM: &str = "limit";
const SORT_PARAM: &str = "sort";

/// Canonical `"/collection/{name}?{pairs}"` string identifying one logical query.
///
/// Pairs are sorted by key then value, so parameter order never creates a
/// distinct key. `page=1` and a `limit` equal to the collection's default are
/// left out, since the server applies them anyway. The signature doubles as
/// the request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestSignature(String);

impl RequestSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder for a collection request as a client would issue it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    collection: String,
    pairs: Vec<(String, String)>,
}

impl CollectionQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            pairs: Vec::new(),
        }
    }

    /// Build from raw pairs; repeated keys are kept as given.
    pub fn from_pairs<I, K, V>(collection: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            collection: collection.into(),
            pairs: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn page(self, page: usize) -> Self {
        self.set(PAGE_PARAM, page.to_string())
    }

    pub fn limit(self, limit: usize) -> Self {
        self.set(LIMIT_PARAM, limit.to_string())
    }

    pub fn sort(self, key: impl Into<String>) -> Self {
        self.set(SORT_PARAM, key.into())
    }

    /// Constrain `name` to `value`; the `all` sentinel and blank values clear the filter.
    pub fn filter(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if is_active_filter(&value) {
            self.set(&name, value)
        } else {
            self.unset(&name)
        }
    }

    fn set(mut self, key: &str, value: String) -> Self {
        self.pairs.retain(|(existing, _)| existing != key);
        self.pairs.push((key.to_string(), value));
        self
    }

    fn unset(mut self, key: &str) -> Self {
        self.pairs.retain(|(existing, _)| existing != key);
        self
    }

    fn is_default(&self, key: &str, value: &str) -> bool {
        match key {
            PAGE_PARAM => value == "1",
            LIMIT_PARAM => collections::find(&self.collection)
                .is_some_and(|spec| value == spec.default_limit.to_string()),
            _ => false,
        }
    }

    pub fn signature(&self) -> RequestSignature {
        let mut pairs: Vec<&(String, String)> = self
            .pairs
            .iter()
            .filter(|(key, value)| !self.is_default(key, value))
            .collect();
        pairs.sort();

        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            query.append_pair(key, value);
        }
        let query = query.finish();

        let name: String = form_urlencoded::byte_serialize(self.collection.as_bytes()).collect();
        if query.is_empty() {
            RequestSignature(format!("/collection/{name}"))
        } else {
            RequestSignature(format!("/collection/{name}?{query}"))
        }
    }
}
