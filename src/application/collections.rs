//! Read-only collection service backing the public HTTP surface.

use std::{collections::HashMap, sync::Arc, time::Instant};

use databyte_api_types::PageResult;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    application::{
        query::{QueryParams, query},
        repos::{CollectionRepo, StoreReadError},
    },
    domain::{
        collections::{self, CollectionSpec, STATS_DOCUMENT},
        types::CacheTier,
    },
};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("unknown collection `{0}`")]
    UnknownCollection(String),
    #[error(transparent)]
    Store(#[from] StoreReadError),
}

/// A processed page together with the cache tier its collection is served under.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionPage {
    pub result: PageResult,
    pub tier: CacheTier,
}

#[derive(Clone)]
pub struct CollectionService {
    repo: Arc<dyn CollectionRepo>,
    tier_overrides: HashMap<String, CacheTier>,
}

impl CollectionService {
    pub fn new(repo: Arc<dyn CollectionRepo>) -> Self {
        Self {
            repo,
            tier_overrides: HashMap::new(),
        }
    }

    pub fn with_tier_overrides(mut self, overrides: HashMap<String, CacheTier>) -> Self {
        self.tier_overrides = overrides;
        self
    }

    pub fn spec(&self, name: &str) -> Option<&'static CollectionSpec> {
        collections::find(name)
    }

    /// Tier for a collection or the statistics document, honouring configuration.
    pub fn tier_for(&self, name: &str) -> CacheTier {
        if let Some(tier) = self.tier_overrides.get(name) {
            return *tier;
        }
        match self.spec(name) {
            Some(spec) => spec.cache_tier,
            None if name == STATS_DOCUMENT => CacheTier::Long,
            None => CacheTier::None,
        }
    }

    /// Load `name` fresh, then filter, sort and paginate according to `raw_query`.
    #[instrument(skip(self, raw_query), fields(collection = name))]
    pub async fn list(
        &self,
        name: &str,
        raw_query: Option<&str>,
    ) -> Result<CollectionPage, CollectionError> {
        let spec = self
            .spec(name)
            .ok_or_else(|| CollectionError::UnknownCollection(name.to_string()))?;

        let started = Instant::now();
        let snapshot = self.repo.load(spec.name).await?;
        let params = QueryParams::parse(raw_query, spec.default_limit);
        let result = query(&snapshot, &params, spec);

        debug!(
            total = result.pagination.total,
            returned = result.data.len(),
            page = result.pagination.page,
            limit = result.pagination.limit,
            elapsed_us = started.elapsed().as_micros() as u64,
            "collection queried"
        );

        Ok(CollectionPage {
            result,
            tier: self.tier_for(spec.name),
        })
    }

    pub async fn stats(&self) -> Result<Value, StoreReadError> {
        self.repo.load_document(STATS_DOCUMENT).await
    }

    /// Load every catalogue collection once, reporting the first failure.
    pub async fn verify_all(&self) -> Result<Vec<(&'static str, usize)>, StoreReadError> {
        let mut counts = Vec::with_capacity(collections::CATALOGUE.len());
        for spec in collections::CATALOGUE {
            let records = self.repo.load(spec.name).await?;
            counts.push((spec.name, records.len()));
        }
        self.repo.load_document(STATS_DOCUMENT).await?;
        Ok(counts)
    }
}
