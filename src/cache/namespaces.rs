//! The three listing caches.
//!
//! Results, counts and tag ids tolerate different staleness, so each lives in
//! its own namespace with its own TTL. Wiping result payloads after a write
//! leaves counts and tag ids in place.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheService, CacheStats};
use crate::config::Config;
use crate::store::KeyValueStore;

/// Namespace for full listing payloads.
pub const RESULTS_NAMESPACE: &str = "cache:results";

/// Namespace for bare totals.
pub const COUNTS_NAMESPACE: &str = "cache:counts";

/// Namespace for tag name to id mappings.
pub const TAGS_NAMESPACE: &str = "cache:tags";

/// Result, count and tag-mapping caches sharing one store handle.
#[derive(Clone)]
pub struct ListingCaches {
    pub results: CacheService,
    pub counts: CacheService,
    pub tags: CacheService,
}

/// Counters for every namespace, keyed by cache role.
#[derive(Debug, Clone, Serialize)]
pub struct ListingCacheStats {
    pub results: CacheStats,
    pub counts: CacheStats,
    pub tags: CacheStats,
}

impl ListingCaches {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        result_ttl: i64,
        count_ttl: i64,
        tag_ttl: i64,
    ) -> Self {
        Self {
            results: CacheService::new(store.clone(), RESULTS_NAMESPACE, result_ttl),
            counts: CacheService::new(store.clone(), COUNTS_NAMESPACE, count_ttl),
            tags: CacheService::new(store, TAGS_NAMESPACE, tag_ttl),
        }
    }

    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self::new(store, config.result_ttl, config.count_ttl, config.tag_ttl)
    }

    pub fn stats(&self) -> ListingCacheStats {
        ListingCacheStats {
            results: self.results.stats(),
            counts: self.counts.stats(),
            tags: self.tags.stats(),
        }
    }
}
