//! Cache Service Module
//!
//! JSON-aware, namespaced wrapper over a [`KeyValueStore`]. Reads never fail:
//! a miss, an undecodable payload and a store error all come back as `None`.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::CacheStats;
use crate::error::{CacheError, StoreResult};
use crate::lock::mutex_lock;
use crate::store::KeyValueStore;

const SOURCE: &str = "cache::service";

// == Cache Service ==
/// One cache namespace with its own default TTL and counters.
#[derive(Clone)]
pub struct CacheService {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    /// TTL applied when `set` is called without one; 0 disables expiry
    default_ttl: i64,
    stats: Arc<Mutex<CacheStats>>,
}

impl CacheService {
    // == Constructor ==
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        namespace: impl Into<String>,
        default_ttl: i64,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            default_ttl,
            stats: Arc::new(Mutex::new(CacheStats::new())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn default_ttl(&self) -> i64 {
        self.default_ttl
    }

    pub fn stats(&self) -> CacheStats {
        mutex_lock(&self.stats, SOURCE, "stats").clone()
    }

    fn store_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn record(&self, op: &'static str, update: impl FnOnce(&mut CacheStats)) {
        update(&mut *mutex_lock(&self.stats, SOURCE, op));
    }

    // == Get ==
    /// Reads and decodes a value.
    ///
    /// Returns `None` on miss, on a payload that does not decode as `T`, and
    /// when the store is unreachable.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let started = Instant::now();
        let store_key = self.store_key(key);

        let raw = match self.store.get(&store_key).await {
            Ok(raw) => raw,
            Err(err) => {
                self.record("get.error", CacheStats::record_error);
                warn!(
                    key = %store_key,
                    op = "get",
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Cache read failed, treating as miss"
                );
                return None;
            }
        };

        let Some(raw) = raw else {
            self.record("get.miss", CacheStats::record_miss);
            debug!(key = %store_key, op = "get", hit = false, "Cache miss");
            return None;
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => {
                self.record("get.hit", CacheStats::record_hit);
                debug!(
                    key = %store_key,
                    op = "get",
                    hit = true,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Cache hit"
                );
                Some(value)
            }
            Err(err) => {
                self.record("get.undecodable", CacheStats::record_miss);
                warn!(
                    key = %store_key,
                    op = "get",
                    error = %err,
                    "Cached value is not valid JSON for the expected type, treating as miss"
                );
                None
            }
        }
    }

    /// Records that a value returned by [`CacheService::get`] was outdated
    /// and is being rebuilt, turning that hit into a miss.
    pub fn mark_stale(&self, key: &str) {
        self.record("get.stale", CacheStats::record_stale);
        debug!(key = %self.store_key(key), op = "get", hit = false, "Stale cache entry");
    }

    // == Get Many ==
    /// Batched read in one store round trip.
    ///
    /// Unlike [`CacheService::get`] this surfaces store errors, so callers
    /// can choose to bypass the cache. Undecodable entries are `None`.
    pub async fn get_many<T: DeserializeOwned>(
        &self,
        keys: &[String],
    ) -> StoreResult<Vec<Option<T>>> {
        let store_keys: Vec<String> = keys.iter().map(|key| self.store_key(key)).collect();

        let raw = self.store.mget(&store_keys).await.inspect_err(|_| {
            self.record("get_many.error", CacheStats::record_error);
        })?;

        let values: Vec<Option<T>> = raw
            .into_iter()
            .map(|raw| raw.and_then(|raw| serde_json::from_str(&raw).ok()))
            .collect();

        let hits = values.iter().filter(|value| value.is_some()).count() as u64;
        self.record("get_many", |stats| {
            stats.hits += hits;
            stats.misses += values.len() as u64 - hits;
        });
        Ok(values)
    }

    // == Set ==
    /// Encodes and stores a value.
    ///
    /// `ttl` of `None` uses the namespace default. A positive TTL writes with
    /// `setex`; zero or negative writes without expiry.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<i64>,
    ) -> Result<(), CacheError> {
        let started = Instant::now();
        let store_key = self.store_key(key);
        let payload = serde_json::to_string(value)?;
        let ttl = ttl.unwrap_or(self.default_ttl);

        let written = if ttl > 0 {
            self.store.setex(&store_key, ttl, &payload).await
        } else {
            self.store.set(&store_key, &payload).await
        };

        match written {
            Ok(()) => {
                self.record("set", CacheStats::record_write);
                debug!(
                    key = %store_key,
                    op = "set",
                    ttl,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Cache write"
                );
                Ok(())
            }
            Err(err) => {
                self.record("set.error", CacheStats::record_error);
                warn!(
                    key = %store_key,
                    op = "set",
                    ttl,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Cache write failed"
                );
                Err(err.into())
            }
        }
    }

    // == Invalidate ==
    /// Deletes every live key in this namespace matching `pattern`.
    pub async fn invalidate_pattern(&self, pattern: &str) -> StoreResult<usize> {
        let started = Instant::now();
        let matched = self.store.keys(&self.store_key(pattern)).await?;
        let removed = if matched.is_empty() {
            0
        } else {
            self.store.del(&matched).await?
        };

        debug!(
            namespace = %self.namespace,
            pattern,
            removed,
            duration_ms = started.elapsed().as_millis() as u64,
            "Cache invalidation"
        );
        Ok(removed)
    }
}
