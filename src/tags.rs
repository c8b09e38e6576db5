//! Tag Resolver Module
//!
//! Maps tag names to ids through the tag cache with partial-hit batching:
//! one batched cache read, one repository query for whatever missed, and a
//! write-back of only the newly resolved names.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::cache::{generate_cache_key, CacheService};
use crate::catalog::{CatalogRepository, Predicate, TagMode};
use crate::error::RepositoryError;

/// Outcome of one resolution, including the metrics that were logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagResolution {
    /// Resolved ids, in request order
    pub ids: Vec<i64>,
    /// Names that matched no tag
    pub unresolved: Vec<String>,
    /// Every name was served from cache
    pub hit: bool,
    pub miss_count: usize,
    pub duration_ms: u64,
}

impl TagResolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Tag filter for the resolved ids.
    ///
    /// Unresolved names never widen the filter. In `all` mode a single
    /// unresolved name matches nothing; in `any` mode only resolved ids
    /// match, and nothing matches when none resolved.
    pub fn predicate(&self, mode: TagMode) -> Predicate {
        match mode {
            TagMode::All if !self.is_complete() => Predicate::Nothing,
            _ if self.ids.is_empty() => Predicate::Nothing,
            TagMode::All => Predicate::TagsAll(self.ids.clone()),
            TagMode::Any => Predicate::TagsAny(self.ids.clone()),
        }
    }
}

pub fn tag_cache_key(name: &str) -> String {
    generate_cache_key("tag", [("name", name)])
}

#[derive(Clone)]
pub struct TagResolver {
    cache: CacheService,
    repository: Arc<dyn CatalogRepository>,
}

impl TagResolver {
    pub fn new(cache: CacheService, repository: Arc<dyn CatalogRepository>) -> Self {
        Self { cache, repository }
    }

    /// Resolves tag names to ids.
    ///
    /// Cache failures never fail a resolution: a transport error bypasses the
    /// cache for this call and queries every name. Only repository errors are
    /// returned.
    pub async fn resolve(&self, names: &[String]) -> Result<TagResolution, RepositoryError> {
        let started = Instant::now();
        let names = dedup(names);
        if names.is_empty() {
            return Ok(TagResolution {
                hit: true,
                ..Default::default()
            });
        }

        let keys: Vec<String> = names.iter().map(|name| tag_cache_key(name)).collect();
        let (mut resolved, missing, cache_available) = match self.cache.get_many::<i64>(&keys).await
        {
            Ok(cached) => {
                let mut resolved = HashMap::new();
                let mut missing = Vec::new();
                for (name, id) in names.iter().zip(cached) {
                    match id {
                        Some(id) => {
                            resolved.insert(name.clone(), id);
                        }
                        None => missing.push(name.clone()),
                    }
                }
                (resolved, missing, true)
            }
            Err(err) => {
                warn!(
                    namespace = %self.cache.namespace(),
                    keys = keys.len(),
                    op = "get_many",
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Tag cache unavailable, querying repository directly"
                );
                (HashMap::new(), names.clone(), false)
            }
        };

        let miss_count = missing.len();
        if !missing.is_empty() {
            let found = match self.repository.find_tags(&missing).await {
                Ok(found) => found,
                Err(err) => {
                    info!(
                        hit = false,
                        miss_count,
                        duration_ms = started.elapsed().as_millis() as u64,
                        requested = names.len(),
                        error = %err,
                        "Tag resolution failed"
                    );
                    return Err(err);
                }
            };
            for name in &missing {
                let Some(tag) = found.iter().find(|tag| tag.name.eq_ignore_ascii_case(name)) else {
                    continue;
                };
                resolved.insert(name.clone(), tag.id);
                if cache_available {
                    if let Err(err) = self.cache.set(&tag_cache_key(name), &tag.id, None).await {
                        warn!(
                            key = %tag_cache_key(name),
                            op = "set",
                            duration_ms = started.elapsed().as_millis() as u64,
                            error = %err,
                            "Failed to cache tag id"
                        );
                    }
                }
            }
        }

        let mut ids = Vec::with_capacity(names.len());
        let mut unresolved = Vec::new();
        for name in &names {
            match resolved.get(name) {
                Some(id) => ids.push(*id),
                None => unresolved.push(name.clone()),
            }
        }

        let resolution = TagResolution {
            ids,
            unresolved,
            hit: miss_count == 0,
            miss_count,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            hit = resolution.hit,
            miss_count = resolution.miss_count,
            duration_ms = resolution.duration_ms,
            requested = names.len(),
            unresolved = resolution.unresolved.len(),
            "Resolved tags"
        );
        Ok(resolution)
    }
}

fn dedup(names: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(name) {
            unique.push(name.clone());
        }
    }
    unique
}
