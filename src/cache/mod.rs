//! Cache Module
//!
//! Namespaced JSON caching over a [`crate::store::KeyValueStore`].

mod keys;
mod namespaces;
mod service;
mod stats;

// Re-export public types
pub use keys::{generate_cache_key, SENTINEL_ALL, SENTINEL_NONE, SENTINEL_NOT_APPLICABLE};
pub use namespaces::{
    ListingCacheStats, ListingCaches, COUNTS_NAMESPACE, RESULTS_NAMESPACE, TAGS_NAMESPACE,
};
pub use service::CacheService;
pub use stats::CacheStats;
