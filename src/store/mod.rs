//! Store Module
//!
//! A minimal key-value store abstraction with lazy TTL expiry and glob lookup.
//! Caches hold an `Arc<dyn KeyValueStore>` chosen once at startup; the
//! in-memory [`MemoryStore`] is the bundled implementation.

mod entry;
mod glob;
mod memory;


use async_trait::async_trait;

use crate::error::StoreResult;

// Re-export public types
pub use entry::{current_timestamp_ms, SortedSet, StoredEntry, StoredValue};
pub use glob::{glob_to_regex, GlobPattern};
pub use memory::MemoryStore;

// == Public Constants ==
/// `ttl` reply for a key that does not exist.
pub const TTL_MISSING: i64 = -2;

/// `ttl` reply for a key without expiry.
pub const TTL_PERSISTENT: i64 = -1;

// == Key Value Store ==
/// Capability set every store backend provides.
///
/// All calls fail with [`crate::error::StoreError::Connection`] while the
/// backend is disconnected.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the string value under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Batched `get`; the reply lines up with `keys`.
    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Stores a value without expiry, replacing any previous value and TTL.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Stores a value expiring after `ttl_seconds`. Non-positive TTLs write an
    /// already-expired entry.
    async fn setex(&self, key: &str, ttl_seconds: i64, value: &str) -> StoreResult<()>;

    /// Deletes keys and returns how many live keys were removed.
    async fn del(&self, keys: &[String]) -> StoreResult<usize>;

    /// 1 if the key is live, else 0.
    async fn exists(&self, key: &str) -> StoreResult<u8>;

    /// Sets a TTL on a live key. 1 on success, 0 if the key is absent.
    async fn expire(&self, key: &str, ttl_seconds: i64) -> StoreResult<u8>;

    /// Remaining TTL in seconds, [`TTL_PERSISTENT`] or [`TTL_MISSING`].
    async fn ttl(&self, key: &str) -> StoreResult<i64>;

    /// Live keys matching a glob; expired keys met during the scan are purged.
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// Returns `"PONG"` when connected.
    async fn ping(&self) -> StoreResult<String>;

    /// Closes the connection; later calls fail until reconnected.
    async fn quit(&self) -> StoreResult<()>;

    /// Drops every key.
    async fn flush_all(&self) -> StoreResult<()>;
}
