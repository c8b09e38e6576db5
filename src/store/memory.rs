//! Memory Store Module
//!
//! In-process keyspace with lazy TTL expiry. Expired entries are only removed
//! when a read, write or scan touches them; nothing sweeps in the background.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::lock::mutex_lock;
use crate::store::entry::resolve_range;
use crate::store::{
    current_timestamp_ms, GlobPattern, KeyValueStore, SortedSet, StoredEntry, StoredValue,
    TTL_MISSING, TTL_PERSISTENT,
};

const SOURCE: &str = "store::memory";

type Keyspace = HashMap<String, StoredEntry>;

// == Memory Store ==
/// Shared in-memory key-value store.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    keyspace: Mutex<Keyspace>,
    /// Connection state; every call fails while false
    connected: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty, connected store.
    pub fn new() -> Self {
        Self {
            keyspace: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(true),
        }
    }

    // == Connection State ==
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    // == Length ==
    /// Number of resident entries, including expired ones nobody touched yet.
    pub fn len(&self) -> usize {
        self.lock("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self, op: &'static str) -> std::sync::MutexGuard<'_, Keyspace> {
        mutex_lock(&self.keyspace, SOURCE, op)
    }

    fn ensure_connected(&self) -> StoreResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StoreError::Connection)
        }
    }

    // == Hashes ==
    /// Sets a hash field. Returns 1 if the field is new, 0 if updated.
    pub fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<u8> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("hset");
        let entry = entry_or_insert(&mut keyspace, key, || StoredValue::Hash(HashMap::new()));
        match &mut entry.value {
            StoredValue::Hash(hash) => {
                Ok(u8::from(hash.insert(field.to_string(), value.to_string()).is_none()))
            }
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    pub fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("hget");
        match live_entry(&mut keyspace, key).map(|entry| &entry.value) {
            None => Ok(None),
            Some(StoredValue::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    pub fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("hgetall");
        match live_entry(&mut keyspace, key).map(|entry| &entry.value) {
            None => Ok(HashMap::new()),
            Some(StoredValue::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    /// Removes hash fields, dropping the key once the hash is empty.
    pub fn hdel(&self, key: &str, fields: &[&str]) -> StoreResult<usize> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("hdel");
        let (removed, now_empty) = match live_entry(&mut keyspace, key) {
            None => return Ok(0),
            Some(StoredEntry {
                value: StoredValue::Hash(hash),
                ..
            }) => {
                let removed = fields.iter().filter(|f| hash.remove(**f).is_some()).count();
                (removed, hash.is_empty())
            }
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };
        if now_empty {
            keyspace.remove(key);
        }
        Ok(removed)
    }

    // == Lists ==
    /// Prepends values one by one; returns the new list length.
    pub fn lpush(&self, key: &str, values: &[&str]) -> StoreResult<usize> {
        self.push(key, values, true)
    }

    /// Appends values; returns the new list length.
    pub fn rpush(&self, key: &str, values: &[&str]) -> StoreResult<usize> {
        self.push(key, values, false)
    }

    fn push(&self, key: &str, values: &[&str], front: bool) -> StoreResult<usize> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("push");
        let entry = entry_or_insert(&mut keyspace, key, || StoredValue::List(VecDeque::new()));
        match &mut entry.value {
            StoredValue::List(list) => {
                for value in values {
                    if front {
                        list.push_front(value.to_string());
                    } else {
                        list.push_back(value.to_string());
                    }
                }
                Ok(list.len())
            }
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    /// Inclusive range with negative indices counting from the tail.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("lrange");
        match live_entry(&mut keyspace, key).map(|entry| &entry.value) {
            None => Ok(Vec::new()),
            Some(StoredValue::List(list)) => Ok(match resolve_range(list.len(), start, stop) {
                Some((from, to)) => list.range(from..=to).cloned().collect(),
                None => Vec::new(),
            }),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    // == Sets ==
    /// Adds members; returns how many were not already present.
    pub fn sadd(&self, key: &str, members: &[&str]) -> StoreResult<usize> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("sadd");
        let entry = entry_or_insert(&mut keyspace, key, || StoredValue::Set(BTreeSet::new()));
        match &mut entry.value {
            StoredValue::Set(set) => Ok(members
                .iter()
                .filter(|m| set.insert(m.to_string()))
                .count()),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    pub fn srem(&self, key: &str, members: &[&str]) -> StoreResult<usize> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("srem");
        let (removed, now_empty) = match live_entry(&mut keyspace, key) {
            None => return Ok(0),
            Some(StoredEntry {
                value: StoredValue::Set(set),
                ..
            }) => {
                let removed = members.iter().filter(|m| set.remove(**m)).count();
                (removed, set.is_empty())
            }
            Some(_) => return Err(StoreError::WrongType(key.to_string())),
        };
        if now_empty {
            keyspace.remove(key);
        }
        Ok(removed)
    }

    /// Members in lexicographic order.
    pub fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("smembers");
        match live_entry(&mut keyspace, key).map(|entry| &entry.value) {
            None => Ok(Vec::new()),
            Some(StoredValue::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    // == Sorted Sets ==
    /// Adds or rescores a member; returns 1 if it was new.
    pub fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<u8> {
        if score.is_nan() {
            return Err(StoreError::InvalidValue("score is not a number".to_string()));
        }
        self.ensure_connected()?;
        let mut keyspace = self.lock("zadd");
        let entry = entry_or_insert(&mut keyspace, key, || {
            StoredValue::SortedSet(SortedSet::default())
        });
        match &mut entry.value {
            StoredValue::SortedSet(zset) => Ok(u8::from(zset.insert(member.to_string(), score))),
            _ => Err(StoreError::WrongType(key.to_string())),
        }
    }

    /// Members by ascending score (ties in insertion order), inclusive range.
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<(String, f64)>> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("zrange");
        match live_entry(&mut keyspace, key).map(|entry| &entry.value) {
            None => Ok(Vec::new()),
            Some(StoredValue::SortedSet(zset)) => Ok(match resolve_range(zset.len(), start, stop)
            {
                Some((from, to)) => zset
                    .iter()
                    .skip(from)
                    .take(to - from + 1)
                    .map(|(member, score)| (member.to_string(), score))
                    .collect(),
                None => Vec::new(),
            }),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }
}

// == Keyspace Helpers ==
/// Returns the live entry under `key`, removing it first if it has expired.
fn live_entry<'a>(keyspace: &'a mut Keyspace, key: &str) -> Option<&'a mut StoredEntry> {
    if keyspace.get(key).is_some_and(StoredEntry::is_expired) {
        keyspace.remove(key);
        debug!(key, op = "lazy_expire", "Removed expired entry");
    }
    keyspace.get_mut(key)
}

/// Returns the live entry under `key`, creating a persistent one if absent.
fn entry_or_insert<'a>(
    keyspace: &'a mut Keyspace,
    key: &str,
    empty: impl FnOnce() -> StoredValue,
) -> &'a mut StoredEntry {
    if keyspace.get(key).is_some_and(StoredEntry::is_expired) {
        keyspace.remove(key);
    }
    keyspace
        .entry(key.to_string())
        .or_insert_with(|| StoredEntry::persistent(empty()))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("get");
        match live_entry(&mut keyspace, key).map(|entry| &entry.value) {
            None => Ok(None),
            Some(StoredValue::Str(value)) => Ok(Some(value.clone())),
            Some(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("mget");
        Ok(keys
            .iter()
            .map(|key| match live_entry(&mut keyspace, key).map(|entry| &entry.value) {
                Some(StoredValue::Str(value)) => Some(value.clone()),
                _ => None,
            })
            .collect())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.ensure_connected()?;
        self.lock("set").insert(
            key.to_string(),
            StoredEntry::persistent(StoredValue::Str(value.to_string())),
        );
        Ok(())
    }

    async fn setex(&self, key: &str, ttl_seconds: i64, value: &str) -> StoreResult<()> {
        self.ensure_connected()?;
        self.lock("setex").insert(
            key.to_string(),
            StoredEntry::with_ttl(StoredValue::Str(value.to_string()), ttl_seconds),
        );
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> StoreResult<usize> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("del");
        let now = current_timestamp_ms();
        Ok(keys
            .iter()
            .filter(|key| {
                keyspace
                    .remove(key.as_str())
                    .is_some_and(|entry| !entry.is_expired_at(now))
            })
            .count())
    }

    async fn exists(&self, key: &str) -> StoreResult<u8> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("exists");
        Ok(u8::from(live_entry(&mut keyspace, key).is_some()))
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> StoreResult<u8> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("expire");
        match live_entry(&mut keyspace, key) {
            Some(entry) => {
                entry.expire_in(ttl_seconds);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        self.ensure_connected()?;
        let mut keyspace = self.lock("ttl");
        Ok(match live_entry(&mut keyspace, key) {
            None => TTL_MISSING,
            Some(entry) => entry.ttl_remaining_secs().unwrap_or(TTL_PERSISTENT),
        })
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.ensure_connected()?;
        let glob = GlobPattern::new(pattern)?;
        let mut keyspace = self.lock("keys");
        let now = current_timestamp_ms();

        let before = keyspace.len();
        keyspace.retain(|_, entry| !entry.is_expired_at(now));
        let purged = before - keyspace.len();
        if purged > 0 {
            debug!(pattern, purged, op = "keys", "Purged expired entries during scan");
        }

        let mut matched: Vec<String> = keyspace
            .keys()
            .filter(|key| glob.matches(key))
            .cloned()
            .collect();
        matched.sort();
        Ok(matched)
    }

    async fn ping(&self) -> StoreResult<String> {
        self.ensure_connected()?;
        Ok("PONG".to_string())
    }

    async fn quit(&self) -> StoreResult<()> {
        self.ensure_connected()?;
        self.disconnect();
        Ok(())
    }

    async fn flush_all(&self) -> StoreResult<()> {
        self.ensure_connected()?;
        self.lock("flush_all").clear();
        Ok(())
    }
}
