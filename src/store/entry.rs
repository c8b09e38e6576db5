//! Stored Entry Module
//!
//! Defines individual keyspace entries: a typed value plus an optional expiry.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

// == Stored Value ==
/// The typed payload held under a key.
///
/// Every variant lives in the same keyspace, so expiry, `del`, `exists` and
/// `keys` behave identically regardless of the value type.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Str(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Set(BTreeSet<String>),
    SortedSet(SortedSet),
}

// == Stored Entry ==
/// A single keyspace entry with value and expiry metadata.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored value
    pub value: StoredValue,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredEntry {
    /// Creates an entry that never expires.
    pub fn persistent(value: StoredValue) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry expiring `ttl_seconds` from now.
    ///
    /// A TTL of zero or less yields an entry that is already expired.
    pub fn with_ttl(value: StoredValue, ttl_seconds: i64) -> Self {
        Self {
            value,
            expires_at: Some(deadline_after(ttl_seconds)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its deadline.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    /// Resets the deadline to `ttl_seconds` from now.
    pub fn expire_in(&mut self, ttl_seconds: i64) {
        self.expires_at = Some(deadline_after(ttl_seconds));
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }

    /// Returns remaining TTL in whole seconds, rounded up.
    ///
    /// A key set with `setex(key, 10, ..)` reports 10 right after the write.
    pub fn ttl_remaining_secs(&self) -> Option<i64> {
        self.ttl_remaining_ms()
            .map(|ms| ms.div_ceil(1000) as i64)
    }
}

// == Sorted Set ==
/// Members ordered ascending by score, ties broken by first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    members: Vec<ScoredMember>,
    next_seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct ScoredMember {
    member: String,
    score: f64,
    seq: u64,
}

impl SortedSet {
    /// Inserts or rescores a member. Returns true if the member is new.
    ///
    /// A rescored member keeps its original insertion sequence.
    pub fn insert(&mut self, member: String, score: f64) -> bool {
        let added = match self.members.iter_mut().find(|m| m.member == member) {
            Some(existing) => {
                existing.score = score;
                false
            }
            None => {
                self.members.push(ScoredMember {
                    member,
                    score,
                    seq: self.next_seq,
                });
                self.next_seq += 1;
                true
            }
        };
        self.members.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        added
    }

    pub fn remove(&mut self, member: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.member != member);
        self.members.len() != before
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members with scores in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.members.iter().map(|m| (m.member.as_str(), m.score))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

fn deadline_after(ttl_seconds: i64) -> u64 {
    let now = current_timestamp_ms();
    if ttl_seconds <= 0 {
        now
    } else {
        now.saturating_add((ttl_seconds as u64).saturating_mul(1000))
    }
}

/// Resolves Redis-style inclusive `start..=stop` indices (negative counts from
/// the end) against a collection length.
pub fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}
