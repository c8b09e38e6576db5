//! Cache Statistics Module
//!
//! Tracks per-namespace read and write outcomes.

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Counters for one cache namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Reads that returned a decodable value
    pub hits: u64,
    /// Reads that found nothing usable (absent, expired, undecodable or stale)
    pub misses: u64,
    /// Calls that failed at the store
    pub errors: u64,
    /// Successful writes
    pub writes: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was read yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Reclassifies a hit whose payload the caller rejected as outdated.
    pub fn record_stale(&mut self) {
        self.hits = self.hits.saturating_sub(1);
        self.misses += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_stale_read_counts_as_miss() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_stale();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_errors_do_not_affect_hit_rate() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_error();
        stats.record_write();
        assert_eq!(stats.hit_rate(), 1.0);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.writes, 1);
    }
}
