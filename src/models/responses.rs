//! Response DTOs for the listing API
//!
//! Defines the structure of outgoing HTTP response bodies. The listing
//! payload doubles as the cached value in the result namespace.

use serde::{Deserialize, Serialize};

use crate::cache::ListingCacheStats;
use crate::catalog::Article;
use crate::pagination::PageInfo;

/// One page of articles (GET /articles)
///
/// # Fields
/// - `items`: Articles in display order
/// - `total`: Rows matching the filters, possibly slightly stale
/// - `page`: Requested page number; informational in cursor mode
/// - `limit`: Effective page size after clamping
/// - `total_pages`: `ceil(total / limit)`
/// - `page_info`: Navigation metadata
///
/// A payload read back from cache without `page_info` predates cursor
/// navigation and must be rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub items: Vec<Article>,
    pub total: u64,
    pub page: u64,
    pub limit: u32,
    pub total_pages: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_info: Option<PageInfo>,
}

impl ListingResponse {
    /// Empty page, used when the filters cannot match anything.
    pub fn empty(page: u64, limit: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            limit,
            total_pages: 0,
            page_info: Some(PageInfo::default()),
        }
    }

    /// True when the payload carries navigation metadata.
    pub fn is_hydrated(&self) -> bool {
        self.page_info.is_some()
    }
}

/// Response body for DELETE /cache/results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateResponse {
    /// Number of cached listing payloads removed
    pub removed: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Counters per cache namespace
    pub caches: ListingCacheStats,
    /// Hit rate across all namespaces
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from per-namespace statistics
    pub fn new(caches: ListingCacheStats) -> Self {
        let hits = caches.results.hits + caches.counts.hits + caches.tags.hits;
        let misses = caches.results.misses + caches.counts.misses + caches.tags.misses;
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 {
            hits as f64 / total_requests as f64
        } else {
            0.0
        };
        Self { caches, hit_rate }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" when the store answers, "degraded" otherwise
    pub status: String,
    /// Store reachability
    pub store: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(store_reachable: bool) -> Self {
        let (status, store) = if store_reachable {
            ("healthy", "up")
        } else {
            ("degraded", "down")
        };
        Self {
            status: status.to_string(),
            store: store.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
