//! Listing Service Module
//!
//! Serves article pages through the result, count and tag caches. Cache
//! failures only cost latency: the repository is the single error source.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::{generate_cache_key, ListingCaches, SENTINEL_NONE, SENTINEL_NOT_APPLICABLE};
use crate::catalog::{CatalogRepository, FetchWindow, ListingFilters, Predicate, SortSpec};
use crate::config::Config;
use crate::error::{RepositoryError, StoreResult};
use crate::models::ListingResponse;
use crate::pagination::{
    build_where_clause, generate_page_info, offset_page_info, order_by, total_pages, Cursor,
    Direction,
};
use crate::tags::TagResolver;

/// A normalized listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filters: ListingFilters,
    pub sort: SortSpec,
    /// Offset page, 1-based
    pub page: u64,
    /// Page size; `None` takes the cursor's size, then the default
    pub limit: Option<u32>,
    /// Opaque cursor for the page after it
    pub after: Option<String>,
    /// Opaque cursor for the page before it; ignored when `after` is set
    pub before: Option<String>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            filters: ListingFilters::default(),
            sort: SortSpec::default(),
            page: 1,
            limit: None,
            after: None,
            before: None,
        }
    }
}

/// How the requested page is located.
#[derive(Debug, Clone)]
enum PageMode {
    Offset {
        page: u64,
    },
    Keyset {
        cursor: Cursor,
        token: String,
        direction: Direction,
    },
}

/// Fully resolved request: filters normalized, cursor checked, limit clamped.
#[derive(Debug, Clone)]
struct ListingPlan {
    filters: ListingFilters,
    fingerprint: String,
    sort: SortSpec,
    page: u64,
    limit: u32,
    mode: PageMode,
}

impl ListingPlan {
    fn cache_key(&self) -> String {
        let mut params: Vec<(&'static str, String)> = self.filters.cache_params();
        params.push(("sortBy", self.sort.field.as_str().to_string()));
        params.push(("sortOrder", self.sort.order.as_str().to_string()));
        params.push(("limit", self.limit.to_string()));
        match &self.mode {
            PageMode::Offset { page } => {
                params.push(("page", page.to_string()));
                params.push(("cursor", SENTINEL_NONE.to_string()));
                params.push(("direction", SENTINEL_NOT_APPLICABLE.to_string()));
            }
            PageMode::Keyset {
                token, direction, ..
            } => {
                params.push(("page", SENTINEL_NOT_APPLICABLE.to_string()));
                params.push(("cursor", token.clone()));
                params.push((
                    "direction",
                    match direction {
                        Direction::Forward => "after".to_string(),
                        Direction::Backward => "before".to_string(),
                    },
                ));
            }
        }
        generate_cache_key("articles", params)
    }

    fn count_key(&self) -> String {
        generate_cache_key("articles", [("filters", self.fingerprint.as_str())])
    }

    fn mode_name(&self) -> &'static str {
        match self.mode {
            PageMode::Offset { .. } => "offset",
            PageMode::Keyset { .. } => "keyset",
        }
    }
}

// == Listing Service ==
#[derive(Clone)]
pub struct ListingService {
    caches: ListingCaches,
    tags: TagResolver,
    repository: Arc<dyn CatalogRepository>,
    default_limit: u32,
    max_limit: u32,
}

impl ListingService {
    pub fn new(
        caches: ListingCaches,
        repository: Arc<dyn CatalogRepository>,
        default_limit: u32,
        max_limit: u32,
    ) -> Self {
        let tags = TagResolver::new(caches.tags.clone(), repository.clone());
        Self {
            caches,
            tags,
            repository,
            default_limit,
            max_limit: max_limit.max(1),
        }
    }

    pub fn from_config(
        caches: ListingCaches,
        repository: Arc<dyn CatalogRepository>,
        config: &Config,
    ) -> Self {
        Self::new(
            caches,
            repository,
            config.default_page_limit,
            config.max_page_limit,
        )
    }

    pub fn caches(&self) -> &ListingCaches {
        &self.caches
    }

    // == List ==
    /// Serves one page of articles.
    ///
    /// Only repository failures are returned. Store outages, undecodable or
    /// stale cache entries and failed write-backs degrade to repository reads.
    pub async fn list(&self, query: ListingQuery) -> Result<ListingResponse, RepositoryError> {
        let started = Instant::now();
        let plan = self.plan(query);
        let key = plan.cache_key();

        if let Some(cached) = self.caches.results.get::<ListingResponse>(&key).await {
            if cached.is_hydrated() {
                debug!(key = %key, mode = plan.mode_name(), "Serving cached listing");
                return Ok(cached);
            }
            self.caches.results.mark_stale(&key);
            warn!(
                key = %key,
                op = "get",
                duration_ms = started.elapsed().as_millis() as u64,
                "Cached listing has no page info, rebuilding"
            );
        }

        let response = self.build(&plan).await?;

        if let Err(err) = self.caches.results.set(&key, &response, None).await {
            warn!(
                key = %key,
                op = "set",
                duration_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "Failed to cache listing"
            );
        }

        info!(
            mode = plan.mode_name(),
            total = response.total,
            returned = response.items.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Built listing"
        );
        Ok(response)
    }

    /// Drops every cached listing payload. Counts and tag ids are kept.
    pub async fn invalidate_results(&self) -> StoreResult<usize> {
        self.caches.results.invalidate_pattern("*").await
    }

    fn plan(&self, query: ListingQuery) -> ListingPlan {
        let filters = query.filters.normalized();
        let fingerprint = filters.fingerprint();
        let sort = query.sort;
        let cursor_requested = query.after.is_some() || query.before.is_some();

        let requested = match (query.after, query.before) {
            (Some(token), _) => Some((token, Direction::Forward)),
            (None, Some(token)) => Some((token, Direction::Backward)),
            (None, None) => None,
        };

        let keyset = requested.and_then(|(token, direction)| {
            let Some(cursor) = Cursor::decode(&token) else {
                info!("Ignoring undecodable cursor, serving first page");
                return None;
            };
            if !cursor.validate_sort_condition(sort.field, sort.order) {
                warn!(
                    cursor_sort = %cursor.sort_field(),
                    cursor_order = %cursor.sort_order(),
                    sort = %sort.field,
                    order = %sort.order,
                    "Cursor minted under another ordering, serving first page"
                );
                return None;
            }
            if !cursor.validate_filters(&fingerprint) {
                warn!("Cursor minted under other filters, serving first page");
                return None;
            }
            Some((cursor, token, direction))
        });

        let limit = query
            .limit
            .or_else(|| keyset.as_ref().map(|(cursor, ..)| cursor.limit()))
            .unwrap_or(self.default_limit)
            .max(1)
            .min(self.max_limit);

        let (page, mode) = match keyset {
            Some((cursor, token, direction)) => (
                query.page.max(1),
                PageMode::Keyset {
                    cursor,
                    token,
                    direction,
                },
            ),
            None if cursor_requested => (1, PageMode::Offset { page: 1 }),
            None => {
                let page = query.page.max(1);
                (page, PageMode::Offset { page })
            }
        };

        ListingPlan {
            filters,
            fingerprint,
            sort,
            page,
            limit,
            mode,
        }
    }

    async fn build(&self, plan: &ListingPlan) -> Result<ListingResponse, RepositoryError> {
        let mut filter = plan.filters.base_predicate();
        if !plan.filters.tags.is_empty() && !filter.is_nothing() {
            let resolution = self.tags.resolve(&plan.filters.tags).await?;
            filter = filter.and(resolution.predicate(plan.filters.tag_mode));
        }

        if filter.is_nothing() {
            debug!(fingerprint = %plan.fingerprint, "Filters match nothing");
            return Ok(ListingResponse::empty(plan.page, plan.limit));
        }

        let total = self.total(plan, &filter).await?;
        let limit = plan.limit;

        let (items, page_info) = match &plan.mode {
            PageMode::Offset { page } => {
                let window = FetchWindow {
                    skip: (page - 1).saturating_mul(limit as u64),
                    take: limit as u64,
                };
                let rows = self
                    .repository
                    .find_many(&filter, &order_by(plan.sort, Direction::Forward), window)
                    .await?;
                let page_info =
                    offset_page_info(&rows, *page, limit, total, plan.sort, &plan.fingerprint);
                (rows, page_info)
            }
            PageMode::Keyset {
                cursor, direction, ..
            } => {
                let bounded = filter.clone().and(build_where_clause(cursor, *direction));
                let window = FetchWindow {
                    skip: 0,
                    take: limit as u64 + 1,
                };
                let rows = self
                    .repository
                    .find_many(&bounded, &order_by(plan.sort, *direction), window)
                    .await?;
                generate_page_info(rows, limit, plan.sort, &plan.fingerprint, *direction, true)
            }
        };

        Ok(ListingResponse {
            items,
            total,
            page: plan.page,
            limit,
            total_pages: total_pages(total, limit),
            page_info: Some(page_info),
        })
    }

    async fn total(&self, plan: &ListingPlan, filter: &Predicate) -> Result<u64, RepositoryError> {
        let started = Instant::now();
        let key = plan.count_key();
        if let Some(total) = self.caches.counts.get::<u64>(&key).await {
            return Ok(total);
        }

        let total = self.repository.count(filter).await?;
        if let Err(err) = self.caches.counts.set(&key, &total, None).await {
            warn!(
                key = %key,
                op = "set",
                duration_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "Failed to cache listing total"
            );
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        Article, CatalogSnapshot, InMemoryCatalog, OrderBy, SortField, SortOrder, Tag, TagMode,
    };
    use crate::store::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory catalog that counts repository round trips.
    struct CountingCatalog {
        inner: InMemoryCatalog,
        counts: AtomicUsize,
        fetches: AtomicUsize,
    }

    impl CountingCatalog {
        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn counts(&self) -> usize {
            self.counts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogRepository for CountingCatalog {
        async fn count(&self, filter: &Predicate) -> Result<u64, RepositoryError> {
            self.counts.fetch_add(1, Ordering::SeqCst);
            self.inner.count(filter).await
        }

        async fn find_many(
            &self,
            filter: &Predicate,
            order_by: &[OrderBy],
            window: FetchWindow,
        ) -> Result<Vec<Article>, RepositoryError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.find_many(filter, order_by, window).await
        }

        async fn find_tags(&self, names: &[String]) -> Result<Vec<Tag>, RepositoryError> {
            self.inner.find_tags(names).await
        }
    }

    fn article(id: i64, hour: i64, quality_score: f64, tags: Vec<i64>) -> Article {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
        Article {
            id,
            title: format!("Article {id}"),
            source_id: id % 2,
            tags,
            published_at: at,
            created_at: at,
            quality_score,
        }
    }

    /// Seven articles; ids 2..=4 share a publication time.
    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            tags: vec![
                Tag {
                    id: 1,
                    name: "rust".to_string(),
                },
                Tag {
                    id: 2,
                    name: "databases".to_string(),
                },
            ],
            articles: vec![
                article(1, 1, 0.2, vec![1]),
                article(2, 5, 0.9, vec![1, 2]),
                article(3, 5, 0.4, vec![]),
                article(4, 5, 0.7, vec![2]),
                article(5, 8, 0.1, vec![1]),
                article(6, 9, 0.8, vec![]),
                article(7, 12, 0.5, vec![1]),
            ],
        }
    }

    fn setup() -> (Arc<MemoryStore>, Arc<CountingCatalog>, ListingService) {
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(CountingCatalog {
            inner: InMemoryCatalog::new(snapshot()),
            counts: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        });
        let caches = ListingCaches::new(store.clone(), 900, 120, 86_400);
        let service = ListingService::new(caches, catalog.clone(), 3, 5);
        (store, catalog, service)
    }

    fn ids(response: &ListingResponse) -> Vec<i64> {
        response.items.iter().map(|article| article.id).collect()
    }

    fn page_info(response: &ListingResponse) -> crate::pagination::PageInfo {
        response.page_info.clone().unwrap()
    }

    #[tokio::test]
    async fn test_offset_pages_and_cache_hit() {
        let (_store, catalog, service) = setup();

        let first = service.list(ListingQuery::default()).await.unwrap();
        assert_eq!(ids(&first), vec![7, 6, 5]);
        assert_eq!(first.total, 7);
        assert_eq!(first.total_pages, 3);
        assert!(page_info(&first).has_next_page);
        assert!(!page_info(&first).has_previous_page);

        let again = service.list(ListingQuery::default()).await.unwrap();
        assert_eq!(again, first);
        assert_eq!(catalog.fetches(), 1);

        let third = service
            .list(ListingQuery {
                page: 3,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&third), vec![1]);
        assert!(!page_info(&third).has_next_page);
        assert!(page_info(&third).has_previous_page);
        // total served from the count cache
        assert_eq!(catalog.counts(), 1);
    }

    #[tokio::test]
    async fn test_cursor_walk_through_ties() {
        let (_store, _catalog, service) = setup();

        let first = service.list(ListingQuery::default()).await.unwrap();
        let second = service
            .list(ListingQuery {
                after: page_info(&first).end_cursor,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&second), vec![4, 3, 2]);
        assert!(page_info(&second).has_previous_page);
        assert!(page_info(&second).has_next_page);

        let last = service
            .list(ListingQuery {
                after: page_info(&second).end_cursor,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&last), vec![1]);
        assert!(!page_info(&last).has_next_page);

        let back = service
            .list(ListingQuery {
                before: page_info(&second).start_cursor,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ids(&back), ids(&first));
        assert!(!page_info(&back).has_previous_page);
        assert!(page_info(&back).has_next_page);
    }

    #[tokio::test]
    async fn test_cursor_from_other_sort_falls_back_to_first_page() {
        let (_store, _catalog, service) = setup();
        let by_quality = SortSpec::new(SortField::QualityScore, SortOrder::Desc);

        let first = service.list(ListingQuery::default()).await.unwrap();
        let switched = service
            .list(ListingQuery {
                sort: by_quality,
                after: page_info(&first).end_cursor,
                page: 2,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(ids(&switched), vec![2, 6, 4]);
        assert_eq!(switched.page, 1);
        assert!(!page_info(&switched).has_previous_page);
    }

    #[tokio::test]
    async fn test_cursor_from_other_filters_falls_back() {
        let (_store, _catalog, service) = setup();

        let first = service.list(ListingQuery::default()).await.unwrap();
        let filtered = ListingFilters {
            source_id: Some(1),
            ..Default::default()
        };
        let response = service
            .list(ListingQuery {
                filters: filtered,
                after: page_info(&first).end_cursor,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(ids(&response), vec![7, 5, 3]);
        assert!(!page_info(&response).has_previous_page);
    }

    #[tokio::test]
    async fn test_garbage_cursor_serves_first_page() {
        let (_store, _catalog, service) = setup();

        let response = service
            .list(ListingQuery {
                after: Some("definitely-not-a-cursor".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(ids(&response), vec![7, 6, 5]);
    }

    #[tokio::test]
    async fn test_stale_payload_is_rebuilt() {
        let (store, catalog, service) = setup();
        service.list(ListingQuery::default()).await.unwrap();

        let legacy = r#"{"items":[],"total":0,"page":1,"limit":3,"totalPages":0}"#;
        for key in store.keys("cache:results:*").await.unwrap() {
            store.set(&key, legacy).await.unwrap();
        }

        let rebuilt = service.list(ListingQuery::default()).await.unwrap();
        assert_eq!(ids(&rebuilt), vec![7, 6, 5]);
        assert!(rebuilt.is_hydrated());
        assert_eq!(catalog.fetches(), 2);

        let stats = service.caches().results.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.writes, 2);
    }

    #[tokio::test]
    async fn test_serves_from_repository_when_store_is_down() {
        let (store, catalog, service) = setup();
        store.disconnect();

        let response = service
            .list(ListingQuery {
                filters: ListingFilters {
                    tags: vec!["rust".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(ids(&response), vec![7, 5, 2]);
        assert_eq!(response.total, 4);
        assert_eq!(catalog.counts(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_tag_matches_nothing() {
        let (_store, catalog, service) = setup();

        let response = service
            .list(ListingQuery {
                filters: ListingFilters {
                    tags: vec!["rust".to_string(), "cobol".to_string()],
                    tag_mode: TagMode::All,
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(response.items.is_empty());
        assert_eq!(response.total, 0);
        assert_eq!(catalog.counts(), 0);
        assert_eq!(catalog.fetches(), 0);
    }

    #[tokio::test]
    async fn test_any_mode_uses_resolved_tags_only() {
        let (_store, _catalog, service) = setup();

        let response = service
            .list(ListingQuery {
                filters: ListingFilters {
                    tags: vec!["databases".to_string(), "cobol".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(ids(&response), vec![4, 2]);
    }

    #[tokio::test]
    async fn test_limit_is_clamped() {
        let (_store, _catalog, service) = setup();

        let response = service
            .list(ListingQuery {
                limit: Some(1_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.limit, 5);
        assert_eq!(response.items.len(), 5);

        let response = service
            .list(ListingQuery {
                limit: Some(0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.limit, 1);
    }

    #[tokio::test]
    async fn test_invalidate_results_keeps_counts_and_tags() {
        let (store, catalog, service) = setup();
        let query = ListingQuery {
            filters: ListingFilters {
                tags: vec!["rust".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        service.list(query.clone()).await.unwrap();

        assert_eq!(service.invalidate_results().await.unwrap(), 1);
        assert!(store.keys("cache:results:*").await.unwrap().is_empty());
        assert_eq!(store.keys("cache:counts:*").await.unwrap().len(), 1);
        assert_eq!(store.keys("cache:tags:*").await.unwrap().len(), 1);

        service.list(query).await.unwrap();
        assert_eq!(catalog.fetches(), 2);
        assert_eq!(catalog.counts(), 1);
    }
}
