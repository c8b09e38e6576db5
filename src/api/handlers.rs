//! API Handlers
//!
//! HTTP request handlers for each listing endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::warn;

use crate::cache::ListingCaches;
use crate::catalog::CatalogRepository;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::listing::ListingService;
use crate::models::{
    HealthResponse, InvalidateResponse, ListingRequest, ListingResponse, StatsResponse,
};
use crate::store::KeyValueStore;

/// Application state shared across all handlers.
///
/// Owns the one store handle; every cache namespace borrows it through
/// the listing service.
#[derive(Clone)]
pub struct AppState {
    /// Shared key-value store
    pub store: Arc<dyn KeyValueStore>,
    /// Listing pipeline over the caches and the catalog
    pub listing: Arc<ListingService>,
}

impl AppState {
    /// Creates a new AppState around an existing listing service.
    pub fn new(store: Arc<dyn KeyValueStore>, listing: ListingService) -> Self {
        Self {
            store,
            listing: Arc::new(listing),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the three cache namespaces on `store` with the configured TTLs.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        repository: Arc<dyn CatalogRepository>,
    ) -> Self {
        let caches = ListingCaches::from_config(store.clone(), config);
        let listing = ListingService::from_config(caches, repository, config);
        Self::new(store, listing)
    }
}

/// Handler for GET /articles
///
/// Serves one page of articles in offset or cursor mode.
pub async fn list_articles_handler(
    State(state): State<AppState>,
    Query(req): Query<ListingRequest>,
) -> Result<Json<ListingResponse>> {
    let query = req.into_query().map_err(ApiError::InvalidRequest)?;
    let response = state.listing.list(query).await?;
    Ok(Json(response))
}

/// Handler for DELETE /cache/results
///
/// Drops every cached listing payload; counts and tag ids survive.
pub async fn invalidate_results_handler(
    State(state): State<AppState>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state.listing.invalidate_results().await?;
    Ok(Json(InvalidateResponse { removed }))
}

/// Handler for GET /stats
///
/// Returns per-namespace cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.listing.caches().stats()))
}

/// Handler for GET /health
///
/// Reports `degraded` when the store does not answer a ping. Listings keep
/// working in that state, only slower.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = match state.store.ping().await {
        Ok(_) => true,
        Err(err) => {
            warn!(error = %err, "Store ping failed");
            false
        }
    };
    Json(HealthResponse::new(reachable))
}
