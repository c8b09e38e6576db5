//! API Routes
//!
//! Configures the Axum router with all listing endpoints.

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, invalidate_results_handler, list_articles_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /articles` - One page of articles, offset or cursor mode
/// - `DELETE /cache/results` - Drop cached listing payloads
/// - `GET /stats` - Per-namespace cache statistics
/// - `GET /health` - Store reachability
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/articles", get(list_articles_handler))
        .route("/cache/results", delete(invalidate_results_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
