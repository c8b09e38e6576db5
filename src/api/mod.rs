//! API Module
//!
//! HTTP handlers and routing for the article listing API.
//!
//! # Endpoints
//! - `GET /articles` - Paginated, filtered article listing
//! - `DELETE /cache/results` - Invalidate cached listings
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
