//! Catalog Pager - cache-backed cursor pagination for article listings
//!
//! Provides a Redis-like in-memory store with TTL, namespaced JSON caches,
//! batched tag resolution and keyset pagination with offset fallback.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod listing;
mod lock;
pub mod models;
pub mod pagination;
pub mod store;
pub mod tags;

pub use api::{create_router, AppState};
pub use config::Config;
pub use listing::{ListingQuery, ListingService};
pub use store::{KeyValueStore, MemoryStore};
