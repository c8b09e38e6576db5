//! Error types for the pagination subsystem
//!
//! Provides unified error handling using thiserror. Only repository failures
//! are allowed to fail a listing; store and cache errors are logged and
//! degraded around by their call sites.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Failures raised by a key-value store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store is disconnected or unreachable
    #[error("Connection error: store is not connected")]
    Connection,

    /// The key holds a value of another type
    #[error("Wrong type: key '{0}' holds a different kind of value")]
    WrongType(String),

    /// An argument could not be interpreted (bad pattern, non-numeric score, ...)
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

// == Cache Error Enum ==
/// Failures raised while writing through a [`crate::cache::CacheService`].
#[derive(Error, Debug)]
pub enum CacheError {
    /// The underlying store rejected the call
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The value could not be encoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Repository Error Enum ==
/// Failures raised by the authoritative catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The backing store cannot be reached
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// The query was rejected or failed while executing
    #[error("Query failed: {0}")]
    Query(String),
}

// == API Error Enum ==
/// Error type returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The catalog could not serve the listing
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A cache maintenance call could not reach the store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Repository(RepositoryError::Unavailable(msg)) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            ApiError::Repository(RepositoryError::Query(msg)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            ApiError::Store(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Aliases ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
