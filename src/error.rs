//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

// == Cache Error Enum ==
/// Unified error type for the cache engine and its HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in any tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be encoded or decoded for the persistent tier
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Persistent tier is disabled for this instance
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Durable store ran out of space
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other durable store failure
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::QuotaExceeded(msg) => CacheError::QuotaExceeded(msg),
            StoreError::Unavailable(msg) => CacheError::StorageUnavailable(msg),
            StoreError::Other(msg) => CacheError::Store(msg),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::StorageUnavailable(_) | CacheError::QuotaExceeded(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
