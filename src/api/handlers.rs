//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::{CacheManager, CacheStats};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse,
};
use crate::store::{DurableStore, FileStore};

/// Cache type served over HTTP.
pub type JsonCache = CacheManager<Value>;

/// Application state shared across all handlers.
///
/// The cache is constructed by the host and injected here; handlers never
/// reach for a global instance.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<JsonCache>,
}

impl AppState {
    pub fn new(cache: JsonCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Builds the cache described by `config`: file-backed when `cache_dir`
    /// is set, memory-only otherwise.
    pub async fn from_config(config: &Config) -> Self {
        let store: Option<Arc<dyn DurableStore>> = config
            .cache_dir
            .as_ref()
            .map(|dir| Arc::new(FileStore::new(dir.clone())) as Arc<dyn DurableStore>);

        Self::new(CacheManager::new(&config.cache, store).await)
    }
}

/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let options = req.options();
    state.cache.set(&req.key, req.value, options).await;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if state.cache.remove(&key).await {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::cleared())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.is_persistent()))
}
