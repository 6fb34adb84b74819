//! Tiered Cache - a two-tier cache engine
//!
//! A bounded LRU memory tier with TTL expiration in front of an optional
//! persistent tier backed by a pluggable durable store, with fallback
//! population on miss and hit/miss/eviction statistics.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{build_owner_key, build_request_key, CacheManager, CacheOptions, CacheStats};
pub use config::{CacheConfig, Config};
pub use error::CacheError;
pub use store::{DurableStore, FileStore, MemoryStore, StoreError};
pub use tasks::{spawn_sweep_task, MIN_SWEEP_INTERVAL};
