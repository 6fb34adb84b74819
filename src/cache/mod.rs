//! Cache Module
//!
//! Two-tier caching: a bounded LRU memory tier with TTL expiration in front
//! of an optional persistent tier.

mod entry;
mod keys;
mod lru;
mod manager;
mod memory;
mod persistent;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use keys::{build_owner_key, build_request_key};
pub use lru::LruTracker;
pub use manager::{CacheManager, CacheOptions, SweepReport};
pub use memory::MemoryTier;
pub use persistent::{PersistedValue, PersistentTier, StoredMetadata};
pub use stats::{hit_rate_percent, CacheStats, StatsCounters};
