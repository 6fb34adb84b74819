//! Cache Manager Module
//!
//! Orchestrates the memory and persistent tiers: read-through promotion,
//! fallback population on miss, statistics and expiry sweeps.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, MemoryTier, PersistentTier, StatsCounters};
use crate::config::CacheConfig;
use crate::store::DurableStore;

// == Options ==
/// Per-call overrides for TTL and persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Falls back to the manager's default TTL
    pub ttl: Option<Duration>,
    /// Write to the persistent tier too (default true)
    pub persist: Option<bool>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = Some(persist);
        self
    }

    /// Keep the value out of the durable store.
    pub fn memory_only() -> Self {
        Self::default().with_persist(false)
    }
}

// == Sweep Report ==
/// Entries removed by one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub memory_removed: usize,
    pub persistent_removed: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.memory_removed + self.persistent_removed
    }
}

#[derive(Debug)]
struct MemoryState<V> {
    tier: MemoryTier<V>,
    counters: StatsCounters,
}

// == Cache Manager ==
/// Two-tier cache over values of type `V`.
///
/// The memory tier is always consulted first and is authoritative when it
/// holds a fresh entry. The lock guarding it is never held across durable
/// store I/O or a fallback, so a slow fallback only stalls its own call.
///
/// Concurrent `get_or_fetch` calls for the same cold key each run their own
/// fallback; calls are not coalesced.
#[derive(Debug)]
pub struct CacheManager<V> {
    memory: Mutex<MemoryState<V>>,
    persistent: PersistentTier,
    default_ttl: Duration,
    sweep_interval: Duration,
}

impl<V> CacheManager<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    // == Constructors ==
    /// Creates a cache with no persistent tier.
    pub fn memory_only(config: &CacheConfig) -> Self {
        Self::with_tier(config, PersistentTier::disabled(config.namespace_prefix.clone()))
    }

    /// Creates a cache backed by `store`, probing it once for availability.
    ///
    /// With `None`, or a store that fails the probe, the cache runs in
    /// memory-only mode for its whole lifetime.
    pub async fn new(config: &CacheConfig, store: Option<Arc<dyn DurableStore>>) -> Self {
        let persistent = match store {
            Some(store) => PersistentTier::probe(store, config.namespace_prefix.clone()).await,
            None => PersistentTier::disabled(config.namespace_prefix.clone()),
        };
        Self::with_tier(config, persistent)
    }

    fn with_tier(config: &CacheConfig, persistent: PersistentTier) -> Self {
        Self {
            memory: Mutex::new(MemoryState {
                tier: MemoryTier::new(config.max_cache_size),
                counters: StatsCounters::default(),
            }),
            persistent,
            default_ttl: config.default_ttl,
            sweep_interval: config.sweep_interval,
        }
    }

    // == Get ==
    /// Looks a key up in both tiers, promoting persistent hits into memory.
    ///
    /// Returns `None` on a miss; this is not an error.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.lookup(key, None).await
    }

    // == Get Or Fetch ==
    /// Looks a key up and, on a miss, runs `fallback` and caches its result
    /// with `options`.
    ///
    /// A fallback error is returned unchanged and nothing is cached.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: &str,
        options: CacheOptions,
        fallback: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.lookup(key, options.ttl).await {
            return Ok(value);
        }

        debug!("Invoking fallback for '{}'", key);
        let value = fallback().await?;
        self.set(key, value.clone(), options).await;
        Ok(value)
    }

    async fn lookup(&self, key: &str, promote_ttl: Option<Duration>) -> Option<V> {
        {
            let mut state = self.memory.lock().await;
            if let Some(value) = state.tier.get(key) {
                state.counters.record_hit();
                debug!("Memory hit for '{}'", key);
                return Some(value);
            }
        }

        if let Some(persisted) = self.persistent.get::<V>(key).await {
            // Keep the stored expiry unless the caller asked for a TTL
            let ttl = promote_ttl.unwrap_or(persisted.remaining_ttl);

            let mut state = self.memory.lock().await;
            if let Some(evicted) = state.tier.set(key, persisted.value.clone(), ttl) {
                state.counters.record_eviction();
                debug!("Evicted '{}' while promoting '{}'", evicted, key);
            }
            state.counters.record_hit();
            debug!("Persistent hit for '{}', promoted to memory", key);
            return Some(persisted.value);
        }

        self.memory.lock().await.counters.record_miss();
        debug!("Cache miss for '{}'", key);
        None
    }

    // == Set ==
    /// Stores a value in memory and, unless disabled, in the persistent tier.
    ///
    /// Persistent failures are logged and dropped; the memory copy stays valid.
    pub async fn set(&self, key: &str, value: V, options: CacheOptions) {
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let persist = options.persist.unwrap_or(true) && self.persistent.is_available();

        let durable_copy = persist.then(|| value.clone());

        {
            let mut state = self.memory.lock().await;
            if let Some(evicted) = state.tier.set(key, value, ttl) {
                state.counters.record_eviction();
                debug!("Evicted '{}' to make room for '{}'", evicted, key);
            }
            state.counters.record_set();
        }

        if let Some(value) = durable_copy {
            if let Err(e) = self.persistent.set(key, &value, ttl).await {
                warn!("Keeping '{}' in memory only: {}", key, e);
            }
        }
    }

    // == Remove ==
    /// Removes a key from both tiers. True if either tier held a fresh copy.
    pub async fn remove(&self, key: &str) -> bool {
        let in_memory = self.memory.lock().await.tier.remove(key);
        let in_persistent = self.persistent.remove(key).await;
        in_memory || in_persistent
    }

    // == Clear ==
    /// Empties both tiers and resets all counters.
    pub async fn clear(&self) {
        {
            let mut state = self.memory.lock().await;
            state.tier.clear();
            state.counters.reset();
        }

        let removed = self.persistent.clear_namespace().await;
        info!("Cache cleared ({} persistent entries removed)", removed);
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let state = self.memory.lock().await;
        CacheStats::snapshot(
            &state.counters,
            state.tier.size(),
            state.tier.max_size(),
            self.persistent.is_available(),
        )
    }

    // == Sweep ==
    /// Removes expired entries from both tiers.
    ///
    /// Idempotent; overlapping sweeps are safe.
    pub async fn sweep(&self) -> SweepReport {
        let memory_removed = self.memory.lock().await.tier.purge_expired();
        let persistent_removed = self.persistent.purge_expired().await;

        SweepReport {
            memory_removed,
            persistent_removed,
        }
    }

    /// Interval the background sweep should run at.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Whether the persistent tier passed its startup probe.
    pub fn is_persistent(&self) -> bool {
        self.persistent.is_available()
    }
}
