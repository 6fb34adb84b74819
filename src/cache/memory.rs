//! Memory Tier Module
//!
//! Bounded in-process map of cache entries with LRU eviction and lazy TTL
//! expiration.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, LruTracker};

// == Memory Tier ==
/// Capacity-limited LRU map. Statistics are kept by the caller; `set`
/// reports which key, if any, it evicted.
#[derive(Debug)]
pub struct MemoryTier<V> {
    entries: HashMap<String, CacheEntry<V>>,
    lru: LruTracker,
    max_size: usize,
}

impl<V: Clone> MemoryTier<V> {
    // == Constructor ==
    /// Creates an empty tier holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            max_size,
        }
    }

    // == Get ==
    /// Returns a fresh value and refreshes its recency.
    ///
    /// An expired entry is dropped on the spot and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, current_timestamp_ms())
    }

    pub(crate) fn get_at(&mut self, key: &str, now: u64) -> Option<V> {
        let entry = self.entries.get_mut(key)?;

        if entry.is_expired_at(now) {
            self.entries.remove(key);
            self.lru.remove(key);
            return None;
        }

        entry.touch(now);
        let value = entry.value.clone();
        self.lru.touch(key);
        Some(value)
    }

    // == Set ==
    /// Inserts or overwrites an entry expiring `ttl` from now.
    ///
    /// When the tier is full and `key` is new, the least recently used entry
    /// is evicted first and its key returned.
    pub fn set(&mut self, key: &str, value: V, ttl: Duration) -> Option<String> {
        self.set_at(key, value, ttl, current_timestamp_ms())
    }

    pub(crate) fn set_at(&mut self, key: &str, value: V, ttl: Duration, now: u64) -> Option<String> {
        let mut evicted = None;

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_size {
            if let Some(oldest) = self.lru.evict_oldest() {
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        // A zero-capacity tier stores nothing.
        if self.max_size == 0 {
            return evicted;
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(key, value, ttl, now));
        self.lru.touch(key);

        evicted
    }

    // == Remove ==
    /// Removes an entry, returning whether a fresh one was present.
    ///
    /// An expired entry is still dropped but counts as absent.
    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_at(key, current_timestamp_ms())
    }

    pub(crate) fn remove_at(&mut self, key: &str, now: u64) -> bool {
        self.lru.remove(key);
        self.entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Purge Expired ==
    /// Removes every expired entry, returning how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(current_timestamp_ms())
    }

    pub(crate) fn purge_expired_at(&mut self, now: u64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        expired.len()
    }

    /// Peeks at an entry without touching recency or checking expiry.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
