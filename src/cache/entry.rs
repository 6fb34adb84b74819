//! Cache Entry Module
//!
//! Defines a single cached value together with its lifecycle timestamps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// A cached value plus lifecycle metadata.
///
/// `expires_at` is fixed when the entry is created; reads refresh
/// `last_accessed_at` only.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Caller-constructed key
    pub key: String,
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last read or write (Unix milliseconds)
    pub last_accessed_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Time-to-live the entry was created with
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry that expires `ttl` after `now`.
    pub fn new(key: impl Into<String>, value: V, ttl: Duration, now: u64) -> Self {
        Self {
            key: key.into(),
            value,
            created_at: now,
            last_accessed_at: now,
            expires_at: now.saturating_add(duration_ms(ttl)),
            ttl,
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    /// Checks expiry against the wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Touch ==
    pub fn touch(&mut self, now: u64) {
        self.last_accessed_at = now;
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Time left before `expires_at`, `Duration::ZERO` once it has passed.
pub fn remaining_ttl(expires_at: u64, now: u64) -> Duration {
    Duration::from_millis(expires_at.saturating_sub(now))
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub fn duration_ms(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
