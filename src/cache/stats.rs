//! Cache Statistics Module
//!
//! Tracks hit, miss, set and eviction counters for a cache manager.

use serde::Serialize;

// == Counters ==
/// Raw counters owned by the cache manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsCounters {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
}

impl StatsCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self) {
        self.sets += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Cache Stats ==
/// Point-in-time statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Gets satisfied by either tier
    pub hits: u64,
    /// Gets that found nothing fresh in either tier
    pub misses: u64,
    /// Explicit or fallback-populated sets
    pub sets: u64,
    /// Memory tier capacity evictions
    pub evictions: u64,
    /// `hits / (hits + misses) * 100`, 0 before any get
    pub hit_rate: f64,
    /// Entries currently held in the memory tier
    pub memory_size: usize,
    /// Memory tier capacity
    pub max_size: usize,
    /// Whether the persistent tier passed its startup probe
    pub persistent_available: bool,
}

impl CacheStats {
    // == Constructor ==
    /// Builds a snapshot from counters and tier sizes.
    pub fn snapshot(
        counters: &StatsCounters,
        memory_size: usize,
        max_size: usize,
        persistent_available: bool,
    ) -> Self {
        Self {
            hits: counters.hits,
            misses: counters.misses,
            sets: counters.sets,
            evictions: counters.evictions,
            hit_rate: hit_rate_percent(counters.hits, counters.misses),
            memory_size,
            max_size,
            persistent_available,
        }
    }
}

// == Hit Rate ==
/// Hit rate in percent, or 0.0 if no requests have been made.
pub fn hit_rate_percent(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64 * 100.0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let counters = StatsCounters::default();
        assert_eq!(counters.hits, 0);
        assert_eq!(counters.misses, 0);
        assert_eq!(counters.sets, 0);
        assert_eq!(counters.evictions, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(hit_rate_percent(0, 0), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        assert_eq!(hit_rate_percent(3, 0), 100.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        assert_eq!(hit_rate_percent(1, 1), 50.0);
        assert!((hit_rate_percent(2, 1) - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_counters_reset() {
        let mut counters = StatsCounters::default();
        counters.record_hit();
        counters.record_miss();
        counters.record_set();
        counters.record_eviction();
        counters.reset();

        assert_eq!(counters, StatsCounters::default());
    }

    #[test]
    fn test_snapshot() {
        let mut counters = StatsCounters::default();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();
        counters.record_miss();
        counters.record_eviction();

        let stats = CacheStats::snapshot(&counters, 4, 100, true);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.hit_rate, 75.0);
        assert_eq!(stats.memory_size, 4);
        assert_eq!(stats.max_size, 100);
        assert!(stats.persistent_available);
    }
}
