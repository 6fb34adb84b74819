//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check tier and manager invariants over generated inputs.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{build_request_key, CacheManager, CacheOptions, MemoryTier};
use crate::config::CacheConfig;
use crate::store::MemoryStore;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:/-]{1,64}"
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // Small key space so gets and removes actually hit
    let key = "k[0-9]";
    prop_oneof![
        (key, valid_value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Remove { key }),
    ]
}

fn test_config(max_cache_size: usize) -> CacheConfig {
    CacheConfig {
        max_cache_size,
        namespace_prefix: "prop_".to_string(),
        ..CacheConfig::default()
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Storing then immediately reading a key returns the stored value.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let rt = runtime();
        let retrieved = rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let cache: CacheManager<String> =
                CacheManager::new(&test_config(TEST_MAX_ENTRIES), Some(store)).await;
            cache.set(&key, value.clone(), CacheOptions::new().with_ttl(TEST_TTL)).await;
            cache.get(&key).await
        });

        prop_assert_eq!(retrieved, Some(value));
    }

    // The memory tier never exceeds capacity, and inserting N + k distinct
    // keys evicts exactly k of them.
    #[test]
    fn prop_capacity_enforcement(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..200),
        capacity in 1usize..50,
    ) {
        let mut tier = MemoryTier::new(capacity);
        let mut evictions = 0;

        for key in &keys {
            if tier.set(key, 0u8, TEST_TTL).is_some() {
                evictions += 1;
            }
            prop_assert!(tier.size() <= capacity);
        }

        prop_assert_eq!(tier.size(), keys.len().min(capacity));
        prop_assert_eq!(evictions, keys.len().saturating_sub(capacity));
    }

    // When the tier is full, the least recently accessed key is evicted.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::hash_set(valid_key_strategy(), 3..10),
        new_key in valid_key_strategy(),
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        prop_assume!(!keys.contains(&new_key));

        let mut tier = MemoryTier::new(keys.len());
        for key in &keys {
            tier.set(key, key.clone(), TEST_TTL);
        }

        // Re-access the oldest so the second one becomes the LRU candidate
        prop_assert!(tier.get(&keys[0]).is_some());

        let evicted = tier.set(&new_key, new_key.clone(), TEST_TTL);
        prop_assert_eq!(evicted.as_ref(), Some(&keys[1]));
        prop_assert!(tier.contains(&keys[0]));
        prop_assert!(tier.contains(&new_key));
    }

    // hits + misses equals the number of gets, and the hit rate matches.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let rt = runtime();
        let (stats, expected_hits, expected_gets, expected_sets) = rt.block_on(async {
            let cache: CacheManager<String> = CacheManager::memory_only(&test_config(5));
            let mut hits = 0u64;
            let mut gets = 0u64;
            let mut sets = 0u64;

            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(&key, value, CacheOptions::new()).await;
                        sets += 1;
                    }
                    CacheOp::Get { key } => {
                        gets += 1;
                        if cache.get(&key).await.is_some() {
                            hits += 1;
                        }
                    }
                    CacheOp::Remove { key } => {
                        cache.remove(&key).await;
                    }
                }
            }

            (cache.stats().await, hits, gets, sets)
        });

        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.hits + stats.misses, expected_gets);
        prop_assert_eq!(stats.sets, expected_sets);
        prop_assert!(stats.memory_size <= 5);

        let expected_rate = if expected_gets == 0 {
            0.0
        } else {
            expected_hits as f64 / expected_gets as f64 * 100.0
        };
        prop_assert!((stats.hit_rate - expected_rate).abs() < 1e-9);
    }

    // Request keys ignore parameter insertion order.
    #[test]
    fn prop_request_key_is_order_independent(
        params in prop::collection::btree_map("[a-z]{1,8}", 0i64..1000, 0..8),
    ) {
        let forward: serde_json::Map<String, serde_json::Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(*v)))
            .collect();
        let reversed: serde_json::Map<String, serde_json::Value> = params
            .iter()
            .rev()
            .map(|(k, v)| (k.clone(), serde_json::Value::from(*v)))
            .collect();

        prop_assert_eq!(
            build_request_key("GET", "/api/books", &serde_json::Value::Object(forward)),
            build_request_key("GET", "/api/books", &serde_json::Value::Object(reversed))
        );
    }
}

// Separate block with fewer cases for time-sensitive TTL tests
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // Once the TTL has elapsed, a get without fallback returns nothing,
    // whichever tier held the value.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy()
    ) {
        let rt = runtime();
        let (before, after) = rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let cache: CacheManager<String> =
                CacheManager::new(&test_config(TEST_MAX_ENTRIES), Some(store)).await;
            let options = CacheOptions::new().with_ttl(Duration::from_millis(30));

            cache.set(&key, value.clone(), options).await;
            let before = cache.get(&key).await;
            tokio::time::sleep(Duration::from_millis(80)).await;
            (before, cache.get(&key).await)
        });

        prop_assert_eq!(before, Some(value));
        prop_assert_eq!(after, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_keys_distinct_slots() {
        let keys: HashSet<String> = (0..20)
            .map(|page| {
                build_request_key("GET", "/api/books", &serde_json::json!({ "page": page }))
            })
            .collect();
        assert_eq!(keys.len(), 20);
    }
}
