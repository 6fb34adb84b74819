//! Persistent Tier Module
//!
//! Adapter that stores serialized cache entries in a `DurableStore` under a
//! namespace prefix. Every failure is absorbed here or reported as a
//! `CacheError` for the manager to log; nothing in this tier panics.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::entry::{current_timestamp_ms, duration_ms, remaining_ttl};
use crate::error::{CacheError, Result};
use crate::store::{DurableStore, StoreError};

// NUL never appears in built keys and is rejected at the HTTP surface
const PROBE_SUFFIX: &str = "\u{0}probe";
const PROBE_VALUE: &str = "1";

// == Stored Format ==
/// Lifecycle metadata persisted next to each value (Unix milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMetadata {
    pub created_at: u64,
    pub expires_at: u64,
    pub ttl_ms: u64,
}

impl StoredMetadata {
    fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, V> {
    value: &'a V,
    metadata: StoredMetadata,
}

#[derive(Deserialize)]
struct Envelope<V> {
    value: V,
    metadata: StoredMetadata,
}

/// Decodes only the metadata; the value is skipped.
#[derive(Deserialize)]
struct MetadataOnly {
    metadata: StoredMetadata,
}

/// A fresh value read back from the durable store.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedValue<V> {
    pub value: V,
    /// Time left before the stored `expires_at`
    pub remaining_ttl: Duration,
}

// == Persistent Tier ==
pub struct PersistentTier {
    store: Option<Arc<dyn DurableStore>>,
    prefix: String,
    available: bool,
}

impl std::fmt::Debug for PersistentTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentTier")
            .field("prefix", &self.prefix)
            .field("available", &self.available)
            .finish()
    }
}

impl PersistentTier {
    // == Constructors ==
    /// A tier with no backing store. Every operation is a no-op.
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self {
            store: None,
            prefix: prefix.into(),
            available: false,
        }
    }

    /// Probes `store` with a sentinel write/read/delete and keeps the result
    /// for the tier's lifetime.
    pub async fn probe(store: Arc<dyn DurableStore>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let sentinel = format!("{}{}", prefix, PROBE_SUFFIX);

        let available = match probe_store(store.as_ref(), &sentinel).await {
            Ok(()) => {
                info!("Persistent tier available (namespace '{}')", prefix);
                true
            }
            Err(e) => {
                warn!("Persistent tier disabled, running memory-only: {}", e);
                false
            }
        };

        Self {
            store: available.then_some(store),
            prefix,
            available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn store(&self) -> Option<&dyn DurableStore> {
        self.store.as_deref()
    }

    // == Get ==
    /// Reads and decodes a fresh entry.
    ///
    /// Expired or undecodable payloads are deleted and reported as absent.
    pub async fn get<V: DeserializeOwned>(&self, key: &str) -> Option<PersistedValue<V>> {
        let store = self.store()?;
        let storage_key = self.storage_key(key);

        let raw = match store.read(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Persistent read failed for '{}': {}", key, e);
                return None;
            }
        };

        let envelope: Envelope<V> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping undecodable persistent entry '{}': {}", key, e);
                self.delete_quietly(store, &storage_key).await;
                return None;
            }
        };

        let now = current_timestamp_ms();
        if envelope.metadata.is_expired_at(now) {
            debug!("Persistent entry '{}' expired", key);
            self.delete_quietly(store, &storage_key).await;
            return None;
        }

        Some(PersistedValue {
            value: envelope.value,
            remaining_ttl: remaining_ttl(envelope.metadata.expires_at, now),
        })
    }

    // == Set ==
    /// Serializes and writes an entry expiring `ttl` from now.
    ///
    /// A quota failure purges expired entries in the namespace and then
    /// gives up on this write.
    pub async fn set<V: Serialize>(&self, key: &str, value: &V, ttl: Duration) -> Result<()> {
        let Some(store) = self.store() else {
            return Err(CacheError::StorageUnavailable(
                "persistent tier disabled".to_string(),
            ));
        };

        let now = current_timestamp_ms();
        let ttl_ms = duration_ms(ttl);
        let envelope = EnvelopeRef {
            value,
            metadata: StoredMetadata {
                created_at: now,
                expires_at: now.saturating_add(ttl_ms),
                ttl_ms,
            },
        };

        let raw = serde_json::to_string(&envelope)?;

        match store.write(&self.storage_key(key), &raw).await {
            Ok(()) => Ok(()),
            Err(StoreError::QuotaExceeded(msg)) => {
                let purged = self.purge_expired().await;
                warn!(
                    "Quota exceeded writing '{}', purged {} expired entries, write dropped",
                    key, purged
                );
                Err(CacheError::QuotaExceeded(msg))
            }
            Err(e) => Err(e.into()),
        }
    }

    // == Remove ==
    /// Deletes an entry, returning whether a fresh one was stored.
    ///
    /// Expired or undecodable payloads are deleted too but count as absent.
    pub async fn remove(&self, key: &str) -> bool {
        let Some(store) = self.store() else {
            return false;
        };
        let storage_key = self.storage_key(key);

        let existed = match store.read(&storage_key).await {
            Ok(Some(raw)) => serde_json::from_str::<MetadataOnly>(&raw)
                .is_ok_and(|entry| !entry.metadata.is_expired_at(current_timestamp_ms())),
            _ => false,
        };
        if let Err(e) = store.delete(&storage_key).await {
            warn!("Persistent delete failed for '{}': {}", key, e);
            return false;
        }
        existed
    }

    // == Clear Namespace ==
    /// Deletes every key under this tier's prefix, returning the count.
    pub async fn clear_namespace(&self) -> usize {
        let Some(store) = self.store() else {
            return 0;
        };

        let keys = match store.list_keys(&self.prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Listing namespace '{}' failed: {}", self.prefix, e);
                return 0;
            }
        };

        let mut removed = 0;
        for storage_key in keys {
            match store.delete(&storage_key).await {
                Ok(()) => removed += 1,
                Err(e) => warn!("Persistent delete failed for '{}': {}", storage_key, e),
            }
        }
        removed
    }

    // == Purge Expired ==
    /// Deletes expired and undecodable entries in the namespace.
    ///
    /// Only metadata is decoded. Safe to run concurrently with itself.
    pub async fn purge_expired(&self) -> usize {
        let Some(store) = self.store() else {
            return 0;
        };

        let keys = match store.list_keys(&self.prefix).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Listing namespace '{}' failed: {}", self.prefix, e);
                return 0;
            }
        };

        let now = current_timestamp_ms();
        let probe_key = self.storage_key(PROBE_SUFFIX);
        let mut removed = 0;

        for storage_key in keys {
            if storage_key == probe_key {
                continue;
            }

            let raw = match store.read(&storage_key).await {
                Ok(Some(raw)) => raw,
                // Already gone, e.g. a concurrent sweep got there first
                Ok(None) => continue,
                Err(e) => {
                    warn!("Persistent read failed for '{}': {}", storage_key, e);
                    continue;
                }
            };

            let stale = match serde_json::from_str::<MetadataOnly>(&raw) {
                Ok(entry) => entry.metadata.is_expired_at(now),
                Err(_) => true,
            };

            if stale && store.delete(&storage_key).await.is_ok() {
                removed += 1;
            }
        }

        removed
    }

    async fn delete_quietly(&self, store: &dyn DurableStore, storage_key: &str) {
        if let Err(e) = store.delete(storage_key).await {
            warn!("Persistent delete failed for '{}': {}", storage_key, e);
        }
    }
}

async fn probe_store(store: &dyn DurableStore, sentinel: &str) -> std::result::Result<(), StoreError> {
    store.write(sentinel, PROBE_VALUE).await?;
    let read_back = store.read(sentinel).await?;
    store.delete(sentinel).await?;

    match read_back.as_deref() {
        Some(PROBE_VALUE) => Ok(()),
        _ => Err(StoreError::Unavailable(
            "probe value did not round-trip".to_string(),
        )),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;

    const PREFIX: &str = "test_";
    const TTL: Duration = Duration::from_secs(300);

    async fn create_tier() -> (PersistentTier, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let tier = PersistentTier::probe(store.clone(), PREFIX).await;
        (tier, store)
    }

    fn expired_payload(value: serde_json::Value) -> String {
        json!({
            "value": value,
            "metadata": {"created_at": 0, "expires_at": 1, "ttl_ms": 1}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_probe_available_leaves_no_sentinel() {
        let (tier, store) = create_tier().await;

        assert!(tier.is_available());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_probe_unavailable_store() {
        let tier = PersistentTier::probe(Arc::new(MemoryStore::unavailable()), PREFIX).await;

        assert!(!tier.is_available());
        assert_eq!(tier.get::<String>("k").await, None);
        assert!(matches!(
            tier.set("k", &"v", TTL).await,
            Err(CacheError::StorageUnavailable(_))
        ));
        assert!(!tier.remove("k").await);
        assert_eq!(tier.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn test_set_and_get_round_trip() {
        let (tier, store) = create_tier().await;

        tier.set("book:1", &json!({"title": "Rust"}), TTL).await.unwrap();

        let persisted = tier.get::<serde_json::Value>("book:1").await.unwrap();
        assert_eq!(persisted.value, json!({"title": "Rust"}));
        assert!(persisted.remaining_ttl <= TTL);
        assert!(persisted.remaining_ttl > Duration::from_secs(290));

        // Stored under the namespace prefix
        assert!(store.raw("test_book:1").await.is_some());
    }

    #[tokio::test]
    async fn test_get_expired_removes_raw_entry() {
        let (tier, store) = create_tier().await;
        store
            .write("test_old", &expired_payload(json!("stale")))
            .await
            .unwrap();

        assert_eq!(tier.get::<String>("old").await, None);
        assert_eq!(store.raw("test_old").await, None);
    }

    #[tokio::test]
    async fn test_get_undecodable_removes_raw_entry() {
        let (tier, store) = create_tier().await;
        store.write("test_bad", "not json").await.unwrap();

        assert_eq!(tier.get::<String>("bad").await, None);
        assert_eq!(store.raw("test_bad").await, None);
    }

    #[tokio::test]
    async fn test_serialization_failure_skips_write() {
        let (tier, store) = create_tier().await;

        // JSON object keys must be strings
        let mut value: HashMap<Vec<u8>, u32> = HashMap::new();
        value.insert(vec![1, 2], 3);

        let result = tier.set("k", &value, TTL).await;
        assert!(matches!(result, Err(CacheError::Serialization(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_quota_exceeded_purges_expired() {
        let store = Arc::new(MemoryStore::with_quota(200));
        let tier = PersistentTier::probe(store.clone(), PREFIX).await;
        store
            .write("test_old", &expired_payload(json!("x".repeat(60))))
            .await
            .unwrap();

        let result = tier.set("big", &"y".repeat(300), TTL).await;

        assert!(matches!(result, Err(CacheError::QuotaExceeded(_))));
        // Expired entry purged, failed write not retried
        assert_eq!(store.raw("test_old").await, None);
        assert_eq!(store.raw("test_big").await, None);
    }

    #[tokio::test]
    async fn test_remove_reports_existence() {
        let (tier, _store) = create_tier().await;

        tier.set("k", &1u32, TTL).await.unwrap();
        assert!(tier.remove("k").await);
        assert!(!tier.remove("k").await);
    }

    #[tokio::test]
    async fn test_remove_expired_reports_absent() {
        let (tier, store) = create_tier().await;
        store
            .write("test_old", &expired_payload(json!("stale")))
            .await
            .unwrap();
        store.write("test_bad", "not json").await.unwrap();

        assert!(!tier.remove("old").await);
        assert!(!tier.remove("bad").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sentinel_leaves_lookalike_user_key_alone() {
        let store = Arc::new(MemoryStore::new());
        let first = PersistentTier::probe(store.clone(), PREFIX).await;
        first.set("__probe__", &"mine", TTL).await.unwrap();

        // Another instance starting on the same namespace
        let second = PersistentTier::probe(store.clone(), PREFIX).await;

        assert!(second.is_available());
        assert_eq!(
            second.get::<String>("__probe__").await.map(|p| p.value),
            Some("mine".to_string())
        );
    }

    #[tokio::test]
    async fn test_clear_namespace_leaves_other_prefixes() {
        let (tier, store) = create_tier().await;

        tier.set("a", &1u32, TTL).await.unwrap();
        tier.set("b", &2u32, TTL).await.unwrap();
        store.write("other_c", "keep").await.unwrap();

        assert_eq!(tier.clear_namespace().await, 2);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.raw("other_c").await, Some("keep".to_string()));
    }

    #[tokio::test]
    async fn test_purge_expired_is_idempotent() {
        let (tier, store) = create_tier().await;

        tier.set("fresh", &1u32, TTL).await.unwrap();
        store.write("test_old", &expired_payload(json!(2))).await.unwrap();
        store.write("test_junk", "{").await.unwrap();

        let (first, second) = tokio::join!(tier.purge_expired(), tier.purge_expired());
        assert!(first + second >= 2);
        assert_eq!(store.len().await, 1);
        assert_eq!(tier.purge_expired().await, 0);
        assert_eq!(tier.get::<u32>("fresh").await.map(|p| p.value), Some(1));
    }
}
