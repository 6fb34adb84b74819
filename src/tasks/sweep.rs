//! Expiry Sweep Task
//!
//! Background task that periodically purges expired entries from both tiers,
//! bounding growth of the persistent namespace between accesses.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Shortest interval the sweep runs at; smaller values are raised to it.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a task that sweeps `cache` every `interval`.
///
/// The first sweep runs one full interval after spawning. Abort the returned
/// handle to stop the task; a sweep interrupted mid-way leaves the cache
/// consistent because every removal is independent.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheManager::<serde_json::Value>::memory_only(&config));
/// let sweep_handle = spawn_sweep_task(cache.clone(), config.sweep_interval);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<V>(cache: Arc<CacheManager<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    let interval = interval.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let report = cache.sweep().await;

            if report.total() > 0 {
                info!(
                    "Expiry sweep: removed {} memory and {} persistent entries",
                    report.memory_removed, report.persistent_removed
                );
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}
