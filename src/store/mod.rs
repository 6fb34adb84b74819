//! Durable Store Module
//!
//! The key/value backend the persistent tier writes through. The cache only
//! ever stores strings here; backends decide where they live.

mod file;
mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

// == Store Error ==
/// Failure reported by a durable store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend is out of space for this write
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The backend cannot be used at all
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Any other I/O failure
    #[error("Storage error: {0}")]
    Other(String),
}

/// Convenience Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Durable Store ==
/// Pluggable string key/value backend.
///
/// Implementations must tolerate repeated deletes of the same key and
/// concurrent callers; each call is independent.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Reads a raw value, `None` when the key is absent.
    async fn read(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes a raw value, replacing any previous one.
    async fn write(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Lists every key starting with `prefix`.
    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;
}
