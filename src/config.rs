//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default namespace prefix for keys in the durable store.
pub const DEFAULT_NAMESPACE_PREFIX: &str = "rct_cache_";

// == Cache Config ==
/// Parameters of a single cache manager instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when a set does not specify one
    pub default_ttl: Duration,
    /// Memory tier capacity in entries
    pub max_cache_size: usize,
    /// Prefix isolating this cache's keys in a shared durable store
    pub namespace_prefix: String,
    /// Interval between background expiry sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_cache_size: 100,
            namespace_prefix: DEFAULT_NAMESPACE_PREFIX.to_string(),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

// == Server Config ==
/// Process configuration for the hosting binary.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Directory for the file-backed durable store; None = memory-only
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `MAX_CACHE_SIZE` - Memory tier capacity (default: 100)
    /// - `NAMESPACE_PREFIX` - Durable store key prefix (default: `rct_cache_`)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DIR` - Durable store directory (default: unset)
    pub fn from_env() -> Self {
        let defaults = CacheConfig::default();

        Self {
            cache: CacheConfig {
                default_ttl: parse_var::<u64>("DEFAULT_TTL")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.default_ttl),
                max_cache_size: parse_var("MAX_CACHE_SIZE").unwrap_or(defaults.max_cache_size),
                namespace_prefix: env::var("NAMESPACE_PREFIX")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .unwrap_or(defaults.namespace_prefix),
                sweep_interval: parse_var::<u64>("SWEEP_INTERVAL")
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.sweep_interval),
            },
            server_port: parse_var("SERVER_PORT").unwrap_or(3000),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            cache_dir: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
