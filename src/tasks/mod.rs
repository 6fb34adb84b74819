//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries from both cache tiers

mod sweep;

pub use sweep::{spawn_sweep_task, MIN_SWEEP_INTERVAL};
