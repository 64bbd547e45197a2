//! Cache Module
//!
//! Entry model, fallback values and the store contract shared by every
//! backend.

mod entry;
mod fallback;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{
    current_timestamp_ms, decode_value, encode_value, expires_at_from_ttl, is_expired_at,
    normalize_ttl, CacheEntry, MAX_TTL_SECS,
};
pub use fallback::Fallback;
pub use store::CacheStore;

// == Public Constants ==
/// Default interval between background sweeps, in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
