//! Cache Entry Module
//!
//! Defines the value/expiration pair shared by every backend, plus the
//! JSON text codec used by backends that persist or transport values.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::error::{CacheError, Result};

// == Cache Entry ==
/// A stored value and its optional expiration instant.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V = Value> {
    /// The stored value
    pub value: V,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// A TTL of `None` or `Some(0)` produces a permanent entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - Optional TTL in seconds
    pub fn new(value: V, ttl_seconds: Option<u64>) -> Self {
        Self {
            value,
            expires_at: expires_at_from_ttl(ttl_seconds),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiry against a caller-supplied clock reading.
    ///
    /// Used by sweeps so that a whole pass is judged against one instant.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        is_expired_at(self.expires_at, now_ms)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Longest TTL any backend is asked to honor (100 years), in seconds.
///
/// Keeps absolute expiry instants inside the signed 64-bit range that SQL
/// columns and Redis expiry arguments accept.
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Treats a missing or zero TTL as "no expiry" and caps the rest at
/// [`MAX_TTL_SECS`].
pub fn normalize_ttl(ttl_seconds: Option<u64>) -> Option<u64> {
    ttl_seconds
        .filter(|ttl| *ttl > 0)
        .map(|ttl| ttl.min(MAX_TTL_SECS))
}

/// Computes the absolute expiration instant for a TTL, if any.
pub fn expires_at_from_ttl(ttl_seconds: Option<u64>) -> Option<u64> {
    normalize_ttl(ttl_seconds)
        .map(|ttl| current_timestamp_ms().saturating_add(ttl.saturating_mul(1000)))
}

/// Expiry rule shared by the in-process and persisted tables.
pub fn is_expired_at(expires_at: Option<u64>, now_ms: u64) -> bool {
    match expires_at {
        Some(expires) => now_ms >= expires,
        None => false,
    }
}

// == Codec ==
/// Encodes a value into its stored text form.
pub fn encode_value(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Decodes stored text back into a value.
///
/// A payload that is not valid JSON is an error, never a cache miss.
pub fn decode_value(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| CacheError::Deserialization(e.to_string()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = CacheEntry::new(json!("test_value"), None);

        assert_eq!(entry.value, json!("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_zero_ttl_is_permanent() {
        let entry = CacheEntry::new(json!(1), Some(0));
        assert!(entry.expires_at.is_none());
        assert_eq!(
            entry,
            CacheEntry {
                value: json!(1),
                expires_at: None
            }
        );
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(json!("test_value"), Some(1));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(1100));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_huge_ttl_is_capped() {
        assert_eq!(normalize_ttl(Some(u64::MAX)), Some(MAX_TTL_SECS));
        assert_eq!(normalize_ttl(Some(30)), Some(30));

        let now = current_timestamp_ms();
        let expires_at = expires_at_from_ttl(Some(u64::MAX)).unwrap();
        assert!(expires_at > now);
        assert!(expires_at <= i64::MAX as u64);
        assert!(!CacheEntry::new(json!(1), Some(u64::MAX)).is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = CacheEntry {
            value: json!("test"),
            expires_at: Some(now),
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
        assert!(!entry.is_expired_at(now - 1));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_value("{not json").unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[test]
    fn test_codec_preserves_nested_values() {
        let value = json!({"n": 1, "tags": ["a", "b"], "ok": false, "none": null});
        let encoded = encode_value(&value).unwrap();
        assert_eq!(decode_value(&encoded).unwrap(), value);
    }
}
