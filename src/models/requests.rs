//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Query string accepted by every cache route (`?store=name`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreQuery {
    /// Configured store name; the default store when absent
    #[serde(default)]
    pub store: Option<String>,
}

/// Request body for `PUT /cache/:key` and `POST /cache/:key/add`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store, any JSON value
    pub value: Value,
    /// Optional TTL in seconds; absent or 0 stores a permanent entry
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Request body for `POST /cache/:key/fetch`
#[derive(Debug, Clone, Deserialize)]
pub struct FetchRequest {
    /// Value stored and returned when the key is missing
    pub default: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Request body for `PUT /cache/:key/forever`
#[derive(Debug, Clone, Deserialize)]
pub struct ForeverRequest {
    pub value: Value,
}

/// Request body for `POST /batch/delete`
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteManyRequest {
    /// Keys to remove
    pub keys: Vec<String>,
}

impl DeleteManyRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.keys.iter().any(String::is_empty) {
            return Some("Keys cannot be empty".to_string());
        }
        None
    }
}

/// Validates a key taken from the request path.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let req: SetRequest = serde_json::from_str(r#"{"value": {"n": 1}}"#).unwrap();
        assert_eq!(req.value, json!({"n": 1}));
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let req: SetRequest = serde_json::from_str(r#"{"value": "hello", "ttl": 60}"#).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_set_request_keeps_null_value() {
        let req: SetRequest = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert_eq!(req.value, Value::Null);
    }

    #[test]
    fn test_fetch_request_deserialize() {
        let req: FetchRequest = serde_json::from_str(r#"{"default": [1, 2], "ttl": 5}"#).unwrap();
        assert_eq!(req.default, json!([1, 2]));
        assert_eq!(req.ttl, Some(5));
    }

    #[test]
    fn test_delete_many_validate() {
        let ok = DeleteManyRequest {
            keys: vec!["a".to_string(), "b".to_string()],
        };
        assert!(ok.validate().is_none());

        let bad = DeleteManyRequest {
            keys: vec!["a".to_string(), String::new()],
        };
        assert!(bad.validate().is_some());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_some());
        assert!(validate_key("user:1").is_none());
    }
}
