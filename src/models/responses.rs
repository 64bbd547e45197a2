//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

/// Response body carrying a key and its value
/// (`GET /cache/:key`, `POST /cache/:key/fetch`, `POST /cache/:key/pull`).
///
/// `value` is `null` when `pull` found nothing.
#[derive(Debug, Clone, Serialize)]
pub struct ValueResponse {
    pub key: String,
    pub value: Value,
}

impl ValueResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for `PUT /cache/:key` and `PUT /cache/:key/forever`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for `GET /cache/:key/exists`
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub key: String,
    pub exists: bool,
}

/// Response body for `DELETE /cache/:key` and `POST /batch/delete`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Number of keys actually removed
    pub deleted: u64,
}

/// Response body for `POST /cache/:key/add`
#[derive(Debug, Clone, Serialize)]
pub struct AddResponse {
    pub key: String,
    /// False when an unexpired entry already existed
    pub added: bool,
}

/// Response body for `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct DestroyResponse {
    pub message: String,
    /// Name of the store that was cleared
    pub store: String,
}

impl DestroyResponse {
    pub fn new(store: impl Into<String>) -> Self {
        let store = store.into();
        Self {
            message: format!("Store '{}' cleared", store),
            store,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Configured store names
    pub stores: Vec<String>,
    pub default_store: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(stores: Vec<String>, default_store: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            stores,
            default_store: default_store.into(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
