//! Error types for cache stores
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for every store backend and the HTTP front.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid or incomplete store configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No store is configured under the requested name
    #[error("Unknown cache store: {0}")]
    UnknownStore(String),

    /// The configured backend kind is not supported
    #[error("Invalid store kind '{0}', supported kinds are memory, remote-kv and persisted")]
    UnknownKind(String),

    /// Remote key/value service failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Persisted table failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Blocking statement task failed to complete
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Value could not be encoded for storage
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored payload could not be decoded
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Fallback producer failed
    #[error("Fallback failed: {0}")]
    Fallback(#[source] anyhow::Error),

    /// Key not found (HTTP front only; stores report misses as `None`)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Returns true for failures of the underlying resource.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            CacheError::Redis(_) | CacheError::Sqlite(_) | CacheError::Task(_)
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) | CacheError::UnknownStore(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            err if err.is_resource() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
