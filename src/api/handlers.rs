//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Every cache
//! handler resolves its store from the `?store=` query parameter.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheStore, Fallback};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, AddResponse, DeleteManyRequest, DeleteResponse, DestroyResponse,
    ExistsResponse, FetchRequest, ForeverRequest, HealthResponse, SetRequest, SetResponse,
    StoreQuery, ValueResponse,
};
use crate::registry::StoreRegistry;
use crate::store::Store;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Configured stores
    pub registry: Arc<StoreRegistry>,
}

impl AppState {
    /// Creates a new AppState around the given registry.
    pub fn new(registry: StoreRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(StoreRegistry::new(config.stash.clone()))
    }

    async fn store(&self, query: &StoreQuery) -> Result<Arc<Store>> {
        self.registry.resolve(query.store.as_deref()).await
    }

    fn store_name<'a>(&'a self, query: &'a StoreQuery) -> &'a str {
        query
            .store
            .as_deref()
            .unwrap_or_else(|| self.registry.default_name())
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /cache/:key
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    check_key(&key)?;

    let store = state.store(&query).await?;
    store.set(&key, req.value, req.ttl).await?;
    debug!(store = %state.store_name(&query), key = %key, ttl = ?req.ttl, "Key set");

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /cache/:key
///
/// Responds 404 when the key is missing or expired.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<ValueResponse>> {
    let store = state.store(&query).await?;
    let value = store
        .get(&key)
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(ValueResponse::new(key, value)))
}

/// Handler for GET /cache/:key/exists
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<ExistsResponse>> {
    let store = state.store(&query).await?;
    let exists = store.has(&key).await?;

    Ok(Json(ExistsResponse { key, exists }))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<DeleteResponse>> {
    let store = state.store(&query).await?;
    let deleted = store.delete(&key).await?;

    Ok(Json(DeleteResponse { deleted }))
}

/// Handler for POST /batch/delete
pub async fn delete_many_handler(
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
    Json(req): Json<DeleteManyRequest>,
) -> Result<Json<DeleteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let store = state.store(&query).await?;
    let keys: Vec<&str> = req.keys.iter().map(String::as_str).collect();
    let deleted = store.delete_many(&keys).await?;
    debug!(store = %state.store_name(&query), requested = keys.len(), deleted, "Batch delete");

    Ok(Json(DeleteResponse { deleted }))
}

/// Handler for POST /cache/:key/fetch
///
/// Returns the stored value, or stores and returns `default`.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
    Json(req): Json<FetchRequest>,
) -> Result<Json<ValueResponse>> {
    check_key(&key)?;

    let store = state.store(&query).await?;
    let value = store.fetch(&key, Fallback::Value(req.default), req.ttl).await?;

    Ok(Json(ValueResponse::new(key, value)))
}

/// Handler for POST /cache/:key/add
pub async fn add_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
    Json(req): Json<SetRequest>,
) -> Result<Json<AddResponse>> {
    check_key(&key)?;

    let store = state.store(&query).await?;
    let added = store.add(&key, req.value, req.ttl).await?;

    Ok(Json(AddResponse { key, added }))
}

/// Handler for POST /cache/:key/pull
pub async fn pull_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<ValueResponse>> {
    let store = state.store(&query).await?;
    let value = store.pull(&key).await?.unwrap_or(Value::Null);

    Ok(Json(ValueResponse::new(key, value)))
}

/// Handler for PUT /cache/:key/forever
pub async fn forever_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
    Json(req): Json<ForeverRequest>,
) -> Result<Json<SetResponse>> {
    check_key(&key)?;

    let store = state.store(&query).await?;
    store.forever(&key, req.value).await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for DELETE /cache
///
/// Clears the selected store.
pub async fn destroy_handler(
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<DestroyResponse>> {
    let store = state.store(&query).await?;
    store.destroy().await?;

    let name = state.store_name(&query);
    info!(store = %name, kind = %store.kind(), "Store destroyed");

    Ok(Json(DestroyResponse::new(name)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.registry.names(),
        state.registry.default_name(),
    ))
}
