//! Store Module
//!
//! The closed set of backends behind the one cache contract.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::backends::{MemoryStore, PersistedStore, RemoteStore};
use crate::cache::{CacheStore, Fallback};
use crate::config::StoreKind;
use crate::error::{CacheError, Result};

/// A constructed cache store of one of the supported kinds.
#[derive(Debug)]
pub enum Store {
    Memory(MemoryStore),
    Remote(RemoteStore),
    Persisted(PersistedStore),
}

impl Store {
    /// Backend kind of this store.
    pub fn kind(&self) -> StoreKind {
        match self {
            Store::Memory(_) => StoreKind::Memory,
            Store::Remote(_) => StoreKind::RemoteKv,
            Store::Persisted(_) => StoreKind::Persisted,
        }
    }

    fn backend(&self) -> &dyn CacheStore {
        match self {
            Store::Memory(store) => store,
            Store::Remote(store) => store,
            Store::Persisted(store) => store,
        }
    }

    // == Typed Helpers ==

    /// Reads a value and converts it into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(value) => from_value(value).map(Some),
            None => Ok(None),
        }
    }

    /// Converts `value` to JSON and stores it.
    pub async fn set_as<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> Result<()> {
        self.set(key, to_value(value)?, ttl).await
    }

    /// Typed [`fetch`](CacheStore::fetch).
    pub async fn fetch_as<T: DeserializeOwned>(
        &self,
        key: &str,
        fallback: Fallback,
        ttl: Option<u64>,
    ) -> Result<T> {
        from_value(self.fetch(key, fallback, ttl).await?)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| CacheError::Serialization(e.to_string()))
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CacheError::Deserialization(e.to_string()))
}

impl From<MemoryStore> for Store {
    fn from(store: MemoryStore) -> Self {
        Store::Memory(store)
    }
}

impl From<RemoteStore> for Store {
    fn from(store: RemoteStore) -> Self {
        Store::Remote(store)
    }
}

impl From<PersistedStore> for Store {
    fn from(store: PersistedStore) -> Self {
        Store::Persisted(store)
    }
}

#[async_trait]
impl CacheStore for Store {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.backend().get(key).await
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        self.backend().set(key, value, ttl).await
    }

    async fn has(&self, key: &str) -> Result<bool> {
        self.backend().has(key).await
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        self.backend().delete_many(keys).await
    }

    async fn destroy(&self) -> Result<()> {
        self.backend().destroy().await
    }
}
