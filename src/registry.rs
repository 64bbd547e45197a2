//! Store Registry
//!
//! Resolves configured store names into constructed stores. Each name is
//! built once and shared afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::backends::{MemoryStore, PersistedStore, RedisConnection, RemoteStore, SqliteConnection};
use crate::config::{StashConfig, StoreConfig, StoreKind};
use crate::error::Result;
use crate::store::Store;

/// Builds and caches the stores named in a [`StashConfig`].
#[derive(Debug)]
pub struct StoreRegistry {
    config: StashConfig,
    instances: Mutex<HashMap<String, Arc<Store>>>,
}

impl StoreRegistry {
    pub fn new(config: StashConfig) -> Self {
        Self {
            config,
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// Name of the default store.
    pub fn default_name(&self) -> &str {
        &self.config.default_store
    }

    /// Configured store names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.config.stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the store configured under `name`, building it on first use.
    ///
    /// Construction only validates configuration; connections are opened
    /// by the first operation.
    pub async fn store(&self, name: &str) -> Result<Arc<Store>> {
        let mut instances = self.instances.lock().await;
        if let Some(store) = instances.get(name) {
            return Ok(store.clone());
        }

        let config = self.config.store(name)?;
        let store = Arc::new(self.build(name, config)?);
        info!(store = %name, kind = %config.kind, "Store created");

        instances.insert(name.to_string(), store.clone());
        Ok(store)
    }

    /// Returns the default store.
    pub async fn default_store(&self) -> Result<Arc<Store>> {
        self.store(&self.config.default_store).await
    }

    /// Returns the named store, or the default store when `name` is `None`.
    pub async fn resolve(&self, name: Option<&str>) -> Result<Arc<Store>> {
        match name {
            Some(name) => self.store(name).await,
            None => self.default_store().await,
        }
    }

    fn build(&self, name: &str, config: &StoreConfig) -> Result<Store> {
        let store: Store = match config.kind {
            StoreKind::Memory => MemoryStore::new(name, config.sweep_interval()).into(),
            StoreKind::RemoteKv => {
                let url = self.config.datastore_for(name, config)?;
                let connection = RedisConnection::open(url)?;
                let store = RemoteStore::new(name, Arc::new(connection));
                match &config.key_prefix {
                    Some(prefix) => store.with_key_prefix(prefix.clone()).into(),
                    None => store.into(),
                }
            }
            StoreKind::Persisted => {
                let path = self.config.datastore_for(name, config)?;
                let connection = SqliteConnection::open(path);
                PersistedStore::new(name, Arc::new(connection), config.sweep_interval()).into()
            }
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::IN_MEMORY;
    use crate::cache::CacheStore;
    use crate::error::CacheError;
    use serde_json::json;

    fn config() -> StashConfig {
        StashConfig::default()
            .with_store("durable", StoreConfig::persisted("local"))
            .with_store("shared", StoreConfig::remote_kv("cache").with_key_prefix("app"))
            .with_datastore("local", IN_MEMORY)
            .with_datastore("cache", "redis://127.0.0.1:6379")
    }

    #[tokio::test]
    async fn test_builds_each_kind() {
        let registry = StoreRegistry::new(config());

        assert_eq!(registry.default_store().await.unwrap().kind(), StoreKind::Memory);
        assert_eq!(registry.store("durable").await.unwrap().kind(), StoreKind::Persisted);

        // Building a remote store does not connect
        let shared = registry.store("shared").await.unwrap();
        assert_eq!(shared.kind(), StoreKind::RemoteKv);
        match shared.as_ref() {
            Store::Remote(remote) => assert_eq!(remote.key_prefix(), Some("app")),
            other => panic!("expected remote store, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_name_shares_instance() {
        let registry = StoreRegistry::new(config());

        let first = registry.store("default").await.unwrap();
        first.set("k", json!("v"), None).await.unwrap();

        let second = registry.resolve(None).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_unknown_store() {
        let registry = StoreRegistry::new(config());

        let err = registry.store("nope").await.unwrap_err();
        assert!(matches!(err, CacheError::UnknownStore(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_missing_datastore_is_config_error() {
        let registry = StoreRegistry::new(
            StashConfig::default().with_store("orphan", StoreConfig::persisted("nowhere")),
        );

        let err = registry.store("orphan").await.unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[tokio::test]
    async fn test_invalid_redis_url_is_config_error() {
        let registry = StoreRegistry::new(
            StashConfig::default()
                .with_store("bad", StoreConfig::remote_kv("cache"))
                .with_datastore("cache", "not a url"),
        );

        let err = registry.store("bad").await.unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[test]
    fn test_names_sorted() {
        let registry = StoreRegistry::new(config());
        assert_eq!(registry.names(), vec!["default", "durable", "shared"]);
        assert_eq!(registry.default_name(), "default");
    }
}
