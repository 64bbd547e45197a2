//! Remote KV Backend
//!
//! Stores JSON-encoded values in a remote key/value service and relies on
//! the service's native expiry. No local sweep runs for this backend.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{decode_value, encode_value, normalize_ttl, CacheStore};
use crate::error::Result;

// == Command Surface ==
/// The commands the remote backend needs from a key/value service.
#[async_trait]
pub trait KvCommands: Send + Sync {
    /// `GET key`
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `SET key value`
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// `SETEX key ttl value`
    async fn set_ex(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()>;

    /// `DEL key [key ...]`, returning how many keys were removed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// `FLUSHALL`
    async fn flush_all(&self) -> Result<()>;

    /// Every key matching a glob-style pattern.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;
}

// == Remote Store ==
/// Cache store backed by a remote key/value service.
#[derive(Clone)]
pub struct RemoteStore {
    name: String,
    commands: Arc<dyn KvCommands>,
    key_prefix: Option<String>,
}

impl RemoteStore {
    /// Creates a store issuing commands through `commands`.
    pub fn new(name: impl Into<String>, commands: Arc<dyn KvCommands>) -> Self {
        Self {
            name: name.into(),
            commands,
            key_prefix: None,
        }
    }

    /// Scopes every key (and [`destroy`](CacheStore::destroy)) to
    /// `{prefix}:`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Returns the configured key prefix, if any.
    pub fn key_prefix(&self) -> Option<&str> {
        self.key_prefix.as_deref()
    }

    /// Build the full key with prefix.
    fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// Escapes Redis glob metacharacters so `raw` matches only itself in
/// `SCAN MATCH`.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("name", &self.name)
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for RemoteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.commands.get(&self.build_key(key)).await? {
            Some(raw) => decode_value(&raw).map(Some),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        let key = self.build_key(key);
        let payload = encode_value(&value)?;

        match normalize_ttl(ttl) {
            Some(ttl) => self.commands.set_ex(&key, payload, ttl).await,
            None => self.commands.set(&key, payload).await,
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.commands.get(&self.build_key(key)).await?.is_some())
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let keys: Vec<String> = keys.iter().map(|key| self.build_key(key)).collect();
        self.commands.del(&keys).await
    }

    async fn destroy(&self) -> Result<()> {
        match &self.key_prefix {
            Some(prefix) => {
                let pattern = format!("{}:*", escape_glob(prefix));
                let keys = self.commands.scan(&pattern).await?;
                let removed = if keys.is_empty() {
                    0
                } else {
                    self.commands.del(&keys).await?
                };
                debug!(store = %self.name, prefix = %prefix, removed, "Destroyed namespace");
            }
            None => {
                warn!(store = %self.name, "No key prefix configured, flushing the remote store");
                self.commands.flush_all().await?;
            }
        }
        Ok(())
    }
}
