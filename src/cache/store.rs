//! Cache Store Contract
//!
//! The operation set every backend implements. Backends supply the
//! primitives; the derived operations are provided once here in terms of
//! them and behave the same on every backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::Fallback;
use crate::error::Result;

// == Cache Store ==
/// Uniform cache contract.
///
/// Primitives: [`get`](CacheStore::get), [`set`](CacheStore::set),
/// [`has`](CacheStore::has), [`delete_many`](CacheStore::delete_many) and
/// [`destroy`](CacheStore::destroy).
///
/// The derived operations (`fetch`, `add`, `pull`) are plain sequences of
/// primitives. They are **not** atomic: two callers missing the same key
/// concurrently may both compute and both write, and the last write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored value if present and unexpired.
    ///
    /// An expired entry is reported as `None` and removed.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores a value, overwriting any existing entry.
    ///
    /// `ttl` of `None` or `Some(0)` stores a permanent entry.
    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<()>;

    /// Reports whether an unexpired entry exists, with the same lazy
    /// removal as [`get`](CacheStore::get).
    async fn has(&self, key: &str) -> Result<bool>;

    /// Deletes every listed key and returns how many were actually removed.
    ///
    /// Missing keys are skipped. A key listed twice counts once.
    async fn delete_many(&self, keys: &[&str]) -> Result<u64>;

    /// Removes every entry in this store's namespace and stops any
    /// background sweep. The store stays usable afterwards.
    async fn destroy(&self) -> Result<()>;

    // == Derived Operations ==

    /// Deletes a single key, returning 1 if it was present and 0 otherwise.
    async fn delete(&self, key: &str) -> Result<u64> {
        self.delete_many(&[key]).await
    }

    /// Returns the stored value, or the fallback when the key is absent.
    ///
    /// Never writes. A failing producer propagates its error.
    async fn get_or(&self, key: &str, fallback: Fallback) -> Result<Value> {
        match self.get(key).await? {
            Some(value) => Ok(value),
            None => fallback.resolve().await,
        }
    }

    /// Returns the stored value, or resolves the fallback, stores it with
    /// `ttl` and returns it.
    ///
    /// If the fallback fails nothing is written.
    async fn fetch(&self, key: &str, fallback: Fallback, ttl: Option<u64>) -> Result<Value> {
        if let Some(hit) = self.get(key).await? {
            return Ok(hit);
        }

        let value = fallback.resolve().await?;
        self.set(key, value.clone(), ttl).await?;
        Ok(value)
    }

    /// Stores the value only if no unexpired entry exists.
    ///
    /// Returns `true` when the value was written.
    async fn add(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<bool> {
        if self.has(key).await? {
            return Ok(false);
        }

        self.set(key, value, ttl).await?;
        Ok(true)
    }

    /// Reads the value and then deletes the key.
    ///
    /// Returns what was read even if the key changed between the two steps.
    async fn pull(&self, key: &str) -> Result<Option<Value>> {
        let value = self.get(key).await?;
        self.delete(key).await?;
        Ok(value)
    }

    /// Stores a value with no expiry.
    async fn forever(&self, key: &str, value: Value) -> Result<()> {
        self.set(key, value, None).await
    }
}
