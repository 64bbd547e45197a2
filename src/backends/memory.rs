//! In-Process Table Backend
//!
//! Holds entries in a local hash map with lazy expiry on read and a
//! periodic background sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{current_timestamp_ms, CacheEntry, CacheStore};
use crate::error::Result;
use crate::tasks::{Sweep, SweepHandle};

// == Memory Table ==
/// The shared map behind a [`MemoryStore`], also the sweep target.
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryTable {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Removes `key` if it is expired. Returns the live entry otherwise.
    async fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: a concurrent set may have replaced it.
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                debug!(store = %self.name, key, "Removed expired entry on read");
                None
            }
            other => other.cloned(),
        }
    }
}

#[async_trait]
impl Sweep for MemoryTable {
    async fn sweep_expired(&self) -> Result<u64> {
        let now = current_timestamp_ms();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok((before - entries.len()) as u64)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// == Memory Store ==
/// Cache store backed by an in-process hash map.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use serde_json::json;
/// use stash::backends::MemoryStore;
/// use stash::cache::CacheStore;
///
/// # async fn run() -> stash::error::Result<()> {
/// let store = MemoryStore::new("default", Duration::from_secs(60));
/// store.set("greeting", json!("hello"), Some(30)).await?;
/// assert_eq!(store.get("greeting").await?, Some(json!("hello")));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    table: Arc<MemoryTable>,
    sweeper: SweepHandle,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store and starts its sweep task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(name: impl Into<String>, sweep_interval: Duration) -> Self {
        let table = Arc::new(MemoryTable::new(name));
        let sweeper = SweepHandle::spawn(&table, sweep_interval);
        Self { table, sweeper }
    }

    /// Number of entries physically held, including expired ones not yet
    /// swept.
    pub async fn len(&self) -> usize {
        self.table.entries.read().await.len()
    }

    /// Returns true if no entries are held.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Runs one sweep pass immediately.
    pub async fn sweep_now(&self) -> usize {
        self.table.sweep_expired().await.unwrap_or(0) as usize
    }

    /// Returns true while the background sweep is scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.table.live_entry(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        let entry = CacheEntry::new(value, ttl);
        self.table.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.table.live_entry(key).await.is_some())
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        let mut entries = self.table.entries.write().await;
        let removed = keys
            .iter()
            .filter(|key| entries.remove(**key).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn destroy(&self) -> Result<()> {
        self.table.entries.write().await.clear();
        if self.sweeper.stop() {
            debug!(store = %self.table.name, "Sweep task stopped");
        }
        Ok(())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Fallback;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new("test", Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_store_set_and_get() {
        let store = store();

        store.set("key1", json!("value1"), None).await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), Some(json!("value1")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_get_nonexistent() {
        let store = store();
        assert_eq!(store.get("nonexistent").await.unwrap(), None);
        assert!(!store.has("nonexistent").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_overwrite() {
        let store = store();

        store.set("key1", json!("value1"), Some(1)).await.unwrap();
        store.set("key1", json!("value2"), None).await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), Some(json!("value2")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_store_ttl_expiration_removes_on_read() {
        let store = store();

        store.set("key1", json!({"n": 1}), Some(1)).await.unwrap();
        assert!(store.has("key1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(store.len().await, 1, "Nothing removes it before a read");
        assert!(!store.has("key1").await.unwrap());
        assert_eq!(store.len().await, 0, "Read should remove the expired entry");
        assert_eq!(store.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_returns_fallback() {
        let store = store();

        store.set("a", json!({"n": 1}), Some(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let value = store.get_or("a", Fallback::value("gone")).await.unwrap();
        assert_eq!(value, json!("gone"));
    }

    #[tokio::test]
    async fn test_delete_many_counts_present_keys() {
        let store = store();
        store.set("k1", json!(1), None).await.unwrap();
        store.set("k2", json!(2), None).await.unwrap();

        assert_eq!(store.delete_many(&["k1", "missing", "k1", "k2"]).await.unwrap(), 2);
        assert_eq!(store.delete_many(&[]).await.unwrap(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_now_removes_only_expired() {
        let store = store();

        store.set("short", json!(1), Some(1)).await.unwrap();
        store.set("long", json!(2), Some(10)).await.unwrap();
        store.forever("forever", json!(3)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(store.sweep_now().await, 1);
        assert_eq!(store.len().await, 2);
        assert!(store.has("long").await.unwrap());
    }

    #[tokio::test]
    async fn test_background_sweep_removes_unread_entries() {
        let store = MemoryStore::new("swept", Duration::from_secs(1));

        store.set("expire_soon", json!("value"), Some(1)).await.unwrap();
        store.set("long_lived", json!("value"), Some(3600)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(store.len().await, 1);
        assert!(store.has("long_lived").await.unwrap());
    }

    #[tokio::test]
    async fn test_destroy_clears_and_stops_sweep() {
        let store = store();
        store.set("a", json!(1), None).await.unwrap();
        store.set("b", json!(2), Some(60)).await.unwrap();
        assert!(store.is_sweeping());

        store.destroy().await.unwrap();

        assert!(!store.has("a").await.unwrap());
        assert!(!store.has("b").await.unwrap());
        assert!(!store.is_sweeping());

        // Still usable, sweep stays off
        store.set("a", json!("again"), None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(json!("again")));
        assert!(!store.is_sweeping());
    }

    #[tokio::test]
    async fn test_falsy_values_are_present() {
        let store = store();

        for (key, value) in [("zero", json!(0)), ("empty", json!("")), ("no", json!(false))] {
            store.set(key, value.clone(), None).await.unwrap();
            assert!(store.has(key).await.unwrap());
            assert_eq!(store.fetch(key, Fallback::value(99), None).await.unwrap(), value);
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetch_misses_both_compute() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));

        let producer = |label: &'static str| {
            let calls = calls.clone();
            Fallback::with(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(json!(label))
            })
        };

        let (first, second) = tokio::join!(
            store.fetch("race", producer("first"), None),
            store.fetch("race", producer("second"), None),
        );

        // Each caller gets its own computation; both ran.
        assert_eq!(first.unwrap(), json!("first"));
        assert_eq!(second.unwrap(), json!("second"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let stored = store.get("race").await.unwrap().unwrap();
        assert!(stored == json!("first") || stored == json!("second"));
    }
}
