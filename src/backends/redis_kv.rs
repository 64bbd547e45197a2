//! Redis adapter for the remote KV backend.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::info;

use crate::backends::remote::KvCommands;
use crate::error::{CacheError, Result};

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// Lazily connected Redis command surface.
///
/// The URL is validated when the handle is opened; the connection itself is
/// established on the first command and reused afterwards.
pub struct RedisConnection {
    client: Client,
    manager: OnceCell<ConnectionManager>,
}

impl RedisConnection {
    /// Opens a handle for `url` (e.g. `redis://localhost:6379`).
    ///
    /// # Examples
    ///
    /// ```
    /// use stash::backends::RedisConnection;
    ///
    /// let conn = RedisConnection::open("redis://localhost:6379").unwrap();
    /// assert!(!conn.is_connected());
    /// ```
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| CacheError::Config(format!("invalid Redis URL '{}': {}", url, e)))?;

        Ok(Self {
            client,
            manager: OnceCell::new(),
        })
    }

    /// Returns true once the first command has connected.
    pub fn is_connected(&self) -> bool {
        self.manager.initialized()
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone()).await?;
                info!("Redis connection established");
                Ok::<_, CacheError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl KvCommands for RedisConnection {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: String, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("FLUSHALL")
            .arg("ASYNC")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}
