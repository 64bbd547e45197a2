//! Persisted Table Backend
//!
//! Keeps entries in a durable `_cache` table with an explicit expiry
//! column. Expired rows are deleted lazily on read and periodically by a
//! background sweep.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::{
    current_timestamp_ms, decode_value, encode_value, expires_at_from_ttl, is_expired_at,
    CacheStore,
};
use crate::error::{CacheError, Result};
use crate::tasks::{Sweep, SweepHandle};

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS _cache (key TEXT PRIMARY KEY, value TEXT, expires_at INTEGER)";
const SELECT_ENTRY: &str = "SELECT value, expires_at FROM _cache WHERE key = ?1";
const SELECT_EXPIRY: &str = "SELECT expires_at FROM _cache WHERE key = ?1";
const UPSERT_ENTRY: &str =
    "INSERT OR REPLACE INTO _cache (key, value, expires_at) VALUES (?1, ?2, ?3)";
const DELETE_ENTRY: &str = "DELETE FROM _cache WHERE key = ?1";
const DELETE_EXPIRED_ENTRY: &str =
    "DELETE FROM _cache WHERE key = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2";
const DELETE_EXPIRED: &str =
    "DELETE FROM _cache WHERE expires_at IS NOT NULL AND expires_at <= ?1";
const DELETE_ALL: &str = "DELETE FROM _cache";
const COUNT_ROWS: &str = "SELECT COUNT(*) FROM _cache";

// == SQL Surface ==
/// A single SQL parameter or result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Option<u64>> for SqlValue {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(value) => SqlValue::Integer(i64::try_from(value).unwrap_or(i64::MAX)),
            None => SqlValue::Null,
        }
    }
}

/// Result of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Returned rows, one cell per selected column
    pub rows: Vec<Vec<SqlValue>>,
    /// Rows affected by a write statement
    pub changes: u64,
}

/// The one entry point the persisted backend needs from a SQL engine.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<QueryOutcome>;
}

// == Persisted Table ==
/// The `_cache` table behind a [`PersistedStore`], also the sweep target.
pub struct PersistedTable {
    name: String,
    executor: Arc<dyn SqlExecutor>,
    initialized: OnceCell<()>,
}

impl PersistedTable {
    /// Creates the table on first use. Idempotent.
    async fn ensure_table(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                self.executor.execute(CREATE_TABLE, Vec::new()).await?;
                debug!(store = %self.name, "Cache table ready");
                Ok::<_, CacheError>(())
            })
            .await?;
        Ok(())
    }

    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<QueryOutcome> {
        self.ensure_table().await?;
        self.executor.execute(sql, params).await
    }

    async fn delete_key(&self, key: &str) -> Result<u64> {
        Ok(self.execute(DELETE_ENTRY, vec![key.into()]).await?.changes)
    }

    /// Deletes `key` only if its row is still expired at `now`, so a write
    /// landing after the read survives.
    async fn delete_if_expired(&self, key: &str, now: u64) -> Result<u64> {
        let params: Vec<SqlValue> = vec![key.into(), Some(now).into()];
        Ok(self.execute(DELETE_EXPIRED_ENTRY, params).await?.changes)
    }
}

#[async_trait]
impl Sweep for PersistedTable {
    async fn sweep_expired(&self) -> Result<u64> {
        if !self.initialized.initialized() {
            return Ok(0);
        }

        let now = Some(current_timestamp_ms());
        let outcome = self.executor.execute(DELETE_EXPIRED, vec![now.into()]).await?;
        Ok(outcome.changes)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn expiry_of(cell: Option<&SqlValue>) -> Option<u64> {
    cell.and_then(SqlValue::as_i64).map(|ms| ms.max(0) as u64)
}

// == Persisted Store ==
/// Cache store backed by a durable SQL table.
pub struct PersistedStore {
    table: Arc<PersistedTable>,
    sweeper: SweepHandle,
}

impl PersistedStore {
    // == Constructor ==
    /// Creates a store over `executor` and starts its sweep task.
    ///
    /// The table itself is created on first use. Must be called from within
    /// a tokio runtime.
    pub fn new(
        name: impl Into<String>,
        executor: Arc<dyn SqlExecutor>,
        sweep_interval: Duration,
    ) -> Self {
        let table = Arc::new(PersistedTable {
            name: name.into(),
            executor,
            initialized: OnceCell::new(),
        });
        let sweeper = SweepHandle::spawn(&table, sweep_interval);
        Self { table, sweeper }
    }

    /// Number of rows physically held, including expired ones not yet
    /// swept.
    pub async fn row_count(&self) -> Result<u64> {
        let outcome = self.table.execute(COUNT_ROWS, Vec::new()).await?;
        Ok(outcome
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(SqlValue::as_i64)
            .unwrap_or(0) as u64)
    }

    /// Runs one sweep pass immediately.
    pub async fn sweep_now(&self) -> Result<u64> {
        self.table.sweep_expired().await
    }

    /// Returns true while the background sweep is scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }
}

impl std::fmt::Debug for PersistedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedStore")
            .field("name", &self.table.name)
            .field("sweeper", &self.sweeper)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for PersistedStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let outcome = self.table.execute(SELECT_ENTRY, vec![key.into()]).await?;
        let Some(row) = outcome.rows.first() else {
            return Ok(None);
        };

        let now = current_timestamp_ms();
        if is_expired_at(expiry_of(row.get(1)), now) {
            self.table.delete_if_expired(key, now).await?;
            debug!(store = %self.table.name, key, "Removed expired row on read");
            return Ok(None);
        }

        match row.first() {
            Some(SqlValue::Text(raw)) => decode_value(raw).map(Some),
            other => Err(CacheError::Deserialization(format!(
                "expected text payload for key '{}', found {:?}",
                key, other
            ))),
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<u64>) -> Result<()> {
        let payload = encode_value(&value)?;
        let expires_at = expires_at_from_ttl(ttl);
        self.table
            .execute(
                UPSERT_ENTRY,
                vec![key.into(), payload.into(), expires_at.into()],
            )
            .await?;
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let outcome = self.table.execute(SELECT_EXPIRY, vec![key.into()]).await?;
        let Some(row) = outcome.rows.first() else {
            return Ok(false);
        };

        let now = current_timestamp_ms();
        if is_expired_at(expiry_of(row.first()), now) {
            self.table.delete_if_expired(key, now).await?;
            return Ok(false);
        }

        Ok(true)
    }

    async fn delete_many(&self, keys: &[&str]) -> Result<u64> {
        let mut removed = 0;
        for key in keys {
            removed += self.table.delete_key(key).await?;
        }
        Ok(removed)
    }

    async fn destroy(&self) -> Result<()> {
        let outcome = self.table.execute(DELETE_ALL, Vec::new()).await?;
        self.sweeper.stop();
        debug!(store = %self.table.name, removed = outcome.changes, "Destroyed cache table");
        Ok(())
    }
}
