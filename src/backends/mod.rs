//! Store Backends
//!
//! Concrete implementations of [`CacheStore`](crate::cache::CacheStore):
//! - [`MemoryStore`]: in-process hash map with lazy expiry and a sweep task
//! - [`RemoteStore`]: remote key/value service with native expiry
//! - [`PersistedStore`]: durable SQL table with lazy expiry and a sweep task
//!
//! The remote and persisted stores talk to their services through the
//! [`KvCommands`] and [`SqlExecutor`] surfaces. [`RedisConnection`] and
//! [`SqliteConnection`] implement those surfaces.

mod memory;
mod persisted;
mod redis_kv;
mod remote;
mod sqlite;

pub use memory::{MemoryStore, MemoryTable};
pub use persisted::{PersistedStore, PersistedTable, QueryOutcome, SqlExecutor, SqlValue};
pub use redis_kv::RedisConnection;
pub use remote::{KvCommands, RemoteStore};
pub use sqlite::{SqliteConnection, IN_MEMORY};

#[cfg(test)]
pub(crate) use remote::tests::FakeKv;
