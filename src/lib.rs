//! Stash - a uniform cache layer over interchangeable backends
//!
//! One contract (get/set/has/delete/fetch/add/pull/forever/destroy with
//! per-entry TTL) served by an in-process table, a remote Redis server or a
//! persisted SQLite table, selected by name from configuration.

pub mod api;
pub mod backends;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStore, Fallback};
pub use config::{Config, StashConfig, StoreConfig, StoreKind};
pub use error::{CacheError, Result};
pub use registry::StoreRegistry;
pub use store::Store;
