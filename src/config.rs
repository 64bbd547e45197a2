//! Configuration Module
//!
//! Named store definitions and server settings, loaded from environment
//! variables or a JSON file.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_SWEEP_INTERVAL_SECS;
use crate::error::{CacheError, Result};

/// Name of the store used when none is requested.
pub const DEFAULT_STORE_NAME: &str = "default";

// == Store Kind ==
/// Backend kind of a configured store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StoreKind {
    /// In-process hash map
    Memory,
    /// Remote key/value service (Redis)
    RemoteKv,
    /// Durable SQL table (SQLite)
    Persisted,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::RemoteKv => "remote-kv",
            StoreKind::Persisted => "persisted",
        }
    }

    /// Whether this kind binds to an external datastore.
    pub fn needs_datastore(&self) -> bool {
        !matches!(self, StoreKind::Memory)
    }
}

impl FromStr for StoreKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "remote-kv" | "redis" => Ok(StoreKind::RemoteKv),
            "persisted" | "sqlite" => Ok(StoreKind::Persisted),
            other => Err(CacheError::UnknownKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for StoreKind {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StoreKind> for String {
    fn from(kind: StoreKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Store Config ==
/// One named store definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind
    pub kind: StoreKind,
    /// Name of the datastore this store binds to (remote-kv, persisted)
    #[serde(default)]
    pub datastore: Option<String>,
    /// Namespace prefix for remote keys
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// Seconds between background sweeps (memory, persisted)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

impl StoreConfig {
    /// A store of the given kind with default settings.
    pub fn new(kind: StoreKind) -> Self {
        Self {
            kind,
            datastore: None,
            key_prefix: None,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }

    pub fn memory() -> Self {
        Self::new(StoreKind::Memory)
    }

    pub fn remote_kv(datastore: impl Into<String>) -> Self {
        Self::new(StoreKind::RemoteKv).with_datastore(datastore)
    }

    pub fn persisted(datastore: impl Into<String>) -> Self {
        Self::new(StoreKind::Persisted).with_datastore(datastore)
    }

    /// Set the datastore name.
    pub fn with_datastore(mut self, datastore: impl Into<String>) -> Self {
        self.datastore = Some(datastore.into());
        self
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the sweep interval in seconds.
    pub fn with_sweep_interval(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    /// Sweep interval as a duration. Zero falls back to the default.
    pub fn sweep_interval(&self) -> Duration {
        match self.sweep_interval_secs {
            0 => Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}

// == Stash Config ==
/// Every named store plus the datastores they bind to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StashConfig {
    /// Store used when callers don't name one
    #[serde(default = "default_store_name")]
    pub default_store: String,
    /// Named store definitions
    #[serde(default)]
    pub stores: HashMap<String, StoreConfig>,
    /// Datastore name -> connection URL (remote-kv) or database path (persisted)
    #[serde(default)]
    pub datastores: HashMap<String, String>,
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

impl StashConfig {
    /// A configuration whose default store is `store`.
    pub fn single(store: StoreConfig) -> Self {
        let mut stores = HashMap::new();
        stores.insert(DEFAULT_STORE_NAME.to_string(), store);
        Self {
            default_store: DEFAULT_STORE_NAME.to_string(),
            stores,
            datastores: HashMap::new(),
        }
    }

    /// Adds or replaces a named store.
    pub fn with_store(mut self, name: impl Into<String>, store: StoreConfig) -> Self {
        self.stores.insert(name.into(), store);
        self
    }

    /// Adds or replaces a datastore.
    pub fn with_datastore(mut self, name: impl Into<String>, location: impl Into<String>) -> Self {
        self.datastores.insert(name.into(), location.into());
        self
    }

    /// Parses a JSON configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CacheError::Config(e.to_string()))
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CacheError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    /// Looks up a named store definition.
    pub fn store(&self, name: &str) -> Result<&StoreConfig> {
        self.stores
            .get(name)
            .ok_or_else(|| CacheError::UnknownStore(name.to_string()))
    }

    /// Resolves the datastore location a store binds to.
    pub fn datastore_for(&self, name: &str, store: &StoreConfig) -> Result<&str> {
        let datastore = store.datastore.as_deref().ok_or_else(|| {
            CacheError::Config(format!(
                "store '{}' of kind {} requires a datastore",
                name, store.kind
            ))
        })?;

        self.datastores
            .get(datastore)
            .map(String::as_str)
            .ok_or_else(|| {
                CacheError::Config(format!(
                    "store '{}' references unknown datastore '{}'",
                    name, datastore
                ))
            })
    }

    /// Checks that the default store exists and every store's datastore
    /// resolves.
    pub fn validate(&self) -> Result<()> {
        self.store(&self.default_store)?;
        for (name, store) in &self.stores {
            if store.kind.needs_datastore() {
                self.datastore_for(name, store)?;
            }
        }
        Ok(())
    }
}

impl Default for StashConfig {
    fn default() -> Self {
        Self::single(StoreConfig::memory())
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Store definitions
    pub stash: StashConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `STASH_CONFIG` - Path to a JSON store configuration; when set, the
    ///   variables below are ignored
    /// - `STASH_STORE_KIND` - Kind of the default store (default: memory)
    /// - `STASH_DATASTORE` - Redis URL or SQLite path for the default store
    /// - `STASH_KEY_PREFIX` - Remote key namespace
    /// - `STASH_SWEEP_INTERVAL` - Sweep interval in seconds (default: 60)
    pub fn from_env() -> Result<Self> {
        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let stash = match env::var("STASH_CONFIG") {
            Ok(path) => StashConfig::from_json_file(path)?,
            Err(_) => Self::stash_from_env()?,
        };

        Ok(Self { server_port, stash })
    }

    fn stash_from_env() -> Result<StashConfig> {
        let kind = match env::var("STASH_STORE_KIND") {
            Ok(kind) => kind.parse()?,
            Err(_) => StoreKind::Memory,
        };

        let mut store = StoreConfig::new(kind).with_sweep_interval(
            env::var("STASH_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        );
        if let Ok(prefix) = env::var("STASH_KEY_PREFIX") {
            store = store.with_key_prefix(prefix);
        }

        let mut stash = StashConfig::single(store);
        if kind.needs_datastore() {
            let location = env::var("STASH_DATASTORE").map_err(|_| {
                CacheError::Config(format!("STASH_DATASTORE is required for kind {}", kind))
            })?;
            stash = stash.with_datastore("cache", location);
            if let Some(store) = stash.stores.get_mut(DEFAULT_STORE_NAME) {
                store.datastore = Some("cache".to_string());
            }
        }

        Ok(stash)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            stash: StashConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.stash.default_store, "default");
        assert_eq!(config.stash.store("default").unwrap().kind, StoreKind::Memory);
    }

    #[test]
    fn test_store_kind_parsing() {
        assert_eq!("memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!("Redis".parse::<StoreKind>().unwrap(), StoreKind::RemoteKv);
        assert_eq!("remote-kv".parse::<StoreKind>().unwrap(), StoreKind::RemoteKv);
        assert_eq!("sqlite".parse::<StoreKind>().unwrap(), StoreKind::Persisted);
        assert!(matches!(
            "memcached".parse::<StoreKind>(),
            Err(CacheError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let config = StashConfig::from_json_str(
            r#"{
                "default_store": "sessions",
                "stores": {
                    "sessions": {"kind": "redis", "datastore": "cache", "key_prefix": "sess"},
                    "local": {"kind": "persisted", "datastore": "disk", "sweep_interval_secs": 5},
                    "scratch": {"kind": "memory"}
                },
                "datastores": {
                    "cache": "redis://localhost:6379",
                    "disk": "/tmp/stash.db"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.default_store, "sessions");
        assert_eq!(config.store("sessions").unwrap().kind, StoreKind::RemoteKv);
        assert_eq!(config.store("local").unwrap().sweep_interval(), Duration::from_secs(5));
        assert_eq!(
            config.store("scratch").unwrap().sweep_interval(),
            Duration::from_secs(60)
        );
        assert_eq!(
            config
                .datastore_for("sessions", config.store("sessions").unwrap())
                .unwrap(),
            "redis://localhost:6379"
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_from_json_rejects_unknown_kind() {
        let result =
            StashConfig::from_json_str(r#"{"stores": {"default": {"kind": "memcached"}}}"#);
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_validate_errors() {
        let missing_default = StashConfig::default().with_store("other", StoreConfig::memory());
        let mut renamed = missing_default.clone();
        renamed.default_store = "nope".to_string();
        assert!(matches!(renamed.validate(), Err(CacheError::UnknownStore(_))));

        let unbound = StashConfig::single(StoreConfig::new(StoreKind::Persisted));
        assert!(matches!(unbound.validate(), Err(CacheError::Config(_))));

        let dangling = StashConfig::single(StoreConfig::remote_kv("cache"));
        assert!(matches!(dangling.validate(), Err(CacheError::Config(_))));

        let bound = dangling.with_datastore("cache", "redis://localhost");
        bound.validate().unwrap();
    }

    #[test]
    fn test_zero_sweep_interval_uses_default() {
        let store = StoreConfig::memory().with_sweep_interval(0);
        assert_eq!(store.sweep_interval(), Duration::from_secs(60));
    }
}
