//! Configuration for named cache stores and queues.
//!
//! Settings are plain serde-deserializable data: load them from JSON (or
//! build them in code) and hand them to a [`CacheRegistry`].
//!
//! [`CacheRegistry`]: crate::registry::CacheRegistry

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default per-call backend timeout, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default Redis connection pool size.
/// Formula: (CPU cores × 2) + 1
/// For 8-core systems: 16 connections is optimal
const DEFAULT_POOL_SIZE: u32 = 16;

/// Default TTL for memoized proxy entries, in seconds.
pub const DEFAULT_PROXY_EXPIRE: i64 = 1800;

/// Backend kind a configuration resolves to.
///
/// Deserialization fails on unknown kinds, so a configuration always
/// resolves to exactly one backend known to this build (or not at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Redis-compatible server (requires the `redis` feature).
    Redis,
    /// In-process store (requires the `inmemory` feature).
    Memory,
}

/// Configuration bundle for one named cache store or queue.
///
/// Immutable after load. Connection parameters only matter for network
/// backends; the in-process store ignores them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Which backend this configuration resolves to. Required.
    pub backend: BackendKind,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Logical database index; selected at connect time when non-zero.
    #[serde(default)]
    pub database: u32,

    /// Per-call backend timeout in seconds. Every round trip is bounded by
    /// this; a timeout fails the call the same way a network error does.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Whether to keep a pool of live connections. When false the driver
    /// pins itself to a single recycled connection.
    #[serde(default)]
    pub persistent: bool,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Prefix prepended to every physical key this store touches.
    #[serde(default)]
    pub prefix: String,

    /// Default TTL in seconds for `set` without an explicit expiry.
    /// Zero means no TTL: entries persist until evicted or deleted.
    #[serde(default)]
    pub expire: i64,

    /// TTL in seconds for memoized proxy entries.
    #[serde(default = "default_proxy_expire")]
    pub proxy_expire: i64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6379
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_pool_size() -> u32 {
    DEFAULT_POOL_SIZE
}

fn default_proxy_expire() -> i64 {
    DEFAULT_PROXY_EXPIRE
}

impl CacheConfig {
    /// In-process store configuration with defaults.
    pub fn memory() -> Self {
        CacheConfig {
            backend: BackendKind::Memory,
            ..Self::base()
        }
    }

    /// Redis configuration pointing at the default local server.
    pub fn redis() -> Self {
        CacheConfig {
            backend: BackendKind::Redis,
            ..Self::base()
        }
    }

    fn base() -> Self {
        CacheConfig {
            backend: BackendKind::Memory,
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            database: 0,
            timeout: default_timeout(),
            persistent: false,
            pool_size: default_pool_size(),
            prefix: String::new(),
            expire: 0,
            proxy_expire: default_proxy_expire(),
        }
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the default TTL in seconds (0 = no TTL).
    pub fn with_expire(mut self, secs: i64) -> Self {
        self.expire = secs;
        self
    }

    /// Per-call timeout as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}

/// Named cache and queue configurations.
///
/// `default` is a name indirection: it names the store returned by
/// [`CacheRegistry::default_cache`], it is not a configuration itself.
///
/// [`CacheRegistry::default_cache`]: crate::registry::CacheRegistry::default_cache
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Name of the store used when no explicit name is given.
    #[serde(default = "default_store_name")]
    pub default: String,

    #[serde(default)]
    pub stores: HashMap<String, CacheConfig>,

    #[serde(default)]
    pub queues: HashMap<String, CacheConfig>,
}

fn default_store_name() -> String {
    "default".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default: default_store_name(),
            stores: HashMap::new(),
            queues: HashMap::new(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] on malformed JSON or an unknown
    /// backend kind.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Register a store configuration under `name`.
    pub fn with_store(mut self, name: impl Into<String>, config: CacheConfig) -> Self {
        self.stores.insert(name.into(), config);
        self
    }

    /// Register a queue configuration under `name`.
    pub fn with_queue(mut self, name: impl Into<String>, config: CacheConfig) -> Self {
        self.queues.insert(name.into(), config);
        self
    }

    /// Look up a store configuration by name.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] when no store with that name exists.
    pub fn store(&self, name: &str) -> Result<&CacheConfig> {
        self.stores
            .get(name)
            .ok_or_else(|| Error::ConfigError(format!("'{}' cache config error", name)))
    }

    /// Look up a queue configuration by name.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] when no queue with that name exists.
    pub fn queue(&self, name: &str) -> Result<&CacheConfig> {
        self.queues
            .get(name)
            .ok_or_else(|| Error::ConfigError(format!("'{}' queue config error", name)))
    }
}
