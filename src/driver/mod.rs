//! Cache driver implementations.

use crate::codec::ValueCodec;
use crate::config::{BackendKind, CacheConfig};
use crate::error::Result;
use crate::expire::Expiry;
use serde_json::Value;

#[cfg(feature = "inmemory")]
pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::{InMemoryDriver, InMemoryStore};
#[cfg(feature = "redis")]
pub use redis::{RedisConnection, RedisDriver};

#[cfg(not(any(feature = "redis", feature = "inmemory")))]
compile_error!("at least one backend feature (`redis` or `inmemory`) must be enabled");

/// The capability set every cache backend implements.
///
/// Callers use unprefixed logical key names; drivers prepend their
/// configured prefix before anything reaches the backend.
///
/// **Error model:** in-flight failures propagate to the caller. Absence is
/// never an error — `get` on a missing key is `Ok(None)`.
///
/// **IMPORTANT:** All methods use `&self` to allow concurrent access.
/// Implementations use interior mutability or cheap-clone handles; no
/// locking is provided at this layer — atomicity is delegated to the
/// backend (atomic increment, atomic log append).
#[allow(async_fn_in_trait)]
pub trait CacheDriver: Send + Sync + Clone {
    /// Whether a live entry exists under `key`.
    async fn has(&self, key: &str) -> Result<bool>;

    /// Fetch the value under `key`, or `Ok(None)` when absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`.
    ///
    /// `expire` normalizes to integer seconds (see [`Expiry`]); zero means
    /// no TTL — the entry persists until evicted or deleted. A negative
    /// normalized count is rejected the way the backend would reject it.
    async fn set(&self, key: &str, value: &Value, expire: Expiry) -> Result<bool>;

    /// Atomically add `step` to the numeric entry under `key`.
    ///
    /// A missing key starts from 0. Defined only for numeric-valued
    /// entries; a non-numeric value is a backend error.
    async fn inc(&self, key: &str, step: i64) -> Result<i64>;

    /// Atomically subtract `step` from the numeric entry under `key`.
    async fn dec(&self, key: &str, step: i64) -> Result<i64>;

    /// Delete the entry under `key`. Idempotent: returns whether an entry
    /// was actually removed, `Ok(false)` on an absent key, never an error
    /// for absence.
    async fn del(&self, key: &str) -> Result<bool>;

    /// Destroy **all** entries visible to this backend.
    ///
    /// This flushes the entire selected logical database, **not** just
    /// keys under this driver's prefix — a destructive wide-blast
    /// operation. Other stores sharing the database lose their entries
    /// too.
    async fn clear(&self) -> Result<bool>;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Shared, backend-independent driver state: key prefix, default TTL and
/// the value codec. Concrete drivers embed one of these.
#[derive(Clone)]
pub struct DriverOptions {
    /// Prefix prepended to every physical key.
    pub prefix: String,
    /// Default TTL in seconds for `Expiry::Default` (0 = no TTL).
    pub expire: i64,
    /// Value codec; numeric bypass applies regardless of hooks.
    pub codec: ValueCodec,
}

impl DriverOptions {
    pub fn from_config(config: &CacheConfig) -> Self {
        DriverOptions {
            prefix: config.prefix.clone(),
            expire: config.expire,
            codec: ValueCodec::json(),
        }
    }

    /// The physical key for a logical name: `prefix + name`.
    pub fn cache_key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            prefix: String::new(),
            expire: 0,
            codec: ValueCodec::json(),
        }
    }
}

/// A concrete driver selected by configuration.
///
/// This is the enumerated dispatch surface for everything behind the
/// [`Cache`](crate::cache::Cache) facade: one variant per compiled-in
/// backend, resolved from [`BackendKind`] at construction. Cloning is
/// cheap — variants hold pooled or shared handles.
#[derive(Clone)]
pub enum Driver {
    #[cfg(feature = "redis")]
    Redis(RedisDriver),
    #[cfg(feature = "inmemory")]
    Memory(InMemoryDriver),
}

impl Driver {
    /// Construct the driver a configuration resolves to.
    ///
    /// Network drivers connect **eagerly** here; a backend that cannot be
    /// reached fails construction with
    /// [`Error::BackendUnavailable`](crate::Error::BackendUnavailable)
    /// rather than deferring the failure to first use. A backend kind not
    /// compiled into this build fails with
    /// [`Error::NotSupported`](crate::Error::NotSupported).
    pub async fn connect(config: &CacheConfig) -> Result<Self> {
        match config.backend {
            #[cfg(feature = "redis")]
            BackendKind::Redis => Ok(Driver::Redis(RedisDriver::connect(config).await?)),
            #[cfg(feature = "inmemory")]
            BackendKind::Memory => Ok(Driver::Memory(InMemoryDriver::new(config))),
            #[allow(unreachable_patterns)]
            other => Err(crate::error::Error::NotSupported(format!(
                "backend {:?} is not compiled into this build",
                other
            ))),
        }
    }

    /// Replace the value codec (serializer hook pair) on the underlying
    /// driver. Codec hooks are code, not configuration data, so they are
    /// injected here rather than through [`CacheConfig`].
    pub fn with_codec(self, codec: ValueCodec) -> Self {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => Driver::Redis(d.with_codec(codec)),
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => Driver::Memory(d.with_codec(codec)),
        }
    }
}

impl CacheDriver for Driver {
    async fn has(&self, key: &str) -> Result<bool> {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => d.has(key).await,
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => d.has(key).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => d.get(key).await,
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => d.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &Value, expire: Expiry) -> Result<bool> {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => d.set(key, value, expire).await,
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => d.set(key, value, expire).await,
        }
    }

    async fn inc(&self, key: &str, step: i64) -> Result<i64> {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => d.inc(key, step).await,
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => d.inc(key, step).await,
        }
    }

    async fn dec(&self, key: &str, step: i64) -> Result<i64> {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => d.dec(key, step).await,
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => d.dec(key, step).await,
        }
    }

    async fn del(&self, key: &str) -> Result<bool> {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => d.del(key).await,
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => d.del(key).await,
        }
    }

    async fn clear(&self) -> Result<bool> {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => d.clear().await,
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => d.clear().await,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        match self {
            #[cfg(feature = "redis")]
            Driver::Redis(d) => d.health_check().await,
            #[cfg(feature = "inmemory")]
            Driver::Memory(d) => d.health_check().await,
        }
    }
}
