//! Log-structured, append-only job queue.
//!
//! The queue is a composition over the same backend connection the cache
//! drivers use: it needs nothing from the key/value surface, only the
//! backend's append-only log primitives (append with assigned id, range
//! read, position delete, length). Delivery is **at-least-once** with
//! manual acknowledgment: `pull` never removes what it reads, `remove` is
//! the ack, and there is no visibility timeout, redelivery or consumer
//! bookkeeping — handlers must be idempotent.
//!
//! Failure policy is deliberately the opposite of the cache drivers':
//! every backend call is caught here, logged, and turned into a safe
//! empty/zero return. A flaky queue degrades to "did nothing"; it never
//! crashes a worker loop.

pub mod codec;

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Name used when a queue is opened without an explicit one.
pub const DEFAULT_QUEUE: &str = "default";

/// Marker trait for job payloads pushed through a [`Queue`].
///
/// Implement it on each job type; the (de)serialization bounds are what
/// the envelope codec needs.
pub trait Job: Serialize + DeserializeOwned + Send + Sync {}

/// Append-only log capability of a backend connection.
///
/// Implemented by the same connection types the cache drivers hold, so a
/// queue reuses the connection machinery without inheriting the key/value
/// surface.
#[allow(async_fn_in_trait)]
pub trait LogStore: Send + Sync + Clone {
    /// Append a payload to the named log; returns the backend-assigned id.
    async fn append(&self, log: &str, payload: &[u8]) -> Result<String>;

    /// Read up to `count` entries from the earliest position, in ascending
    /// id order, without removing them.
    async fn range(&self, log: &str, count: usize) -> Result<Vec<(String, Vec<u8>)>>;

    /// Delete the given positions; returns how many existed.
    async fn remove(&self, log: &str, ids: &[String]) -> Result<u64>;

    /// Total entries currently in the log.
    async fn len(&self, log: &str) -> Result<u64>;
}

/// A named job queue over a log-capable backend connection.
///
/// Jobs are wrapped in a versioned envelope (see [`codec`]) and appended
/// to the log `prefix + "queues:" + name`. Ids are assigned by the
/// backend and form a total order reflecting push order.
#[derive(Clone)]
pub struct Queue<S: LogStore> {
    store: S,
    key: String,
}

impl<S: LogStore> Queue<S> {
    /// Open a queue on `store`. `None` or an empty name selects
    /// [`DEFAULT_QUEUE`]; `prefix` is the owning configuration's key
    /// prefix, applied the same way cache keys are.
    pub fn new(store: S, prefix: &str, name: Option<&str>) -> Self {
        let name = match name {
            Some(n) if !n.is_empty() => n,
            _ => DEFAULT_QUEUE,
        };
        Queue {
            store,
            key: format!("{}queues:{}", prefix, name),
        }
    }

    /// The physical log key this queue appends to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Push a job; returns the backend-assigned id, or `None` after a
    /// logged failure. Callers must check — an unpushed job is not
    /// retried by this layer.
    pub async fn push<J: Job>(&self, job: &J) -> Option<String> {
        let payload = match codec::encode_job(job) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("queue push on '{}' failed to encode job: {}", self.key, e);
                return None;
            }
        };

        match self.store.append(&self.key, &payload).await {
            Ok(id) => {
                debug!("✓ queue push '{}' -> {}", self.key, id);
                Some(id)
            }
            Err(e) => {
                error!("queue push on '{}' failed: {}", self.key, e);
                None
            }
        }
    }

    /// Read up to `count` jobs from the earliest position, in push order,
    /// **without removing them** (read is not ack). Entries that fail to
    /// decode into `J` are silently dropped from the result; a backend
    /// failure yields an empty result after logging.
    pub async fn pull<J: Job>(&self, count: usize) -> Vec<(String, J)> {
        let entries = match self.store.range(&self.key, count).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("queue pull on '{}' failed: {}", self.key, e);
                return Vec::new();
            }
        };

        let mut jobs = Vec::with_capacity(entries.len());
        for (id, payload) in entries {
            match codec::decode_job::<J>(&payload) {
                Ok(job) => jobs.push((id, job)),
                // No poison-message path: undecodable entries stay in the
                // log and are skipped on every pull until removed by id.
                Err(e) => debug!("queue pull on '{}': dropping entry {}: {}", self.key, id, e),
            }
        }
        jobs
    }

    /// Acknowledge processed jobs by deleting their positions. Returns how
    /// many of the given ids existed; 0 after a logged backend failure.
    pub async fn remove(&self, ids: &[String]) -> u64 {
        if ids.is_empty() {
            return 0;
        }

        match self.store.remove(&self.key, ids).await {
            Ok(removed) => removed,
            Err(e) => {
                error!("queue remove on '{}' failed: {}", self.key, e);
                0
            }
        }
    }

    /// Total jobs currently in the log, pulled-but-unacked ones included.
    /// 0 after a logged backend failure.
    pub async fn count(&self) -> u64 {
        match self.store.len(&self.key).await {
            Ok(count) => count,
            Err(e) => {
                error!("queue count on '{}' failed: {}", self.key, e);
                0
            }
        }
    }
}

/// A log-capable connection selected by configuration, mirroring
/// [`Driver`](crate::driver::Driver) on the queue side.
#[derive(Clone)]
pub enum LogConn {
    #[cfg(feature = "redis")]
    Redis(crate::driver::RedisConnection),
    #[cfg(feature = "inmemory")]
    Memory(crate::driver::InMemoryStore),
}

impl LogConn {
    /// Connect the log store a configuration resolves to. Same
    /// construction-time failure model as the cache drivers.
    pub async fn connect(config: &crate::config::CacheConfig) -> Result<Self> {
        match config.backend {
            #[cfg(feature = "redis")]
            crate::config::BackendKind::Redis => Ok(LogConn::Redis(
                crate::driver::RedisConnection::connect(config).await?,
            )),
            #[cfg(feature = "inmemory")]
            crate::config::BackendKind::Memory => {
                Ok(LogConn::Memory(crate::driver::InMemoryStore::new()))
            }
            #[allow(unreachable_patterns)]
            other => Err(crate::error::Error::NotSupported(format!(
                "backend {:?} is not compiled into this build",
                other
            ))),
        }
    }
}

impl LogStore for LogConn {
    async fn append(&self, log: &str, payload: &[u8]) -> Result<String> {
        match self {
            #[cfg(feature = "redis")]
            LogConn::Redis(c) => c.append(log, payload).await,
            #[cfg(feature = "inmemory")]
            LogConn::Memory(s) => s.append(log, payload).await,
        }
    }

    async fn range(&self, log: &str, count: usize) -> Result<Vec<(String, Vec<u8>)>> {
        match self {
            #[cfg(feature = "redis")]
            LogConn::Redis(c) => c.range(log, count).await,
            #[cfg(feature = "inmemory")]
            LogConn::Memory(s) => s.range(log, count).await,
        }
    }

    async fn remove(&self, log: &str, ids: &[String]) -> Result<u64> {
        match self {
            #[cfg(feature = "redis")]
            LogConn::Redis(c) => c.remove(log, ids).await,
            #[cfg(feature = "inmemory")]
            LogConn::Memory(s) => s.remove(log, ids).await,
        }
    }

    async fn len(&self, log: &str) -> Result<u64> {
        match self {
            #[cfg(feature = "redis")]
            LogConn::Redis(c) => LogStore::len(c, log).await,
            // Qualified: InMemoryStore also has an inherent `len()`
            #[cfg(feature = "inmemory")]
            LogConn::Memory(s) => LogStore::len(s, log).await,
        }
    }
}
