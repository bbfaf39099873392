//! In-process cache backend (default, thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding and
//! handles TTL expiration on access. Besides the key/value surface it
//! emulates the backend's append-only log primitives (assigned ids, range
//! read, position delete, length) so queue semantics can be tested without
//! a server.

use super::{CacheDriver, DriverOptions};
use crate::codec::ValueCodec;
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::expire::Expiry;
use crate::queue::LogStore;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// One stored entry: the encoded value plus optional expiration.
struct StoredValue {
    raw: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(raw: String, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.map(|d| Instant::now() + d);
        StoredValue { raw, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() > exp)
    }
}

/// One named append-only log. `next_seq` only ever grows, so assigned ids
/// form a total order reflecting append order even across deletes.
#[derive(Default)]
struct LogState {
    next_seq: u64,
    entries: Vec<(String, Vec<u8>)>,
}

/// Shared in-process store: the key/value table and the named logs.
///
/// This is the "connection" of the in-process backend — the cache driver
/// and the queue both hold a handle to one of these, mirroring how the
/// network backend shares one connection pool between the two.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    kv: Arc<DashMap<String, StoredValue>>,
    logs: Arc<DashMap<String, LogState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the raw string under a physical key, expiring lazily.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        if let Some(stored) = self.kv.get(key) {
            if !stored.is_expired() {
                return Some(stored.raw.clone());
            }
        }

        // Drop the expired entry if there was one
        self.kv.remove(key);
        None
    }

    pub fn set_raw(&self, key: &str, raw: String, ttl: Option<Duration>) {
        self.kv.insert(key.to_string(), StoredValue::new(raw, ttl));
    }

    pub fn exists(&self, key: &str) -> bool {
        self.kv.get(key).map(|s| !s.is_expired()).unwrap_or(false)
    }

    /// Atomic add on a numeric entry. A missing (or expired) key starts
    /// from 0 with no TTL; an existing entry keeps its expiration. The
    /// shard lock held by the entry guard is what makes this atomic.
    pub fn incr(&self, key: &str, step: i64) -> Result<i64> {
        let mut entry = self
            .kv
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::new("0".to_string(), None));

        if entry.is_expired() {
            *entry = StoredValue::new("0".to_string(), None);
        }

        let current: i64 = entry.raw.parse().map_err(|_| {
            Error::BackendError(format!("value at '{}' is not an integer", key))
        })?;
        let next = current + step;
        entry.raw = next.to_string();
        Ok(next)
    }

    /// Remove an entry; true iff a live entry was actually removed.
    pub fn del(&self, key: &str) -> bool {
        match self.kv.remove(key) {
            Some((_, stored)) => !stored.is_expired(),
            None => false,
        }
    }

    /// Drop everything — key/value entries and logs, matching FLUSHDB,
    /// which takes stream keys with it.
    pub fn clear_all(&self) {
        self.kv.clear();
        self.logs.clear();
    }

    /// Current number of key/value entries (expired ones included until
    /// they are touched).
    pub fn len(&self) -> usize {
        self.kv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kv.is_empty()
    }

    // ------------------------------------------------------------------
    // Append-only log primitives
    // ------------------------------------------------------------------

    /// Append a payload, returning the assigned id (`"1-0"`, `"2-0"`, …).
    pub fn log_append(&self, log: &str, payload: &[u8]) -> String {
        let mut state = self.logs.entry(log.to_string()).or_default();
        state.next_seq += 1;
        let id = format!("{}-0", state.next_seq);
        state.entries.push((id.clone(), payload.to_vec()));
        id
    }

    /// Read up to `count` entries from the earliest position, in append
    /// order, without removing them.
    pub fn log_range(&self, log: &str, count: usize) -> Vec<(String, Vec<u8>)> {
        self.logs
            .get(log)
            .map(|state| state.entries.iter().take(count).cloned().collect())
            .unwrap_or_default()
    }

    /// Delete the given positions; returns how many existed.
    pub fn log_delete(&self, log: &str, ids: &[String]) -> u64 {
        match self.logs.get_mut(log) {
            Some(mut state) => {
                let before = state.entries.len();
                state.entries.retain(|(id, _)| !ids.contains(id));
                (before - state.entries.len()) as u64
            }
            None => 0,
        }
    }

    /// Total entries currently in the log.
    pub fn log_len(&self, log: &str) -> u64 {
        self.logs
            .get(log)
            .map(|state| state.entries.len() as u64)
            .unwrap_or(0)
    }
}

impl LogStore for InMemoryStore {
    async fn append(&self, log: &str, payload: &[u8]) -> Result<String> {
        Ok(self.log_append(log, payload))
    }

    async fn range(&self, log: &str, count: usize) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self.log_range(log, count))
    }

    async fn remove(&self, log: &str, ids: &[String]) -> Result<u64> {
        Ok(self.log_delete(log, ids))
    }

    async fn len(&self, log: &str) -> Result<u64> {
        Ok(self.log_len(log))
    }
}

/// In-process cache driver over an [`InMemoryStore`].
#[derive(Clone, Default)]
pub struct InMemoryDriver {
    store: InMemoryStore,
    options: DriverOptions,
}

impl InMemoryDriver {
    pub fn new(config: &CacheConfig) -> Self {
        InMemoryDriver {
            store: InMemoryStore::new(),
            options: DriverOptions::from_config(config),
        }
    }

    /// Replace the value codec.
    pub fn with_codec(mut self, codec: ValueCodec) -> Self {
        self.options.codec = codec;
        self
    }

    /// A shared handle to the underlying store, for composing a queue on
    /// the same "connection".
    pub fn store(&self) -> InMemoryStore {
        self.store.clone()
    }
}

impl CacheDriver for InMemoryDriver {
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.store.exists(&self.options.cache_key(key)))
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.store.get_raw(&self.options.cache_key(key)) {
            Some(raw) => Ok(Some(self.options.codec.decode(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, expire: Expiry) -> Result<bool> {
        let secs = expire.to_seconds(self.options.expire, SystemTime::now());
        if secs < 0 {
            return Err(Error::BackendError(format!(
                "invalid expire time {} for key '{}'",
                secs, key
            )));
        }

        let raw = self.options.codec.encode(value)?;
        let ttl = (secs > 0).then(|| Duration::from_secs(secs as u64));
        self.store.set_raw(&self.options.cache_key(key), raw, ttl);

        debug!("✓ InMemory SET {} (TTL: {}s)", key, secs);
        Ok(true)
    }

    async fn inc(&self, key: &str, step: i64) -> Result<i64> {
        self.store.incr(&self.options.cache_key(key), step)
    }

    async fn dec(&self, key: &str, step: i64) -> Result<i64> {
        self.store.incr(&self.options.cache_key(key), -step)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let removed = self.store.del(&self.options.cache_key(key));
        debug!("✓ InMemory DELETE {} -> {}", key, removed);
        Ok(removed)
    }

    async fn clear(&self) -> Result<bool> {
        self.store.clear_all();
        warn!("⚠ InMemory CLEAR executed - all cache entries dropped!");
        Ok(true)
    }
}
