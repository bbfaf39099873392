//! Named cache and queue resolution.
//!
//! A [`CacheRegistry`] owns one live connection per named configuration —
//! constructed lazily on first use, then shared by every caller for the
//! lifetime of the registry. This is explicit dependency injection in
//! place of hidden global state: build one registry at startup and pass
//! handles around.

use crate::cache::Cache;
use crate::config::Settings;
use crate::driver::Driver;
use crate::error::Result;
use crate::queue::{LogConn, Queue};
use dashmap::DashMap;
use tokio::sync::Mutex;

/// Owns one live [`Driver`] per named store and one [`LogConn`] per named
/// queue. Lazy: a driver is constructed on the first `cache(name)` call
/// and reused by every later one; teardown is implicit at drop.
///
/// Resolution failures are fatal at resolution time — a missing or
/// malformed configuration is a
/// [`ConfigError`](crate::Error::ConfigError), an unreachable backend a
/// [`BackendUnavailable`](crate::Error::BackendUnavailable) — never
/// deferred to first operation.
pub struct CacheRegistry {
    settings: Settings,
    drivers: DashMap<String, Driver>,
    queues: DashMap<String, LogConn>,
    // Serializes lazy construction so at most one driver exists per name;
    // dashmap alone cannot hold an entry lock across an await.
    init_lock: Mutex<()>,
}

impl CacheRegistry {
    pub fn new(settings: Settings) -> Self {
        CacheRegistry {
            settings,
            drivers: DashMap::new(),
            queues: DashMap::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// The settings this registry resolves against.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolve the named store to a [`Cache`], constructing (and caching)
    /// its driver on first use.
    pub async fn cache(&self, name: &str) -> Result<Cache> {
        let config = self.settings.store(name)?;

        if let Some(driver) = self.drivers.get(name) {
            return Ok(Cache::new(driver.clone()).with_proxy_expire(config.proxy_expire));
        }

        let _guard = self.init_lock.lock().await;
        // Re-check: another task may have finished construction while we
        // waited on the lock
        if let Some(driver) = self.drivers.get(name) {
            return Ok(Cache::new(driver.clone()).with_proxy_expire(config.proxy_expire));
        }

        let driver = Driver::connect(config).await?;
        self.drivers.insert(name.to_string(), driver.clone());
        info!("cache store '{}' initialized", name);

        Ok(Cache::new(driver).with_proxy_expire(config.proxy_expire))
    }

    /// Resolve the default store (the one named by `settings.default`).
    pub async fn default_cache(&self) -> Result<Cache> {
        let name = self.settings.default.clone();
        self.cache(&name).await
    }

    /// Resolve the named queue, constructing (and caching) its backend
    /// connection on first use. The queue's log key is
    /// `prefix + "queues:" + name`.
    pub async fn queue(&self, name: &str) -> Result<Queue<LogConn>> {
        let config = self.settings.queue(name)?;

        if let Some(conn) = self.queues.get(name) {
            return Ok(Queue::new(conn.clone(), &config.prefix, Some(name)));
        }

        let _guard = self.init_lock.lock().await;
        if let Some(conn) = self.queues.get(name) {
            return Ok(Queue::new(conn.clone(), &config.prefix, Some(name)));
        }

        let conn = LogConn::connect(config).await?;
        self.queues.insert(name.to_string(), conn.clone());
        info!("queue '{}' initialized", name);

        Ok(Queue::new(conn, &config.prefix, Some(name)))
    }
}
