//! Cache facade and call memoization.
//!
//! A [`Cache`] is the front door to one resolved driver: direct mode
//! forwards every operation verbatim; proxy mode (via [`Cache::proxy`])
//! memoizes calls made against an attached target object.

use crate::config::DEFAULT_PROXY_EXPIRE;
use crate::driver::{CacheDriver, Driver};
use crate::error::Result;
use crate::expire::Expiry;
use crate::fingerprint::fingerprint;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// Configuration-resolved facade over one concrete [`Driver`].
///
/// Cheap to clone; clones share the same underlying connection. Obtain
/// one from a [`CacheRegistry`](crate::registry::CacheRegistry), or wrap
/// a driver directly in tests.
#[derive(Clone)]
pub struct Cache {
    driver: Driver,
    proxy_expire: i64,
}

impl Cache {
    /// Wrap an already-constructed driver.
    pub fn new(driver: Driver) -> Self {
        Cache {
            driver,
            proxy_expire: DEFAULT_PROXY_EXPIRE,
        }
    }

    /// Set the TTL used for memoized proxy entries.
    pub fn with_proxy_expire(mut self, secs: i64) -> Self {
        self.proxy_expire = secs;
        self
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Whether a live entry exists under `key`.
    pub async fn has(&self, key: &str) -> Result<bool> {
        self.driver.has(key).await
    }

    /// Fetch the value under `key`; `Ok(None)` when absent. Absence is
    /// never an error.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.driver.get(key).await
    }

    /// Fetch the value under `key`, or `default` when absent.
    pub async fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.driver.get(key).await?.unwrap_or(default))
    }

    /// Store `value` under `key` with the store's default TTL.
    pub async fn set(&self, key: &str, value: &Value) -> Result<bool> {
        self.driver.set(key, value, Expiry::Default).await
    }

    /// Store `value` under `key` with an explicit expiry.
    pub async fn set_with(&self, key: &str, value: &Value, expire: Expiry) -> Result<bool> {
        self.driver.set(key, value, expire).await
    }

    /// Atomically increment the numeric entry under `key`.
    pub async fn inc(&self, key: &str, step: i64) -> Result<i64> {
        self.driver.inc(key, step).await
    }

    /// Atomically decrement the numeric entry under `key`.
    pub async fn dec(&self, key: &str, step: i64) -> Result<i64> {
        self.driver.dec(key, step).await
    }

    /// Delete the entry under `key`; idempotent.
    pub async fn del(&self, key: &str) -> Result<bool> {
        self.driver.del(key).await
    }

    /// Destroy **all** entries in the backend's selected database — not
    /// just keys under this store's prefix. See [`CacheDriver::clear`].
    pub async fn clear(&self) -> Result<bool> {
        self.driver.clear().await
    }

    /// Verify the backend is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        self.driver.health_check().await
    }

    /// Enter proxy mode: attach a target whose calls get memoized through
    /// this cache. The proxy TTL defaults to the store's `proxy_expire`.
    pub fn proxy<T>(&self, target: T) -> Proxy<T> {
        Proxy {
            cache: self.clone(),
            target,
            expire: self.proxy_expire,
        }
    }
}

/// Memoizing wrapper around a target object.
///
/// [`Proxy::call`] is a pure cache-aside: the fingerprint of
/// (target type, method name, argument list) is looked up first; on a hit
/// the body is **not** invoked, on a miss it runs exactly once and its
/// result is stored under the proxy TTL. There is no invalidation hook —
/// staleness is bounded only by the TTL — and side effects inside the
/// body are therefore observed at most once per TTL window. That is the
/// contract, not a bug.
pub struct Proxy<T> {
    cache: Cache,
    target: T,
    expire: i64,
}

impl<T> Proxy<T> {
    /// Override the TTL for entries memoized through this proxy.
    pub fn with_expire(mut self, secs: i64) -> Self {
        self.expire = secs;
        self
    }

    /// The attached target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Memoize one call against the target.
    ///
    /// `method` and `args` identify the call — together with the target's
    /// concrete type name they form the fingerprint, so identical calls
    /// always map to the same cache entry. `body` performs the real call
    /// and runs only on a miss.
    ///
    /// A cached entry that no longer decodes into `R` (schema drift, a
    /// foreign write) is not an error: the call falls through to `body`
    /// and the entry is overwritten.
    ///
    /// ```ignore
    /// let proxy = cache.proxy(pricing);
    /// let quote: Quote = proxy
    ///     .call("quote", &(customer_id, "EUR"), |p| async move {
    ///         p.quote(customer_id, "EUR").await
    ///     })
    ///     .await?;
    /// ```
    pub async fn call<'a, A, R, F, Fut>(&'a self, method: &str, args: &A, body: F) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: Serialize + DeserializeOwned,
        F: FnOnce(&'a T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let key = fingerprint(std::any::type_name::<T>(), method, args)?;

        if let Some(hit) = self.cache.get(&key).await? {
            if let Some(value) = decode_hit::<R>(&hit) {
                debug!("✓ proxy {} -> HIT", method);
                return Ok(value);
            }
            debug!("proxy {}: cached entry no longer decodes, recomputing", method);
        }

        let value = body(&self.target).await?;
        self.cache
            .set_with(&key, &serde_json::to_value(&value)?, Expiry::Seconds(self.expire))
            .await?;
        debug!("✓ proxy {} -> MISS (stored for {}s)", method, self.expire);
        Ok(value)
    }
}

/// Decode a cached proxy entry back into the caller's return type.
///
/// The numeric bypass stores numeric results as raw strings, so a direct
/// `from_value` is tried first and the raw string is re-parsed as a
/// fallback.
fn decode_hit<R: DeserializeOwned>(hit: &Value) -> Option<R> {
    if let Ok(value) = serde_json::from_value::<R>(hit.clone()) {
        return Some(value);
    }
    if let Value::String(raw) = hit {
        if let Ok(value) = serde_json::from_str::<R>(raw) {
            return Some(value);
        }
    }
    None
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::driver::InMemoryDriver;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn cache() -> Cache {
        Cache::new(Driver::Memory(InMemoryDriver::default()))
    }

    struct Pricing {
        calls: Arc<AtomicUsize>,
    }

    impl Pricing {
        fn new() -> Self {
            Pricing {
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        async fn quote(&self, amount: i64, rate: i64) -> i64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            amount * rate
        }
    }

    #[tokio::test]
    async fn test_direct_mode_forwards() {
        let cache = cache();
        cache.set("greeting", &json!("hi")).await.expect("set");
        assert!(cache.has("greeting").await.expect("has"));
        assert_eq!(
            cache.get("greeting").await.expect("get"),
            Some(json!("hi"))
        );
        assert!(cache.del("greeting").await.expect("del"));
        assert!(!cache.del("greeting").await.expect("del"));
    }

    #[tokio::test]
    async fn test_get_or_returns_default_on_miss() {
        let cache = cache();
        assert_eq!(
            cache.get_or("missing", json!("fallback")).await.expect("get_or"),
            json!("fallback")
        );

        cache.set("present", &json!("real")).await.expect("set");
        assert_eq!(
            cache.get_or("present", json!("fallback")).await.expect("get_or"),
            json!("real")
        );
    }

    #[tokio::test]
    async fn test_proxy_memoizes_identical_calls() {
        let cache = cache();
        let pricing = Pricing::new();
        let calls = pricing.calls.clone();
        let proxy = cache.proxy(pricing);

        let first: i64 = proxy
            .call("quote", &(3, 7), |p| async move { Ok(p.quote(3, 7).await) })
            .await
            .expect("call");
        let second: i64 = proxy
            .call("quote", &(3, 7), |p| async move { Ok(p.quote(3, 7).await) })
            .await
            .expect("call");

        assert_eq!(first, 21);
        assert_eq!(second, 21);
        // The second call hit the cache; the target ran exactly once
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_proxy_distinguishes_arguments() {
        let cache = cache();
        let pricing = Pricing::new();
        let calls = pricing.calls.clone();
        let proxy = cache.proxy(pricing);

        let a: i64 = proxy
            .call("quote", &(3, 7), |p| async move { Ok(p.quote(3, 7).await) })
            .await
            .expect("call");
        let b: i64 = proxy
            .call("quote", &(4, 7), |p| async move { Ok(p.quote(4, 7).await) })
            .await
            .expect("call");

        assert_eq!(a, 21);
        assert_eq!(b, 28);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_proxy_structured_result() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Quote {
            amount: i64,
            currency: String,
        }

        struct Desk;
        impl Desk {
            async fn lookup(&self, amount: i64) -> Quote {
                Quote {
                    amount,
                    currency: "EUR".to_string(),
                }
            }
        }

        let cache = cache();
        let proxy = cache.proxy(Desk);

        let first: Quote = proxy
            .call("lookup", &(5,), |d| async move { Ok(d.lookup(5).await) })
            .await
            .expect("call");
        let second: Quote = proxy
            .call("lookup", &(5,), |d| async move { Ok(d.lookup(5).await) })
            .await
            .expect("call");

        assert_eq!(first, second);
        assert_eq!(first.currency, "EUR");
    }

    #[tokio::test]
    async fn test_proxy_recomputes_on_shape_drift() {
        let cache = cache();
        let pricing = Pricing::new();
        let calls = pricing.calls.clone();
        let proxy = cache.proxy(pricing);

        // Poison the exact fingerprint slot with a value of the wrong shape
        let key = fingerprint(
            std::any::type_name::<Pricing>(),
            "quote",
            &(3, 7),
        )
        .expect("fingerprint");
        cache
            .set(&key, &json!({"not": "a number"}))
            .await
            .expect("set");

        let value: i64 = proxy
            .call("quote", &(3, 7), |p| async move { Ok(p.quote(3, 7).await) })
            .await
            .expect("call");
        assert_eq!(value, 21);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The poisoned entry was overwritten with the real result
        let value: i64 = proxy
            .call("quote", &(3, 7), |p| async move { Ok(p.quote(3, 7).await) })
            .await
            .expect("call");
        assert_eq!(value, 21);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
