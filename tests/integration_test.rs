//! Integration tests for stashq
//!
//! End-to-end behavior over the in-process backend: cache semantics,
//! memoization, and queue push/pull/ack flow.

#![cfg(feature = "inmemory")]

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stashq::{
    CacheConfig, CacheRegistry, Error, Expiry, Job, Settings, ValueCodec,
};

fn registry() -> CacheRegistry {
    let settings = Settings::default()
        .with_store("default", CacheConfig::memory())
        .with_store(
            "sessions",
            CacheConfig::memory().with_prefix("sess:").with_expire(60),
        )
        .with_queue("default", CacheConfig::memory())
        .with_queue("mail", CacheConfig::memory());
    CacheRegistry::new(settings)
}

// Job type used across the queue tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SendMail {
    to: String,
    body: String,
}

impl Job for SendMail {}

fn mail(to: &str) -> SendMail {
    SendMail {
        to: to.to_string(),
        body: "hello".to_string(),
    }
}

/// Test 1: set/get round-trip through the configured serializer.
#[tokio::test]
async fn test_structured_value_roundtrip() {
    let registry = registry();
    let cache = registry.default_cache().await.expect("resolve cache");

    let profile = json!({
        "id": 7,
        "name": "alice",
        "roles": ["admin", "ops"]
    });

    cache.set("user:7", &profile).await.expect("set");
    assert_eq!(cache.get("user:7").await.expect("get"), Some(profile));
}

/// Test 2: numeric values bypass the serializer and round-trip as raw
/// strings — proven with hooks that panic if ever invoked.
#[tokio::test]
async fn test_numeric_values_never_touch_the_serializer() {
    use stashq::driver::{Driver, InMemoryDriver};

    let driver = InMemoryDriver::default().with_codec(ValueCodec::with_hooks(
        Arc::new(|_| panic!("encode hook invoked for numeric value")),
        Arc::new(|_| panic!("decode hook invoked for numeric value")),
    ));
    let cache = stashq::Cache::new(Driver::Memory(driver));

    cache.set("int", &json!(42)).await.expect("set");
    cache.set("float", &json!("3.14")).await.expect("set");

    assert_eq!(cache.get("int").await.expect("get"), Some(json!("42")));
    assert_eq!(cache.get("float").await.expect("get"), Some(json!("3.14")));
}

/// Test 3: miss behavior — absent keys are defaults, never errors.
#[tokio::test]
async fn test_miss_returns_default() {
    let registry = registry();
    let cache = registry.default_cache().await.expect("resolve cache");

    assert_eq!(cache.get("absent").await.expect("get"), None);
    assert_eq!(
        cache
            .get_or("absent", json!("fallback"))
            .await
            .expect("get_or"),
        json!("fallback")
    );
}

/// Test 4: no-TTL entries persist until deleted; explicit TTLs expire.
#[tokio::test]
async fn test_zero_expire_persists_until_del() {
    let registry = registry();
    let cache = registry.default_cache().await.expect("resolve cache");

    cache
        .set_with("greeting", &json!("hi"), Expiry::Seconds(0))
        .await
        .expect("set");
    assert!(cache.has("greeting").await.expect("has"));

    assert!(cache.del("greeting").await.expect("del"));
    assert!(!cache.has("greeting").await.expect("has"));
    // Idempotent on the now-absent key
    assert!(!cache.del("greeting").await.expect("del"));
}

#[tokio::test]
async fn test_ttl_expiry() {
    let registry = registry();
    let cache = registry.default_cache().await.expect("resolve cache");

    cache
        .set_with("ephemeral", &json!("soon gone"), Expiry::Seconds(1))
        .await
        .expect("set");
    assert!(cache.has("ephemeral").await.expect("has"));

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    assert!(!cache.has("ephemeral").await.expect("has"));
}

/// Test 5: counters — inc/dec are numeric-native, mixed with get.
#[tokio::test]
async fn test_counters() {
    let registry = registry();
    let cache = registry.default_cache().await.expect("resolve cache");

    assert_eq!(cache.inc("hits", 1).await.expect("inc"), 1);
    assert_eq!(cache.inc("hits", 9).await.expect("inc"), 10);
    assert_eq!(cache.dec("hits", 3).await.expect("dec"), 7);
    assert_eq!(cache.get("hits").await.expect("get"), Some(json!("7")));

    cache.set("label", &json!("not numeric")).await.expect("set");
    assert!(matches!(
        cache.inc("label", 1).await,
        Err(Error::BackendError(_))
    ));
}

/// Test 6: memoization — identical calls hit, different calls miss, the
/// target runs exactly once per distinct fingerprint.
#[tokio::test]
async fn test_proxy_memoization_end_to_end() {
    struct Geocoder {
        lookups: Arc<AtomicUsize>,
    }

    impl Geocoder {
        async fn locate(&self, city: &str) -> (f64, f64) {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            match city {
                "berlin" => (52.52, 13.40),
                _ => (0.0, 0.0),
            }
        }
    }

    let registry = registry();
    let cache = registry.default_cache().await.expect("resolve cache");

    let lookups = Arc::new(AtomicUsize::new(0));
    let proxy = cache.proxy(Geocoder {
        lookups: lookups.clone(),
    });

    for _ in 0..3 {
        let coords: (f64, f64) = proxy
            .call("locate", &("berlin",), |g| async move {
                Ok(g.locate("berlin").await)
            })
            .await
            .expect("call");
        assert_eq!(coords, (52.52, 13.40));
    }
    assert_eq!(lookups.load(Ordering::SeqCst), 1);

    let _: (f64, f64) = proxy
        .call("locate", &("paris",), |g| async move {
            Ok(g.locate("paris").await)
        })
        .await
        .expect("call");
    assert_eq!(lookups.load(Ordering::SeqCst), 2);
}

/// Test 7: the queue scenario — push, count, pull, ack, count.
#[tokio::test]
async fn test_queue_scenario() {
    let registry = registry();
    let queue = registry.queue("default").await.expect("resolve queue");

    let id = queue.push(&mail("a@example.com")).await.expect("push");
    assert_eq!(id, "1-0");
    assert_eq!(queue.count().await, 1);

    let jobs = queue.pull::<SendMail>(10).await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].0, "1-0");
    assert_eq!(jobs[0].1, mail("a@example.com"));

    assert_eq!(queue.remove(&["1-0".to_string()]).await, 1);
    assert_eq!(queue.count().await, 0);
}

/// Test 8: FIFO order with ascending backend-assigned ids.
#[tokio::test]
async fn test_queue_fifo_order() {
    let registry = registry();
    let queue = registry.queue("mail").await.expect("resolve queue");

    for i in 0..6 {
        queue
            .push(&mail(&format!("user{}@example.com", i)))
            .await
            .expect("push");
    }

    let jobs = queue.pull::<SendMail>(6).await;
    assert_eq!(jobs.len(), 6);
    let mut previous_seq = 0u64;
    for (i, (id, job)) in jobs.iter().enumerate() {
        assert_eq!(job.to, format!("user{}@example.com", i));
        let seq: u64 = id.split('-').next().expect("id shape").parse().expect("id shape");
        assert!(seq > previous_seq, "ids must ascend: {} after {}", id, previous_seq);
        previous_seq = seq;
    }
}

/// Test 9: pull is a read, not an ack — two workers may see the same
/// jobs, and nothing disappears until removed.
#[tokio::test]
async fn test_queue_pull_does_not_claim() {
    let registry = registry();
    let queue = registry.queue("mail").await.expect("resolve queue");

    queue.push(&mail("a@x")).await.expect("push");
    queue.push(&mail("b@x")).await.expect("push");

    let worker_a = queue.pull::<SendMail>(10).await;
    let worker_b = queue.pull::<SendMail>(10).await;
    assert_eq!(worker_a.len(), 2);
    assert_eq!(worker_a, worker_b);
    assert_eq!(queue.count().await, 2);

    // Ack one; the other remains visible
    assert_eq!(queue.remove(&[worker_a[0].0.clone()]).await, 1);
    assert_eq!(queue.count().await, 1);
    let remaining = queue.pull::<SendMail>(10).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].1.to, "b@x");
}

/// Test 10: removing ids that never existed counts zero; mixed batches
/// count only what was there.
#[tokio::test]
async fn test_queue_remove_counts_existing_only() {
    let registry = registry();
    let queue = registry.queue("default").await.expect("resolve queue");

    let id = queue.push(&mail("a@x")).await.expect("push");
    let removed = queue
        .remove(&[id, "99-0".to_string(), "100-0".to_string()])
        .await;
    assert_eq!(removed, 1);
    assert_eq!(queue.count().await, 0);
    assert_eq!(queue.remove(&["99-0".to_string()]).await, 0);
}

/// Test 11: named stores are isolated; cache facades sharing a name
/// share a driver.
#[tokio::test]
async fn test_named_store_isolation_and_sharing() {
    let registry = registry();

    let main = registry.cache("default").await.expect("resolve");
    let sessions = registry.cache("sessions").await.expect("resolve");

    main.set("token", &json!("m")).await.expect("set");
    sessions.set("token", &json!("s")).await.expect("set");
    assert_eq!(main.get("token").await.expect("get"), Some(json!("m")));
    assert_eq!(sessions.get("token").await.expect("get"), Some(json!("s")));

    let main_again = registry.cache("default").await.expect("resolve");
    assert_eq!(main_again.get("token").await.expect("get"), Some(json!("m")));
}

/// Test 12: clear is a wide blast — every entry in the store goes, not
/// just the prefixed ones.
#[tokio::test]
async fn test_clear_wipes_the_whole_store() {
    let registry = registry();
    let cache = registry.cache("sessions").await.expect("resolve");

    cache.set("a", &json!(1)).await.expect("set");
    cache.set("b", &json!(2)).await.expect("set");

    assert!(cache.clear().await.expect("clear"));
    assert!(!cache.has("a").await.expect("has"));
    assert!(!cache.has("b").await.expect("has"));
}

/// Test 13: resolution failures are construction-time errors.
#[tokio::test]
async fn test_unknown_names_fail_fast() {
    let registry = registry();
    assert!(matches!(
        registry.cache("missing").await,
        Err(Error::ConfigError(_))
    ));
    assert!(matches!(
        registry.queue("missing").await,
        Err(Error::ConfigError(_))
    ));
}

/// Test 14: concurrent workers hammering one counter stay atomic.
#[tokio::test]
async fn test_concurrent_increments() {
    let registry = Arc::new(registry());
    let cache = registry.default_cache().await.expect("resolve cache");

    let mut handles = vec![];
    for _ in 0..10 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..100 {
                cache.inc("shared", 1).await.expect("inc");
            }
        }));
    }
    for handle in handles {
        handle.await.expect("task failed");
    }

    assert_eq!(
        cache.get("shared").await.expect("get"),
        Some(json!("1000"))
    );
}
