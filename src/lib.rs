//! # stashq
//!
//! A pluggable, async cache layer with call memoization, extended into a
//! minimal append-log job queue on the same backend connections.
//!
//! ## Features
//!
//! - **Driver contract:** `has`/`get`/`set`/`inc`/`dec`/`del`/`clear`
//!   against any compiled-in backend, selected by configuration
//! - **TTL normalization:** absolute deadlines, durations and raw second
//!   counts all collapse to one backend TTL
//! - **Numeric bypass:** numeric values are stored raw so atomic
//!   increment/decrement work natively at the backend
//! - **Memoization proxy:** cache-aside for arbitrary calls, keyed by a
//!   stable fingerprint of (type, method, arguments)
//! - **Job queue:** push / pull / ack-by-remove / count over the
//!   backend's append-only log, at-least-once with fail-soft errors
//!
//! ## Quick Start
//!
//! ```ignore
//! use stashq::{CacheConfig, CacheRegistry, Expiry, Settings};
//! use serde_json::json;
//!
//! let settings = Settings::default()
//!     .with_store("default", CacheConfig::redis().with_prefix("app:"))
//!     .with_queue("mail", CacheConfig::redis());
//! let registry = CacheRegistry::new(settings);
//!
//! // Key/value caching
//! let cache = registry.default_cache().await?;
//! cache.set_with("greeting", &json!("hi"), Expiry::Seconds(60)).await?;
//!
//! // Memoization: the second identical call never reaches the target
//! let proxy = cache.proxy(pricing_service);
//! let quote: i64 = proxy
//!     .call("quote", &(42, "EUR"), |p| async move { p.quote(42, "EUR").await })
//!     .await?;
//!
//! // Job queue on the same kind of connection
//! let queue = registry.queue("mail").await?;
//! let id = queue.push(&job).await;           // None on backend failure
//! let jobs = queue.pull::<SendMail>(10).await; // read, not ack
//! queue.remove(&[id.unwrap()]).await;          // ack by deletion
//! ```
//!
//! ## Error model
//!
//! Cache drivers propagate backend failures; the queue logs them and
//! returns safe defaults. Configuration and connection problems fail at
//! construction, never at first use. See [`error::Error`].

#[macro_use]
extern crate log;

pub mod cache;
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod expire;
pub mod fingerprint;
pub mod queue;
pub mod registry;

// Re-exports for convenience
pub use cache::{Cache, Proxy};
pub use codec::ValueCodec;
pub use config::{BackendKind, CacheConfig, Settings};
pub use driver::{CacheDriver, Driver, DriverOptions};
pub use error::{Error, Result};
pub use expire::Expiry;
pub use queue::{Job, LogConn, LogStore, Queue, DEFAULT_QUEUE};
pub use registry::CacheRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
