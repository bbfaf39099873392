//! Memoization fingerprints.
//!
//! A memoized call is identified by a fingerprint of (target type, method
//! name, argument list). The fingerprint must be a pure function of those
//! three inputs and stable across runs and builds — it is a cache key, not
//! a security primitive. Arguments are canonicalized through `serde_json`
//! (field order of structs and tuples is fixed by their definition), and
//! the hash input carries [`FINGERPRINT_VERSION`] so the derivation can be
//! changed without old entries being misread as hits.

use crate::error::{Error, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Version tag mixed into every fingerprint. Bump when the derivation
/// changes; old cache entries then simply miss.
pub const FINGERPRINT_VERSION: u32 = 1;

/// Key prefix for memoized entries, so they are recognizable in the store.
const PROXY_KEY_PREFIX: &str = "proxy:";

/// Compute the cache key for a memoized call.
///
/// ```
/// use stashq::fingerprint::fingerprint;
///
/// let a = fingerprint("billing::Pricing", "quote", &(42, "EUR")).unwrap();
/// let b = fingerprint("billing::Pricing", "quote", &(42, "EUR")).unwrap();
/// let c = fingerprint("billing::Pricing", "quote", &(43, "EUR")).unwrap();
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert!(a.starts_with("proxy:"));
/// ```
///
/// # Errors
/// Returns [`Error::SerializationError`] when the argument list cannot be
/// serialized.
pub fn fingerprint<A>(type_tag: &str, method: &str, args: &A) -> Result<String>
where
    A: Serialize + ?Sized,
{
    let encoded =
        serde_json::to_string(args).map_err(|e| Error::SerializationError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(format!(
        "v{}:{}:{}:{}",
        FINGERPRINT_VERSION, type_tag, method, encoded
    ));

    Ok(format!("{}{}", PROXY_KEY_PREFIX, hex::encode(hasher.finalize())))
}
