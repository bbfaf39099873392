//! Value (de)serialization for cache storage.
//!
//! Cache values are [`serde_json::Value`]s encoded to strings through a
//! configurable hook pair, defaulting to JSON. Numeric values — numbers and
//! numeric-looking strings — bypass the hooks entirely and are stored as
//! plain numeric strings. That bypass is load-bearing, not an optimization
//! detail: `inc`/`dec` require native numeric storage at the backend, and
//! numeric values round-trip as raw strings as a result.

use crate::error::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Encode hook: value to stored string.
pub type EncodeFn = Arc<dyn Fn(&Value) -> Result<String> + Send + Sync>;

/// Decode hook: stored string back to a value.
pub type DecodeFn = Arc<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/// Configurable encode/decode pair with the numeric bypass applied on both
/// sides. Cheap to clone.
#[derive(Clone)]
pub struct ValueCodec {
    encode_fn: EncodeFn,
    decode_fn: DecodeFn,
}

impl ValueCodec {
    /// The default codec: JSON text via `serde_json`.
    pub fn json() -> Self {
        ValueCodec {
            encode_fn: Arc::new(|value| {
                serde_json::to_string(value).map_err(|e| Error::SerializationError(e.to_string()))
            }),
            decode_fn: Arc::new(|raw| {
                serde_json::from_str(raw).map_err(|e| Error::DeserializationError(e.to_string()))
            }),
        }
    }

    /// Codec with caller-supplied hooks. The numeric bypass still applies:
    /// the hooks never see numeric values.
    pub fn with_hooks(encode_fn: EncodeFn, decode_fn: DecodeFn) -> Self {
        ValueCodec {
            encode_fn,
            decode_fn,
        }
    }

    /// Encode a value for storage.
    ///
    /// Numbers and numeric-looking strings are returned as their plain
    /// string representation without invoking the encode hook.
    pub fn encode(&self, value: &Value) -> Result<String> {
        if let Some(raw) = numeric_repr(value) {
            return Ok(raw);
        }
        (self.encode_fn)(value)
    }

    /// Decode a stored string.
    ///
    /// A numeric-looking raw string is returned as a raw string value
    /// without invoking the decode hook. Note the asymmetry this creates:
    /// `set` with the number `42` comes back from `get` as the string
    /// `"42"` — an explicit behavioral contract of the numeric bypass.
    pub fn decode(&self, raw: &str) -> Result<Value> {
        if is_numeric(raw) {
            return Ok(Value::String(raw.to_owned()));
        }
        (self.decode_fn)(raw)
    }
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::json()
    }
}

/// Plain string representation of a numeric value, if it is one.
fn numeric_repr(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if is_numeric(s) => Some(s.clone()),
        _ => None,
    }
}

/// Whether a raw string looks like a finite number ("42", "3.14", "-1e3").
fn is_numeric(raw: &str) -> bool {
    !raw.is_empty() && raw.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false)
}
