//! Error types for the cache and queue layers.

use std::fmt;

/// Result type for cache and queue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by every component of the crate.
///
/// Failure policy differs by component:
/// - Cache drivers **propagate** in-flight failures to the caller, who
///   decides on a fallback.
/// - The queue **never propagates**: it logs the error and returns a safe
///   empty/zero value so a flaky backend cannot crash a worker loop.
/// - Configuration and connection errors are fatal at construction time.
#[derive(Debug, Clone)]
pub enum Error {
    /// Named cache/queue configuration is missing or malformed.
    ///
    /// Raised when resolving a store or queue by name fails, or when the
    /// configured backend kind is unknown. Fatal at construction; nothing
    /// is deferred to first use.
    ConfigError(String),

    /// The backend could not be reached at driver construction.
    ///
    /// Covers pool creation, the initial connect, authentication and
    /// database selection. Distinct from [`Error::BackendError`] so callers
    /// can tell "never came up" from "failed mid-flight".
    BackendUnavailable(String),

    /// An in-flight backend call failed (network error, protocol error).
    ///
    /// Cache drivers surface this to the caller. Queue operations catch it
    /// internally and degrade to a safe default.
    BackendError(String),

    /// A backend round trip exceeded the configured per-call timeout.
    ///
    /// Mapped onto the same failure path as [`Error::BackendError`]; the
    /// distinction exists only for diagnostics.
    Timeout(String),

    /// Encoding a value for storage failed.
    SerializationError(String),

    /// Decoding a stored value failed.
    ///
    /// Indicates corrupted or foreign data under a cache key. The entry
    /// should be evicted and recomputed.
    DeserializationError(String),

    /// The resolved driver cannot perform the requested operation.
    ///
    /// Raised when a backend kind was not compiled into this build, or a
    /// driver lacks a capability the facade was asked for.
    NotSupported(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::BackendUnavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::NotSupported(msg) => write!(f, "Not supported: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::BackendError(format!("Redis error: {}", e))
    }
}
