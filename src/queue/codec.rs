//! Job envelope codec.
//!
//! Every queue payload is Postcard-encoded inside a versioned envelope:
//!
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (4 bytes)│POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────────────────┘
//!   "SQJB"              u32                postcard::to_allocvec(J)
//! ```
//!
//! The envelope is what lets `pull` distinguish "a job of the expected
//! shape" from foreign or stale bytes in the log: wrong magic, wrong
//! version or a payload that no longer matches the job type all fail
//! decoding, and the queue drops such entries from the result.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Magic header identifying a queue job envelope.
pub const QUEUE_MAGIC: [u8; 4] = *b"SQJB";

/// Current envelope schema version.
///
/// Increment on breaking changes to job encoding; entries written under an
/// old version are then skipped on `pull` instead of being misread.
pub const QUEUE_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope wrapped around every job payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JobEnvelope<T> {
    pub magic: [u8; 4],
    pub version: u32,
    pub payload: T,
}

impl<T> JobEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            magic: QUEUE_MAGIC,
            version: QUEUE_SCHEMA_VERSION,
            payload,
        }
    }
}

/// Serialize a job with its envelope for appending to the log.
///
/// # Errors
/// Returns [`Error::SerializationError`] if Postcard encoding fails.
pub fn encode_job<T: Serialize>(job: &T) -> Result<Vec<u8>> {
    let envelope = JobEnvelope::new(job);
    postcard::to_allocvec(&envelope).map_err(|e| Error::SerializationError(e.to_string()))
}

/// Deserialize a job from log bytes, validating magic and version.
///
/// # Errors
/// - [`Error::DeserializationError`]: corrupted bytes, or a payload that
///   does not match the expected job shape
/// - [`Error::DeserializationError`]: magic or version mismatch
pub fn decode_job<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let envelope: JobEnvelope<T> = postcard::from_bytes(bytes)
        .map_err(|e| Error::DeserializationError(e.to_string()))?;

    if envelope.magic != QUEUE_MAGIC {
        return Err(Error::DeserializationError(format!(
            "invalid envelope magic: expected {:?}, got {:?}",
            QUEUE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != QUEUE_SCHEMA_VERSION {
        return Err(Error::DeserializationError(format!(
            "envelope version mismatch: expected {}, got {}",
            QUEUE_SCHEMA_VERSION, envelope.version
        )));
    }

    Ok(envelope.payload)
}
