//! Correlation ID for request tracking.
//!
//! `<prefix>_<uuid-v7>`: the UUID v7 carries a millisecond timestamp and 74
//! random bits, so ids never collide within a process lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation ID binding one logical call to its eventual reply.
///
/// Opaque on the wire: a peer may send any non-empty string, and only
/// equality matters for matching. Retries reuse the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a new correlation ID with the given prefix.
    pub fn generate(prefix: &str) -> Self {
        let uuid = Uuid::now_v7();
        if prefix.is_empty() {
            Self(uuid.simple().to_string())
        } else {
            Self(format!("{}_{}", prefix, uuid.simple()))
        }
    }

    /// Wrap an id received from the wire.
    pub fn from_wire(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Timestamp (milliseconds since Unix epoch) for ids generated locally.
    ///
    /// Returns `None` for foreign ids that do not end in a UUID v7.
    pub fn timestamp_ms(&self) -> Option<u64> {
        let tail = self.0.rsplit('_').next()?;
        let uuid = Uuid::parse_str(tail).ok()?;
        let bytes = uuid.as_bytes();
        if (bytes[6] >> 4) != 7 {
            return None;
        }
        let ts = ((bytes[0] as u64) << 40)
            | ((bytes[1] as u64) << 32)
            | ((bytes[2] as u64) << 24)
            | ((bytes[3] as u64) << 16)
            | ((bytes[4] as u64) << 8)
            | (bytes[5] as u64);
        Some(ts)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
