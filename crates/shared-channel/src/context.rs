//! # Context Identity
//!
//! Names for execution contexts and the origin policy attached to a post.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one execution context attached to the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    /// Create a context id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ContextId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Origin restriction applied by the sender of a message.
///
/// `Any` delivers regardless of the target's origin. `Exact` delivers only
/// when the target context's origin equals the given string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TargetOrigin {
    /// `"*"`: deliver to whatever origin the target has.
    #[default]
    Any,
    /// Deliver only if the target origin matches exactly.
    Exact(String),
}

impl TargetOrigin {
    /// Parse the host convention: `"*"` means any origin.
    pub fn parse(policy: &str) -> Self {
        if policy == "*" {
            Self::Any
        } else {
            Self::Exact(policy.to_string())
        }
    }

    /// Whether a target with `origin` may receive the message.
    #[must_use]
    pub fn permits(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == origin,
        }
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(origin) => f.write_str(origin),
        }
    }
}
