//! Error kinds carried on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of every failure the bridge can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No reply within the deadline.
    Timeout,
    /// Transport failure or non-2xx status.
    NetworkError,
    /// Failed validation: unknown method, missing identity, empty URL, bad shape.
    InvalidRequest,
    /// Body was not JSON, or not an object where one was required.
    InvalidResponse,
    /// No channel target set on the requesting side.
    NoTarget,
    /// Component not initialized or already torn down.
    NotInitialized,
    /// Origin rejected. Never sent on the wire; rejected messages are dropped.
    PermissionDenied,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Wire name of this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::InvalidResponse => "INVALID_RESPONSE",
            ErrorKind::NoTarget => "NO_TARGET",
            ErrorKind::NotInitialized => "NOT_INITIALIZED",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal failure as it travels in an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct WireError {
    /// Error kind
    pub code: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl WireError {
    /// Create a new wire error
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, details)
    }

    pub fn invalid_response(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidResponse, details)
    }

    pub fn network(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, details)
    }

    pub fn timeout(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, details)
    }

    pub fn unknown(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, details)
    }

    /// Decode the `error` field of an error envelope.
    ///
    /// Accepts `{code, message}` objects; a bare string (or an object with an
    /// unrecognized code) is kept as an `UNKNOWN` error with its text.
    pub fn from_wire_value(value: &serde_json::Value) -> Self {
        if let Ok(error) = serde_json::from_value::<WireError>(value.clone()) {
            return error;
        }
        match value {
            serde_json::Value::String(text) => Self::unknown(text.clone()),
            serde_json::Value::Object(obj) => {
                let message = obj
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                Self::unknown(message)
            }
            other => Self::unknown(other.to_string()),
        }
    }
}
