//! Outbound ports for the responder.

use async_trait::async_trait;
use bridge_wire::{HttpVerb, WireError};
use std::collections::BTreeMap;
use std::time::Duration;

/// A fully built network call.
///
/// Two calls that compare equal put identical bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub method: HttpVerb,
    /// Absolute URL.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// Serialized body.
    pub body: Option<String>,
    pub timeout: Duration,
}

/// What came back from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// JSON response with a 200 status.
    pub fn json_ok(value: &serde_json::Value) -> Self {
        let mut response = Self::new(200, value.to_string());
        response
            .headers
            .insert("content-type".into(), "application/json".into());
        response
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Network executor failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),
}

impl From<ExecutorError> for WireError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Timeout(_) => WireError::timeout(err.to_string()),
            ExecutorError::Transport(_) => WireError::network(err.to_string()),
            ExecutorError::InvalidRequest(_) => WireError::invalid_request(err.to_string()),
        }
    }
}

/// HTTP call with timeout support. Dropping the future cancels the call.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, call: OutboundCall) -> Result<HttpResponse, ExecutorError>;
}
