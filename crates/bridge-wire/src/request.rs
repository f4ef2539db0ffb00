//! The two request variants.

use crate::error::WireError;
use crate::methods::{HttpVerb, PluginMethod};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Tagged union carried in the `request` field of an enhanced envelope.
///
/// ```json
/// {"type": "plugin", "method": "getUserInfo", "callerId": "u1", "scopeId": "c1"}
/// {"type": "http", "url": "/api/ping", "method": "GET"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    Plugin(PluginCall),
    Http(HttpCall),
}

impl Request {
    /// Validate whichever variant this is.
    pub fn validate(&self) -> Result<(), WireError> {
        match self {
            Request::Plugin(call) => call.validate().map(|_| ()),
            Request::Http(call) => call.validate(),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &str {
        match self {
            Request::Plugin(call) => &call.method,
            Request::Http(call) => &call.url,
        }
    }
}

impl From<PluginCall> for Request {
    fn from(call: PluginCall) -> Self {
        Request::Plugin(call)
    }
}

impl From<HttpCall> for Request {
    fn from(call: HttpCall) -> Self {
        Request::Http(call)
    }
}

/// Structured call routed through the method table.
///
/// `method` stays a string so an unknown name survives decoding and is
/// reported as `INVALID_REQUEST` by [`PluginCall::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginCall {
    pub method: String,
    #[serde(default)]
    pub caller_id: String,
    #[serde(default)]
    pub scope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl PluginCall {
    pub fn new(
        method: impl Into<String>,
        caller_id: impl Into<String>,
        scope_id: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            caller_id: caller_id.into(),
            scope_id: scope_id.into(),
            params: None,
            signature: None,
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Check method membership and identity presence.
    pub fn validate(&self) -> Result<PluginMethod, WireError> {
        let method = self.method.parse::<PluginMethod>()?;
        if self.caller_id.trim().is_empty() {
            return Err(WireError::invalid_request("callerId is required"));
        }
        if self.scope_id.trim().is_empty() {
            return Err(WireError::invalid_request("scopeId is required"));
        }
        Ok(method)
    }
}

/// Raw HTTP passthrough call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpCall {
    /// Absolute, or relative to the responder's base address.
    pub url: String,
    #[serde(default)]
    pub method: HttpVerb,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Per-call timeout override in milliseconds.
    #[serde(default, rename = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl HttpCall {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpVerb::Get,
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: None,
        }
    }

    pub fn with_method(mut self, method: HttpVerb) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn validate(&self) -> Result<(), WireError> {
        if self.url.trim().is_empty() {
            return Err(WireError::invalid_request("url is required"));
        }
        Ok(())
    }
}
