//! Legacy flat request shape.
//!
//! Older requestors send `{endpoint, payload}` instead of a tagged
//! `request`. The shape converts losslessly into [`PluginCall`] at the
//! boundary; nothing past the envelope decoder ever sees it.

use crate::methods::{endpoint_for, method_for_endpoint, PluginMethod};
use crate::request::PluginCall;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload of a legacy request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPayload {
    #[serde(default)]
    pub caller_id: String,
    #[serde(default)]
    pub scope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// A legacy request: endpoint plus payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRequest {
    /// A registry path (`/api/plugin/user-info`) or a bare method name.
    pub endpoint: String,
    pub payload: LegacyPayload,
}

impl LegacyRequest {
    /// Express a structured call in the legacy shape.
    ///
    /// Known methods are sent as their registry path; anything else keeps
    /// its name so the receiving side reports it as unknown.
    pub fn from_call(call: &PluginCall) -> Self {
        let endpoint = PluginMethod::parse(&call.method)
            .and_then(endpoint_for)
            .map_or_else(|| call.method.clone(), str::to_string);
        Self {
            endpoint,
            payload: LegacyPayload {
                caller_id: call.caller_id.clone(),
                scope_id: call.scope_id.clone(),
                params: call.params.clone(),
                signature: call.signature.clone(),
            },
        }
    }
}

/// Map a legacy request onto the structured-call variant.
///
/// Optional fields absent in the payload stay absent in the result, so
/// validation behaves identically on both paths.
pub fn convert_legacy_to_structured(legacy: &LegacyRequest) -> PluginCall {
    let method = method_for_endpoint(&legacy.endpoint)
        .map_or_else(|| legacy.endpoint.clone(), |m| m.as_str().to_string());
    PluginCall {
        method,
        caller_id: legacy.payload.caller_id.clone(),
        scope_id: legacy.payload.scope_id.clone(),
        params: legacy.payload.params.clone(),
        signature: legacy.payload.signature.clone(),
    }
}
