//! Method registry and the method→endpoint routing table.
//!
//! Every structured call names one of a fixed set of methods. Each method
//! maps to a route: the network path, the HTTP verb, how the signature is
//! presented, and whether the upstream reply is already an envelope.
//!
//! | Method | Route | Auth | Reply |
//! |--------|-------|------|-------|
//! | getBootstrap | GET /api/bootstrap | Bearer signature | raw body |
//! | validateSession | POST /api/session/validate | `{"token": signature}` | raw body |
//! | everything else | POST (full call as body) | none | envelope |

use crate::error::WireError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Known structured-call methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PluginMethod {
    GetBootstrap,
    ValidateSession,
    GetUserInfo,
    GetScopeInfo,
    GetSettings,
    UpdateSettings,
    SendMessage,
}

impl PluginMethod {
    /// Every known method, in registry order.
    pub const ALL: [PluginMethod; 7] = [
        PluginMethod::GetBootstrap,
        PluginMethod::ValidateSession,
        PluginMethod::GetUserInfo,
        PluginMethod::GetScopeInfo,
        PluginMethod::GetSettings,
        PluginMethod::UpdateSettings,
        PluginMethod::SendMessage,
    ];

    /// Wire name of the method.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PluginMethod::GetBootstrap => "getBootstrap",
            PluginMethod::ValidateSession => "validateSession",
            PluginMethod::GetUserInfo => "getUserInfo",
            PluginMethod::GetScopeInfo => "getScopeInfo",
            PluginMethod::GetSettings => "getSettings",
            PluginMethod::UpdateSettings => "updateSettings",
            PluginMethod::SendMessage => "sendMessage",
        }
    }

    /// Look up a method by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for PluginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginMethod {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| WireError::invalid_request(format!("unknown method: {s}")))
    }
}

/// HTTP verb of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpVerb {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
        }
    }

    /// Whether a body is sent with this verb.
    pub const fn carries_body(&self) -> bool {
        !matches!(self, HttpVerb::Get | HttpVerb::Head)
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the call's signature is presented upstream.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "style", content = "field", rename_all = "camelCase")]
pub enum AuthStyle {
    /// The whole call is the body; nothing extra.
    #[default]
    None,
    /// `Authorization: Bearer <signature>`, no body.
    BearerSignature,
    /// Body is `{<field>: <signature>}`.
    BodyField(String),
}

/// Shape of the upstream reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseShape {
    /// Upstream already answers `{success, result?, error?}`.
    #[default]
    Envelope,
    /// Upstream answers with a raw body that gets wrapped.
    RawBody,
}

/// Routing entry for one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub path: String,
    #[serde(default = "default_route_verb")]
    pub verb: HttpVerb,
    #[serde(default)]
    pub auth: AuthStyle,
    #[serde(default)]
    pub response: ResponseShape,
}

fn default_route_verb() -> HttpVerb {
    HttpVerb::Post
}

impl RouteSpec {
    /// POST the whole call, expect an envelope back.
    pub fn envelope(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            verb: HttpVerb::Post,
            auth: AuthStyle::None,
            response: ResponseShape::Envelope,
        }
    }

    pub fn with_verb(mut self, verb: HttpVerb) -> Self {
        self.verb = verb;
        self
    }

    pub fn with_auth(mut self, auth: AuthStyle) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_response(mut self, response: ResponseShape) -> Self {
        self.response = response;
        self
    }
}

/// Method metadata
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub method: PluginMethod,
    /// Default route
    pub route: RouteSpec,
    /// Brief description
    pub description: &'static str,
}

impl MethodInfo {
    fn new(method: PluginMethod, route: RouteSpec, description: &'static str) -> Self {
        Self {
            method,
            route,
            description,
        }
    }
}

/// Method registry - every supported method with its default route.
pub static METHOD_REGISTRY: LazyLock<HashMap<PluginMethod, MethodInfo>> = LazyLock::new(|| {
    let methods = [
        // --- Bootstrap / session: upstream does not speak the envelope ---
        MethodInfo::new(
            PluginMethod::GetBootstrap,
            RouteSpec::envelope("/api/bootstrap")
                .with_verb(HttpVerb::Get)
                .with_auth(AuthStyle::BearerSignature)
                .with_response(ResponseShape::RawBody),
            "Returns the bootstrap document for the signed session",
        ),
        MethodInfo::new(
            PluginMethod::ValidateSession,
            RouteSpec::envelope("/api/session/validate")
                .with_auth(AuthStyle::BodyField("token".to_string()))
                .with_response(ResponseShape::RawBody),
            "Validates a session token",
        ),
        // --- Plugin API ---
        MethodInfo::new(
            PluginMethod::GetUserInfo,
            RouteSpec::envelope("/api/plugin/user-info"),
            "Returns the calling user's profile",
        ),
        MethodInfo::new(
            PluginMethod::GetScopeInfo,
            RouteSpec::envelope("/api/plugin/scope-info"),
            "Returns the scope the plugin runs in",
        ),
        MethodInfo::new(
            PluginMethod::GetSettings,
            RouteSpec::envelope("/api/plugin/settings/get"),
            "Returns stored plugin settings",
        ),
        MethodInfo::new(
            PluginMethod::UpdateSettings,
            RouteSpec::envelope("/api/plugin/settings/update"),
            "Replaces stored plugin settings",
        ),
        MethodInfo::new(
            PluginMethod::SendMessage,
            RouteSpec::envelope("/api/plugin/send-message"),
            "Posts a message into the scope",
        ),
    ];

    methods.into_iter().map(|m| (m.method, m)).collect()
});

/// Get method info by wire name.
pub fn get_method_info(method: &str) -> Option<&'static MethodInfo> {
    PluginMethod::parse(method).and_then(|m| METHOD_REGISTRY.get(&m))
}

/// Check if a method name is in the known set.
pub fn is_method_supported(method: &str) -> bool {
    get_method_info(method).is_some()
}

/// Default route for a method.
pub fn route_for(method: PluginMethod) -> Option<&'static RouteSpec> {
    METHOD_REGISTRY.get(&method).map(|info| &info.route)
}

/// Default network path for a method.
pub fn endpoint_for(method: PluginMethod) -> Option<&'static str> {
    route_for(method).map(|route| route.path.as_str())
}

/// Resolve a legacy `endpoint` value: either a registry path or a bare
/// method name.
pub fn method_for_endpoint(endpoint: &str) -> Option<PluginMethod> {
    PluginMethod::parse(endpoint).or_else(|| {
        METHOD_REGISTRY
            .values()
            .find(|info| info.route.path == endpoint)
            .map(|info| info.method)
    })
}
