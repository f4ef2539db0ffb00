//! Route table and outbound call construction.

use crate::domain::config::ConfigError;
use crate::ports::outbound::OutboundCall;
use bridge_wire::{
    route_for, AuthStyle, HttpCall, HttpVerb, PluginCall, PluginMethod, RouteSpec, WireError,
};
use reqwest::Url;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";

/// Method → route mapping, immutable once built.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<PluginMethod, RouteSpec>,
}

impl RouteTable {
    /// The registry defaults.
    pub fn defaults() -> Self {
        let routes = PluginMethod::ALL
            .into_iter()
            .filter_map(|m| route_for(m).map(|r| (m, r.clone())))
            .collect();
        Self { routes }
    }

    /// Registry defaults with per-method overrides applied.
    pub fn with_overrides(overrides: &BTreeMap<String, RouteSpec>) -> Result<Self, ConfigError> {
        let mut table = Self::defaults();
        for (name, route) in overrides {
            let method = PluginMethod::parse(name)
                .ok_or_else(|| ConfigError::UnknownRouteMethod(name.clone()))?;
            table.routes.insert(method, route.clone());
        }
        Ok(table)
    }

    pub fn route(&self, method: PluginMethod) -> Option<&RouteSpec> {
        self.routes.get(&method)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Builds [`OutboundCall`]s against one base address.
#[derive(Debug, Clone)]
pub struct OutboundBuilder {
    base: Url,
    default_headers: BTreeMap<String, String>,
    default_timeout: Duration,
}

impl OutboundBuilder {
    pub fn new(base: Url, default_headers: BTreeMap<String, String>, default_timeout: Duration) -> Self {
        Self {
            base,
            default_headers,
            default_timeout,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Outbound call for a validated structured call.
    pub fn plugin(&self, route: &RouteSpec, call: &PluginCall) -> Result<OutboundCall, WireError> {
        let url = self.route_url(&route.path)?;
        let mut headers = BTreeMap::new();

        let body = match &route.auth {
            AuthStyle::None => Some(encode_body(call)?),
            AuthStyle::BearerSignature => {
                let signature = required_signature(call)?;
                headers.insert(AUTHORIZATION.to_string(), format!("Bearer {signature}"));
                None
            }
            AuthStyle::BodyField(field) => {
                let signature = required_signature(call)?;
                let mut body = serde_json::Map::new();
                body.insert(field.clone(), serde_json::Value::String(signature.to_string()));
                Some(encode_body(&body)?)
            }
        };

        if body.is_some() {
            headers.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
        }

        Ok(OutboundCall {
            method: route.verb,
            url,
            headers: merge_headers(&self.default_headers, headers),
            body,
            timeout: self.default_timeout,
        })
    }

    /// Outbound call for a validated passthrough call.
    pub fn http(&self, call: &HttpCall) -> Result<OutboundCall, WireError> {
        let url = self
            .base
            .join(&call.url)
            .map_err(|e| WireError::invalid_request(format!("invalid url {:?}: {e}", call.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(WireError::invalid_request(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        let mut headers = call.headers.clone();
        let body = match &call.body {
            None => None,
            Some(serde_json::Value::String(text)) => Some(text.clone()),
            Some(value) => {
                if !has_header(&headers, CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
                }
                Some(value.to_string())
            }
        };

        Ok(OutboundCall {
            method: call.method,
            url: url.to_string(),
            headers: merge_headers(&self.default_headers, headers),
            body,
            timeout: call
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(self.default_timeout),
        })
    }

    fn route_url(&self, path: &str) -> Result<String, WireError> {
        let joined = format!("{}{}", self.base.as_str().trim_end_matches('/'), path);
        Url::parse(&joined)
            .map(|u| u.to_string())
            .map_err(|e| WireError::invalid_request(format!("invalid route path {path:?}: {e}")))
    }
}

fn required_signature(call: &PluginCall) -> Result<&str, WireError> {
    call.signature
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WireError::invalid_request(format!("{} requires a signature", call.method)))
}

fn encode_body<T: serde::Serialize>(body: &T) -> Result<String, WireError> {
    serde_json::to_string(body)
        .map_err(|e| WireError::invalid_request(format!("unencodable body: {e}")))
}

fn has_header(headers: &BTreeMap<String, String>, name: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(name))
}

/// Defaults first, call-specific headers on top (names compared
/// case-insensitively).
fn merge_headers(
    defaults: &BTreeMap<String, String>,
    specific: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = defaults
        .iter()
        .filter(|(name, _)| !has_header(&specific, name))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    merged.extend(specific);
    merged
}
