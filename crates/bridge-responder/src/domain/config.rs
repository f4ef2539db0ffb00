//! Responder configuration with validation.

use bridge_wire::{PluginMethod, RouteSpec};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Lowest accepted network timeout.
pub const MIN_TIMEOUT_MS: u64 = 1_000;

/// Responder configuration.
///
/// ```json
/// {
///   "baseUrl": "https://api.example",
///   "timeoutMs": 30000,
///   "allowedOrigins": ["https://app.example", "https://*.example"],
///   "routes": {"getBootstrap": {"path": "/v2/bootstrap", "verb": "GET",
///              "auth": {"style": "bearerSignature"}, "response": "rawBody"}}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderConfig {
    /// Absolute http(s) base address for every outbound call.
    pub base_url: String,
    /// Default network timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Log every wire message and transition.
    #[serde(default)]
    pub debug: bool,
    /// Headers applied under call-specific headers.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Origin whitelist. Empty allows every origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Identity reported in ready notices and status.
    #[serde(default = "default_server_id")]
    pub server_id: String,
    /// Route overrides keyed by method name.
    #[serde(default)]
    pub routes: BTreeMap<String, RouteSpec>,
    /// How long answered correlation ids are remembered.
    #[serde(default = "default_reply_retention_ms")]
    pub reply_retention_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_server_id() -> String {
    "bridge-responder".to_string()
}

fn default_reply_retention_ms() -> u64 {
    60_000
}

impl ResponderConfig {
    /// Configuration with defaults for everything but the base address.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: default_timeout_ms(),
            debug: false,
            default_headers: BTreeMap::new(),
            allowed_origins: Vec::new(),
            server_id: default_server_id(),
            routes: BTreeMap::new(),
            reply_retention_ms: default_reply_retention_ms(),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = server_id.into();
        self
    }

    pub fn with_route(mut self, method: PluginMethod, route: RouteSpec) -> Self {
        self.routes.insert(method.as_str().to_string(), route);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_base_url()?;

        if self.timeout_ms < MIN_TIMEOUT_MS {
            return Err(ConfigError::InvalidTimeout(format!(
                "timeoutMs must be at least {MIN_TIMEOUT_MS}, got {}",
                self.timeout_ms
            )));
        }

        if self.server_id.trim().is_empty() {
            return Err(ConfigError::Invalid("serverId cannot be empty".into()));
        }

        if let Some(pattern) = self.allowed_origins.iter().find(|o| o.trim().is_empty()) {
            return Err(ConfigError::InvalidOrigin(pattern.clone()));
        }

        for (method, route) in &self.routes {
            if PluginMethod::parse(method).is_none() {
                return Err(ConfigError::UnknownRouteMethod(method.clone()));
            }
            if !route.path.starts_with('/') {
                return Err(ConfigError::InvalidRoute(format!(
                    "{method}: path must start with '/', got {:?}",
                    route.path
                )));
            }
        }

        Ok(())
    }

    /// Base address as a parsed URL.
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidBaseUrl(format!(
                "{}: unsupported scheme {other}",
                self.base_url
            ))),
        }
    }

    /// Default network timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reply_retention(&self) -> Duration {
        Duration::from_millis(self.reply_retention_ms)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Base address missing, relative, or not http(s)
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// Timeout below the minimum
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Empty whitelist entry
    #[error("invalid origin pattern: {0:?}")]
    InvalidOrigin(String),
    /// Route override for a method outside the known set
    #[error("route override for unknown method: {0}")]
    UnknownRouteMethod(String),
    /// Malformed route override
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
