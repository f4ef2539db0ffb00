//! Requestor configuration.

use serde::{Deserialize, Serialize};
use shared_channel::{ContextId, TargetOrigin};
use std::time::Duration;

/// Envelope flavour used for structured calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `{request: {type: "plugin", ...}}`
    #[default]
    Enhanced,
    /// `{endpoint, payload}` for responders that predate the tagged request.
    Legacy,
}

/// Requestor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestorConfig {
    /// Per-attempt reply deadline.
    pub timeout_ms: u64,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait between a failed attempt and its resend.
    pub retry_delay_ms: u64,
    /// Log every wire message and transition.
    pub debug: bool,
    /// Correlation id prefix.
    pub id_prefix: String,
    pub wire_format: WireFormat,
}

impl Default for RequestorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            debug: false,
            id_prefix: "req".to_string(),
            wire_format: WireFormat::Enhanced,
        }
    }
}

impl RequestorConfig {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_id_prefix(mut self, id_prefix: impl Into<String>) -> Self {
        self.id_prefix = id_prefix.into();
        self
    }

    pub fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("timeoutMs cannot be 0".into()));
        }
        if !self
            .id_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::InvalidIdPrefix(self.id_prefix.clone()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid id prefix: {0:?}")]
    InvalidIdPrefix(String),
}

/// Where calls are sent: a context and the origin it must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub context: ContextId,
    pub origin: TargetOrigin,
}

impl ChannelTarget {
    pub fn new(context: impl Into<ContextId>, origin: TargetOrigin) -> Self {
        Self {
            context: context.into(),
            origin,
        }
    }

    /// Target without an origin restriction.
    pub fn any_origin(context: impl Into<ContextId>) -> Self {
        Self::new(context, TargetOrigin::Any)
    }
}
