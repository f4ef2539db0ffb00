//! Caller-facing errors.

use crate::domain::config::ConfigError;
use bridge_wire::{CorrelationId, ErrorKind, WireError};
use shared_channel::ChannelError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RequestorError {
    /// Failed local validation; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No channel target registered.
    #[error("no channel target set")]
    NoTarget,

    /// The requestor was torn down.
    #[error("requestor destroyed")]
    Destroyed,

    /// Every attempt went unanswered.
    #[error("request {correlation_id} timed out after {attempts} attempt(s)")]
    Timeout {
        correlation_id: CorrelationId,
        attempts: u32,
    },

    /// No ready notice within the wait.
    #[error("no ready notice within {0:?}")]
    ReadyTimeout(Duration),

    /// The responder answered with an error envelope.
    #[error("remote error {0}")]
    Remote(WireError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("failed to encode request: {0}")]
    Encode(WireError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RequestorError {
    /// Wire error kind for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestorError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            RequestorError::NoTarget => ErrorKind::NoTarget,
            RequestorError::Destroyed => ErrorKind::NotInitialized,
            RequestorError::Timeout { .. } | RequestorError::ReadyTimeout(_) => ErrorKind::Timeout,
            RequestorError::Remote(error) => error.code,
            RequestorError::Channel(_) => ErrorKind::NotInitialized,
            RequestorError::Encode(_) => ErrorKind::InvalidRequest,
            RequestorError::Config(_) => ErrorKind::Unknown,
        }
    }
}
