//! Responder lifecycle errors.
//!
//! Per-request failures never surface here: they become error envelopes
//! addressed to the sender.

use crate::domain::config::ConfigError;
use shared_channel::ChannelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("failed to encode ready notice: {0}")]
    Encode(#[from] bridge_wire::WireError),
}
