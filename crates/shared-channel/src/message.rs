//! # Channel Message
//!
//! What a subscriber observes for every delivered post.

use crate::context::ContextId;

/// A message as delivered to a receiving context.
///
/// `origin` and `source` are stamped by the channel, never by the sender,
/// so receivers can base trust decisions on them.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    /// The posted payload, untouched.
    pub data: serde_json::Value,
    /// Origin of the sending context.
    pub origin: String,
    /// Sending context; reply target for request/response use.
    pub source: ContextId,
    /// Receiving context.
    pub target: ContextId,
}

impl ChannelMessage {
    /// Whether this message is addressed to `context`.
    #[must_use]
    pub fn is_for(&self, context: &ContextId) -> bool {
        &self.target == context
    }
}
