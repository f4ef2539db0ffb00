//! # Channel Subscriber
//!
//! Defines the receiving side of the channel.

use crate::context::ContextId;
use crate::message::ChannelMessage;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The channel was closed.
    #[error("Channel closed")]
    Closed,
}

/// A subscription handle for receiving messages.
///
/// A context subscription yields every message addressed to its context; a
/// tap (no context) yields all traffic. When dropped, the subscription is
/// automatically cleaned up.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<ChannelMessage>,

    /// Context filter; `None` receives everything.
    context: Option<ContextId>,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Tracking key for this subscription.
    key: String,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<ChannelMessage>,
        context: Option<ContextId>,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        key: String,
    ) -> Self {
        Self {
            receiver,
            context,
            subscriptions,
            key,
        }
    }

    fn matches(&self, message: &ChannelMessage) -> bool {
        self.context
            .as_ref()
            .map_or(true, |context| message.is_for(context))
    }

    /// Receive the next message for this subscription.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next matching message
    /// - `None` - The channel was closed (hub dropped)
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Subscriber lagged, some messages dropped");
                    continue;
                }
            };

            if self.matches(&message) {
                return Some(message);
            }
        }
    }

    /// Try to receive the next message without blocking.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(message))` - A message was available and matched
    /// - `Ok(None)` - No message available (would block)
    /// - `Err(SubscriptionError::Closed)` - The channel was closed
    pub fn try_recv(&mut self) -> Result<Option<ChannelMessage>, SubscriptionError> {
        loop {
            let message = match self.receiver.try_recv() {
                Ok(m) => m,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.matches(&message) {
                return Ok(Some(message));
            }
        }
    }

    /// Drain every message currently buffered for this subscription.
    pub fn drain(&mut self) -> Vec<ChannelMessage> {
        let mut drained = Vec::new();
        while let Ok(Some(message)) = self.try_recv() {
            drained.push(message);
        }
        drained
    }

    /// The context this subscription listens for, if any.
    #[must_use]
    pub fn context(&self) -> Option<&ContextId> {
        self.context.as_ref()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.key) else {
            debug!(context = %self.key, "Subscription dropped");
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.key);
        }
        debug!(context = %self.key, "Subscription dropped");
    }
}
