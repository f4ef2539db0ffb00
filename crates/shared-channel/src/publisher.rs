//! # Channel Publisher
//!
//! Defines the posting side of the channel and the in-memory hub that
//! connects contexts.

use crate::context::{ContextId, TargetOrigin};
use crate::message::ChannelMessage;
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Errors from channel operations.
///
/// Delivery problems (unknown target, origin mismatch) are not errors: the
/// channel is fire-and-forget and drops such messages silently.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The posting context has been detached from the channel.
    #[error("context {0} is detached from the channel")]
    Detached(ContextId),

    /// A context with this id is already attached.
    #[error("context {0} is already attached")]
    DuplicateContext(ContextId),

    /// The parent context of a nested attach is unknown.
    #[error("parent context {0} is not attached")]
    UnknownParent(ContextId),
}

/// Interface a context uses to talk over the channel.
///
/// Mirrors the host primitive: a fire-and-forget `post` and a receive-all
/// `subscribe`. Implementations stamp origin and source on delivery.
pub trait MessagePort: Send + Sync {
    /// Identity of the context owning this port.
    fn context_id(&self) -> &ContextId;

    /// Origin of the context owning this port.
    fn origin(&self) -> &str;

    /// Parent context, if this context is nested inside another.
    fn parent(&self) -> Option<ContextId>;

    /// Post `data` to `target`.
    ///
    /// Returns `Ok(())` even when the message is dropped because the target
    /// is unknown or its origin does not satisfy `target_origin`.
    fn post(
        &self,
        target: &ContextId,
        data: serde_json::Value,
        target_origin: &TargetOrigin,
    ) -> Result<(), ChannelError>;

    /// Subscribe to every message addressed to this context.
    fn subscribe(&self) -> Subscription;
}

#[derive(Debug, Clone)]
struct ContextInfo {
    origin: String,
    parent: Option<ContextId>,
}

/// In-memory implementation of the channel.
///
/// Uses `tokio::sync::broadcast` for multi-producer, multi-consumer fan-out;
/// each subscription filters down to its own context.
pub struct InMemoryChannel {
    /// Broadcast sender for delivered messages.
    sender: broadcast::Sender<ChannelMessage>,

    /// Attached contexts.
    contexts: RwLock<HashMap<ContextId, ContextInfo>>,

    /// Active subscription count by context.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total messages accepted for delivery.
    messages_posted: AtomicU64,

    /// Total messages dropped (unknown target or origin mismatch).
    messages_dropped: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryChannel {
    /// Create a new channel with default capacity.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new channel with the given per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity);
        Arc::new(Self {
            sender,
            contexts: RwLock::new(HashMap::new()),
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            messages_posted: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            capacity,
        })
    }

    /// Attach a top-level context.
    pub fn attach(
        self: &Arc<Self>,
        id: impl Into<ContextId>,
        origin: impl Into<String>,
    ) -> Result<ContextPort, ChannelError> {
        self.register(id.into(), origin.into(), None)
    }

    /// Attach a context nested inside `parent`.
    pub fn attach_nested(
        self: &Arc<Self>,
        id: impl Into<ContextId>,
        origin: impl Into<String>,
        parent: &ContextId,
    ) -> Result<ContextPort, ChannelError> {
        let known = self
            .contexts
            .read()
            .map(|contexts| contexts.contains_key(parent))
            .unwrap_or(false);
        if !known {
            return Err(ChannelError::UnknownParent(parent.clone()));
        }
        self.register(id.into(), origin.into(), Some(parent.clone()))
    }

    fn register(
        self: &Arc<Self>,
        id: ContextId,
        origin: String,
        parent: Option<ContextId>,
    ) -> Result<ContextPort, ChannelError> {
        if let Ok(mut contexts) = self.contexts.write() {
            if contexts.contains_key(&id) {
                return Err(ChannelError::DuplicateContext(id));
            }
            contexts.insert(
                id.clone(),
                ContextInfo {
                    origin: origin.clone(),
                    parent: parent.clone(),
                },
            );
        }

        debug!(context = %id, origin = %origin, parent = ?parent, "Context attached");

        Ok(ContextPort {
            id,
            origin,
            parent,
            channel: Arc::clone(self),
        })
    }

    /// Detach a context. Messages addressed to it are dropped afterwards.
    pub fn detach(&self, id: &ContextId) -> bool {
        let removed = self
            .contexts
            .write()
            .map(|mut contexts| contexts.remove(id).is_some())
            .unwrap_or(false);
        if removed {
            debug!(context = %id, "Context detached");
        }
        removed
    }

    /// Whether a context is currently attached.
    #[must_use]
    pub fn is_attached(&self, id: &ContextId) -> bool {
        self.contexts
            .read()
            .map(|contexts| contexts.contains_key(id))
            .unwrap_or(false)
    }

    /// Observe all traffic on the channel, whatever the target.
    #[must_use]
    pub fn tap(&self) -> Subscription {
        self.subscribe_filtered(None)
    }

    pub(crate) fn subscribe_filtered(&self, context: Option<ContextId>) -> Subscription {
        let receiver = self.sender.subscribe();
        let key = context
            .as_ref()
            .map_or_else(|| "*".to_string(), |id| id.to_string());

        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(key.clone()).or_insert(0) += 1;
        }

        debug!(context = %key, "New subscription created");

        Subscription::new(receiver, context, self.subscriptions.clone(), key)
    }

    /// Deliver a message from `source` to `target`.
    ///
    /// Returns whether the message was handed to the broadcast hub.
    pub(crate) fn deliver(
        &self,
        source: &ContextId,
        target: &ContextId,
        data: serde_json::Value,
        target_origin: &TargetOrigin,
    ) -> Result<bool, ChannelError> {
        let (source_origin, target_info) = {
            let contexts = match self.contexts.read() {
                Ok(contexts) => contexts,
                Err(_) => return Err(ChannelError::Detached(source.clone())),
            };
            let Some(source_info) = contexts.get(source) else {
                return Err(ChannelError::Detached(source.clone()));
            };
            (source_info.origin.clone(), contexts.get(target).cloned())
        };

        let Some(target_info) = target_info else {
            self.messages_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(source = %source, recipient = %target, "Message dropped (unknown target)");
            return Ok(false);
        };

        if !target_origin.permits(&target_info.origin) {
            self.messages_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(
                source = %source,
                recipient = %target,
                target_origin = %target_origin,
                actual_origin = %target_info.origin,
                "Message dropped (target origin mismatch)"
            );
            return Ok(false);
        }

        self.messages_posted.fetch_add(1, Ordering::Relaxed);

        let message = ChannelMessage {
            data,
            origin: source_origin,
            source: source.clone(),
            target: target.clone(),
        };

        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(source = %source, recipient = %target, receivers, "Message posted");
                Ok(true)
            }
            Err(_) => {
                warn!(source = %source, recipient = %target, "Message dropped (no receivers)");
                Ok(false)
            }
        }
    }

    /// Number of live subscriptions across all contexts.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of live subscriptions filtered to `context`.
    #[must_use]
    pub fn subscription_count(&self, context: &ContextId) -> usize {
        self.subscriptions
            .read()
            .ok()
            .and_then(|subs| subs.get(&context.to_string()).copied())
            .unwrap_or(0)
    }

    /// Total messages handed to the hub.
    #[must_use]
    pub fn messages_posted(&self) -> u64 {
        self.messages_posted.load(Ordering::Relaxed)
    }

    /// Total messages dropped before reaching the hub.
    #[must_use]
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    /// Per-subscriber buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A context's handle on the channel.
#[derive(Clone)]
pub struct ContextPort {
    id: ContextId,
    origin: String,
    parent: Option<ContextId>,
    channel: Arc<InMemoryChannel>,
}

impl ContextPort {
    /// The channel this port is attached to.
    #[must_use]
    pub fn channel(&self) -> &Arc<InMemoryChannel> {
        &self.channel
    }
}

impl std::fmt::Debug for ContextPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPort")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("parent", &self.parent)
            .finish()
    }
}

impl MessagePort for ContextPort {
    fn context_id(&self) -> &ContextId {
        &self.id
    }

    fn origin(&self) -> &str {
        &self.origin
    }

    fn parent(&self) -> Option<ContextId> {
        self.parent.clone()
    }

    fn post(
        &self,
        target: &ContextId,
        data: serde_json::Value,
        target_origin: &TargetOrigin,
    ) -> Result<(), ChannelError> {
        self.channel
            .deliver(&self.id, target, data, target_origin)
            .map(|_| ())
    }

    fn subscribe(&self) -> Subscription {
        self.channel.subscribe_filtered(Some(self.id.clone()))
    }
}
