//! # Shared Channel - Cross-Context Message Channel
//!
//! In-process rendition of the host message channel that connects execution
//! contexts. It offers exactly two primitives:
//!
//! - `post(target, message, target_origin)`: fire-and-forget, no delivery
//!   confirmation, no correlation.
//! - `subscribe()`: a receive-all stream of every message addressed to the
//!   subscribing context, regardless of sender or message shape.
//!
//! ```text
//! ┌──────────────┐   post(target, data, origin)   ┌──────────────┐
//! │  Context A   │ ─────────┐                     │  Context B   │
//! │ origin: a.io │          ▼                     │ origin: b.io │
//! └──────────────┘   ┌──────────────┐             └──────────────┘
//!                    │ InMemoryChannel │ ─── subscribe() ──↑
//!                    └──────────────┘
//! ```
//!
//! Every delivered message is stamped with the sender's origin and context
//! id. Receivers must filter by shape and, where trust matters, by origin.
//! Messages whose target origin does not match the target context are
//! dropped silently, as the host primitive does.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod context;
pub mod message;
pub mod publisher;
pub mod subscriber;

pub use context::{ContextId, TargetOrigin};
pub use message::ChannelMessage;
pub use publisher::{ChannelError, ContextPort, InMemoryChannel, MessagePort};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum messages to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Origin string used for contexts with an opaque origin.
pub const OPAQUE_ORIGIN: &str = "null";
