//! # Bridge Requestor
//!
//! Runs in the calling context. Turns the fire-and-forget channel into
//! timeout-bounded, retryable request/response calls, any number of them in
//! flight at once over one channel target.
//!
//! ## Correlation state machine
//!
//! ```text
//!            response
//!   armed ─────────────► resolved
//!     │ ▲
//!     │ │ resend after retry delay
//!     │ └──────── retrying
//!     │  timeout / error envelope,
//!     │  retries left ──────┘
//!     │
//!     └─ timeout / error, no retries left,
//!        or target cleared ─► failed
//! ```
//!
//! A correlation id keeps its identity across retries. Whichever of a reply
//! or a timer is processed first wins; the loser finds no record and does
//! nothing.
//!
//! Validation failures and a missing target fail synchronously and never
//! enter the machine.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod service;

pub use domain::config::{ChannelTarget, ConfigError, RequestorConfig, WireFormat};
pub use domain::errors::RequestorError;
pub use domain::latency::LatencyWindow;
pub use domain::pending::{CallState, PendingCall, PendingTable, TimeoutHandle, TimerKind};
pub use service::{PendingReply, Requestor, RequestorStatus};
