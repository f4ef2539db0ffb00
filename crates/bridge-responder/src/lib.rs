//! # Bridge Responder
//!
//! Runs in the isolated context that alone may reach the network. Listens on
//! the channel, filters by origin, executes each accepted request through an
//! [`HttpExecutor`], and answers every accepted correlation id exactly once.
//!
//! ## Architecture
//!
//! ```text
//! channel ──► origin policy ──► classify ──► reply ledger ──► dispatch
//!                (drop)          (ignore)      (dedupe)          │
//!                                                                ▼
//! channel ◄── response / error envelope ◄── shape reply ◄── HttpExecutor
//! ```
//!
//! ## Dispatch
//!
//! | Request | Path |
//! |---------|------|
//! | enhanced plugin call | route table → outbound call |
//! | legacy envelope | converted to plugin call, same path |
//! | enhanced http call | URL resolved against base, sent as-is |
//!
//! No retries happen here; retry is the requestor's policy.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::http::ReqwestExecutor;
pub use domain::config::{ConfigError, ResponderConfig};
pub use domain::errors::ResponderError;
pub use domain::ledger::{Admission, ReplyLedger, ReplyOutcome};
pub use domain::origin::OriginPolicy;
pub use domain::routing::RouteTable;
pub use ports::outbound::{ExecutorError, HttpExecutor, HttpResponse, OutboundCall};
pub use service::{Responder, ResponderStatus};
