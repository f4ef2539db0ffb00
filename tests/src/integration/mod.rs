//! # Integration Flows
//!
//! A real requestor and responder talking over the in-memory channel, with a
//! scripted network behind the responder. Timing-sensitive tests run on
//! paused tokio time.

pub mod interleaving;
pub mod origins;
pub mod retries;
pub mod round_trip;
