//! Domain layer for the requestor.

pub mod config;
pub mod errors;
pub mod latency;
pub mod pending;
