//! Ports the responder depends on.

pub mod outbound;
