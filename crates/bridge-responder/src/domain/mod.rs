//! Domain layer for the responder.

pub mod config;
pub mod errors;
pub mod ledger;
pub mod origin;
pub mod routing;
