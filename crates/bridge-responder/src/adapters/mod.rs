//! Adapters implementing the responder's ports.

pub mod http;
