//! # Bridge Wire Protocol
//!
//! Pure data and validation shared by the Requestor and the Responder.
//!
//! ## Message kinds
//!
//! | Kind | Shape |
//! |------|-------|
//! | request (enhanced) | `{kind, correlationId, timestamp?, request: Request}` |
//! | request (legacy) | `{kind, correlationId, timestamp?, endpoint, payload}` |
//! | response | `{kind, correlationId, timestamp?, response: {success, result?, error?}}` |
//! | error | `{kind, correlationId, timestamp?, error: {code, message}}` |
//! | ready | `{kind, serverId, timestamp?}` |
//!
//! ## Request variants
//!
//! ```text
//! Request ─┬─ Plugin(PluginCall)  method + callerId + scopeId (+ params, signature)
//!          └─ Http(HttpCall)      url + method + headers (+ body, timeout)
//! ```
//!
//! The legacy envelope is not a third variant: it converts losslessly into
//! `Request::Plugin` at the boundary (see [`legacy`]).
//!
//! The channel is shared with unrelated traffic, so the structural
//! predicates in [`envelope`] treat anything missing a required field as
//! foreign, never as an error.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod correlation;
pub mod envelope;
pub mod error;
pub mod legacy;
pub mod methods;
pub mod request;

pub use correlation::CorrelationId;
pub use envelope::{
    classify, detect_request_format, is_error_envelope, is_ready_notice, is_request_envelope,
    is_response_envelope, CallResponse, ErrorMessage, Inbound, InboundBody, InboundRequest,
    LegacyRequestMessage, MessageKind, ReadyMessage, RequestFormat, RequestMessage,
    ResponseMessage,
};
pub use error::{ErrorKind, WireError};
pub use legacy::{convert_legacy_to_structured, LegacyPayload, LegacyRequest};
pub use methods::{
    endpoint_for, get_method_info, is_method_supported, method_for_endpoint, route_for,
    AuthStyle, HttpVerb, MethodInfo, PluginMethod, ResponseShape, RouteSpec,
};
pub use request::{HttpCall, PluginCall, Request};

/// Milliseconds since the Unix epoch, used for envelope timestamps.
pub fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
