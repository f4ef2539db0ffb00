//! Message envelopes, structural predicates and inbound classification.
//!
//! Constructors are typed; inbound decoding starts from a raw
//! `serde_json::Value` because the channel carries foreign traffic too.

use crate::correlation::CorrelationId;
use crate::error::WireError;
use crate::legacy::{convert_legacy_to_structured, LegacyPayload, LegacyRequest};
use crate::request::Request;
use crate::unix_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope discriminant (`kind` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
    Error,
    Ready,
}

impl MessageKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
            MessageKind::Error => "error",
            MessageKind::Ready => "ready",
        }
    }
}

/// Request envelope flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    /// Carries a tagged `request`.
    Enhanced,
    /// Carries `endpoint` + `payload`.
    Legacy,
}

/// The response body every call resolves with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Read an envelope-shaped JSON object. `None` unless `success` is a bool.
    pub fn from_object(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let success = obj.get("success")?.as_bool()?;
        let result = obj.get("result").filter(|v| !v.is_null()).cloned();
        let error = obj.get("error").filter(|v| !v.is_null()).map(|e| match e {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        Some(Self {
            success,
            result,
            error,
        })
    }
}

fn encode<T: Serialize>(message: &T) -> Result<Value, WireError> {
    serde_json::to_value(message).map_err(|e| WireError::unknown(format!("encode failed: {e}")))
}

/// Enhanced request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub kind: MessageKind,
    pub correlation_id: CorrelationId,
    pub timestamp: u64,
    pub request: Request,
}

impl RequestMessage {
    pub fn new(correlation_id: CorrelationId, request: Request) -> Self {
        Self {
            kind: MessageKind::Request,
            correlation_id,
            timestamp: unix_millis(),
            request,
        }
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        encode(self)
    }
}

/// Legacy request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRequestMessage {
    pub kind: MessageKind,
    pub correlation_id: CorrelationId,
    pub timestamp: u64,
    pub endpoint: String,
    pub payload: LegacyPayload,
}

impl LegacyRequestMessage {
    pub fn new(correlation_id: CorrelationId, legacy: LegacyRequest) -> Self {
        Self {
            kind: MessageKind::Request,
            correlation_id,
            timestamp: unix_millis(),
            endpoint: legacy.endpoint,
            payload: legacy.payload,
        }
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        encode(self)
    }
}

/// Success (or envelope-level failure) reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub kind: MessageKind,
    pub correlation_id: CorrelationId,
    pub timestamp: u64,
    pub response: CallResponse,
}

impl ResponseMessage {
    pub fn new(correlation_id: CorrelationId, response: CallResponse) -> Self {
        Self {
            kind: MessageKind::Response,
            correlation_id,
            timestamp: unix_millis(),
            response,
        }
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        encode(self)
    }
}

/// Terminal error reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub kind: MessageKind,
    pub correlation_id: CorrelationId,
    pub timestamp: u64,
    pub error: WireError,
}

impl ErrorMessage {
    pub fn new(correlation_id: CorrelationId, error: WireError) -> Self {
        Self {
            kind: MessageKind::Error,
            correlation_id,
            timestamp: unix_millis(),
            error,
        }
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        encode(self)
    }
}

/// Readiness notice a nested responder sends its parent once listening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyMessage {
    pub kind: MessageKind,
    pub server_id: String,
    pub timestamp: u64,
}

impl ReadyMessage {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Ready,
            server_id: server_id.into(),
            timestamp: unix_millis(),
        }
    }

    pub fn to_value(&self) -> Result<Value, WireError> {
        encode(self)
    }
}

// ---------------------------------------------------------------------------
// Structural predicates
// ---------------------------------------------------------------------------

fn has_kind(msg: &Value, kind: MessageKind) -> bool {
    msg.get("kind").and_then(Value::as_str) == Some(kind.as_str())
}

fn correlation_id_of(msg: &Value) -> Option<&str> {
    msg.get("correlationId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Which request flavour `msg` carries, if any. `request` wins over
/// `endpoint`/`payload`.
pub fn detect_request_format(msg: &Value) -> Option<RequestFormat> {
    if msg.get("request").is_some() {
        return Some(RequestFormat::Enhanced);
    }
    let endpoint = msg.get("endpoint").is_some_and(Value::is_string);
    let payload = msg.get("payload").is_some_and(Value::is_object);
    (endpoint && payload).then_some(RequestFormat::Legacy)
}

pub fn is_request_envelope(msg: &Value) -> bool {
    has_kind(msg, MessageKind::Request)
        && correlation_id_of(msg).is_some()
        && detect_request_format(msg).is_some()
}

pub fn is_response_envelope(msg: &Value) -> bool {
    has_kind(msg, MessageKind::Response)
        && correlation_id_of(msg).is_some()
        && msg
            .get("response")
            .and_then(|r| r.get("success"))
            .is_some_and(Value::is_boolean)
}

pub fn is_error_envelope(msg: &Value) -> bool {
    has_kind(msg, MessageKind::Error)
        && correlation_id_of(msg).is_some()
        && msg.get("error").is_some_and(|e| !e.is_null())
}

pub fn is_ready_notice(msg: &Value) -> bool {
    has_kind(msg, MessageKind::Ready) && msg.get("serverId").is_some_and(Value::is_string)
}

// ---------------------------------------------------------------------------
// Inbound classification
// ---------------------------------------------------------------------------

/// Request body before variant decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundBody {
    Enhanced(Value),
    Legacy { endpoint: String, payload: Value },
}

/// A structurally recognized request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRequest {
    pub correlation_id: CorrelationId,
    pub timestamp: Option<u64>,
    pub body: InboundBody,
}

impl InboundRequest {
    pub fn format(&self) -> RequestFormat {
        match self.body {
            InboundBody::Enhanced(_) => RequestFormat::Enhanced,
            InboundBody::Legacy { .. } => RequestFormat::Legacy,
        }
    }

    /// Decode the body into a [`Request`]. Legacy bodies become
    /// [`Request::Plugin`].
    pub fn into_request(self) -> Result<Request, WireError> {
        match self.body {
            InboundBody::Enhanced(value) => serde_json::from_value::<Request>(value)
                .map_err(|e| WireError::invalid_request(format!("malformed request: {e}"))),
            InboundBody::Legacy { endpoint, payload } => {
                let payload = serde_json::from_value::<LegacyPayload>(payload)
                    .map_err(|e| WireError::invalid_request(format!("malformed payload: {e}")))?;
                let legacy = LegacyRequest { endpoint, payload };
                Ok(Request::Plugin(convert_legacy_to_structured(&legacy)))
            }
        }
    }
}

/// A recognized protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Request(InboundRequest),
    Response {
        correlation_id: CorrelationId,
        response: CallResponse,
    },
    Error {
        correlation_id: CorrelationId,
        error: WireError,
    },
    Ready {
        server_id: String,
    },
}

/// Classify a raw channel message. `None` means foreign traffic.
pub fn classify(msg: &Value) -> Option<Inbound> {
    let timestamp = msg.get("timestamp").and_then(Value::as_u64);

    if is_request_envelope(msg) {
        let correlation_id = CorrelationId::from_wire(correlation_id_of(msg)?);
        let body = match detect_request_format(msg)? {
            RequestFormat::Enhanced => InboundBody::Enhanced(msg.get("request")?.clone()),
            RequestFormat::Legacy => InboundBody::Legacy {
                endpoint: msg.get("endpoint")?.as_str()?.to_string(),
                payload: msg.get("payload")?.clone(),
            },
        };
        return Some(Inbound::Request(InboundRequest {
            correlation_id,
            timestamp,
            body,
        }));
    }

    if is_response_envelope(msg) {
        return Some(Inbound::Response {
            correlation_id: CorrelationId::from_wire(correlation_id_of(msg)?),
            response: CallResponse::from_object(msg.get("response")?)?,
        });
    }

    if is_error_envelope(msg) {
        return Some(Inbound::Error {
            correlation_id: CorrelationId::from_wire(correlation_id_of(msg)?),
            error: WireError::from_wire_value(msg.get("error")?),
        });
    }

    if is_ready_notice(msg) {
        return Some(Inbound::Ready {
            server_id: msg.get("serverId")?.as_str()?.to_string(),
        });
    }

    None
}
