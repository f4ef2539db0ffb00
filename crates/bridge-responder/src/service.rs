//! Responder service: channel listener, dispatch and reply.

use crate::domain::config::ResponderConfig;
use crate::domain::errors::ResponderError;
use crate::domain::ledger::{Admission, ReplyLedger, ReplyOutcome};
use crate::domain::origin::OriginPolicy;
use crate::domain::routing::{OutboundBuilder, RouteTable};
use crate::ports::outbound::{HttpExecutor, HttpResponse, OutboundCall};
use bridge_wire::{
    classify, CallResponse, ErrorMessage, HttpCall, Inbound, InboundRequest, PluginCall,
    ReadyMessage, Request, ResponseMessage, ResponseShape, WireError,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use shared_channel::{ChannelMessage, ContextId, MessagePort, TargetOrigin};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Point-in-time view of a responder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponderStatus {
    pub initialized: bool,
    pub server_id: String,
    pub base_url: String,
    pub request_count: u64,
    pub error_count: u64,
    pub in_flight: usize,
    pub started_at: DateTime<Utc>,
    pub last_request_at: Option<DateTime<Utc>>,
}

/// Target-side protocol endpoint.
///
/// Listening starts in [`Responder::start`] and stops on
/// [`Responder::shutdown`] or drop.
pub struct Responder {
    inner: Arc<ResponderInner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

struct ResponderInner {
    config: ResponderConfig,
    routes: RouteTable,
    builder: OutboundBuilder,
    origins: OriginPolicy,
    port: Arc<dyn MessagePort>,
    executor: Arc<dyn HttpExecutor>,
    ledger: Mutex<ReplyLedger>,
    running: AtomicBool,
    request_count: AtomicU64,
    error_count: AtomicU64,
    started_at: DateTime<Utc>,
    last_request_at: Mutex<Option<DateTime<Utc>>>,
}

impl Responder {
    /// Validate `config`, start listening on `port`, and announce readiness
    /// to the parent context if there is one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: ResponderConfig,
        port: Arc<dyn MessagePort>,
        executor: Arc<dyn HttpExecutor>,
    ) -> Result<Self, ResponderError> {
        config.validate()?;

        let base_url = config.parsed_base_url()?;
        let routes = RouteTable::with_overrides(&config.routes)?;
        let builder = OutboundBuilder::new(base_url, config.default_headers.clone(), config.timeout());
        let origins = OriginPolicy::new(&config.allowed_origins);
        let ledger = ReplyLedger::new(config.reply_retention());

        let inner = Arc::new(ResponderInner {
            config,
            routes,
            builder,
            origins,
            port,
            executor,
            ledger: Mutex::new(ledger),
            running: AtomicBool::new(true),
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            started_at: Utc::now(),
            last_request_at: Mutex::new(None),
        });

        // Subscribe before announcing so nothing sent after the notice is lost
        let mut subscription = inner.port.subscribe();

        if let Some(parent) = inner.port.parent() {
            let notice = ReadyMessage::new(inner.config.server_id.clone()).to_value()?;
            inner.port.post(&parent, notice, &TargetOrigin::Any)?;
            debug!(server_id = %inner.config.server_id, parent = %parent, "Ready notice sent");
        }

        let listener_inner = Arc::clone(&inner);
        let listener = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                if !listener_inner.running.load(Ordering::Acquire) {
                    break;
                }
                listener_inner.handle_message(message);
            }
        });

        info!(
            server_id = %inner.config.server_id,
            context = %inner.port.context_id(),
            base_url = %inner.builder.base(),
            whitelist = inner.config.allowed_origins.len(),
            "Responder listening"
        );

        Ok(Self {
            inner,
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Stop listening. In-flight requests still get their reply.
    pub fn shutdown(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        info!(server_id = %self.inner.config.server_id, "Responder shut down");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn server_id(&self) -> &str {
        &self.inner.config.server_id
    }

    pub fn status(&self) -> ResponderStatus {
        let inner = &self.inner;
        ResponderStatus {
            initialized: inner.running.load(Ordering::Acquire),
            server_id: inner.config.server_id.clone(),
            base_url: inner.builder.base().to_string(),
            request_count: inner.request_count.load(Ordering::Relaxed),
            error_count: inner.error_count.load(Ordering::Relaxed),
            in_flight: inner.ledger.lock().in_flight(),
            started_at: inner.started_at,
            last_request_at: *inner.last_request_at.lock(),
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ResponderInner {
    fn handle_message(self: &Arc<Self>, message: ChannelMessage) {
        if !self.origins.permits(&message.origin) {
            debug!(
                origin = %message.origin,
                source = %message.source,
                "Dropped message from untrusted origin"
            );
            return;
        }

        let Some(Inbound::Request(request)) = classify(&message.data) else {
            return;
        };

        let correlation_id = request.correlation_id.clone();
        let admission = self.ledger.lock().admit(&correlation_id, Instant::now());
        if admission != Admission::Accepted {
            debug!(
                correlation_id = %correlation_id,
                admission = ?admission,
                "Dropped duplicate request"
            );
            return;
        }

        self.request_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request_at.lock() = Some(Utc::now());

        if self.config.debug {
            debug!(
                correlation_id = %correlation_id,
                format = ?request.format(),
                origin = %message.origin,
                "Request accepted"
            );
        }

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            inner.answer(request, message.source, message.origin).await;
        });
    }

    /// Execute one accepted request and send its single reply.
    async fn answer(&self, request: InboundRequest, reply_to: ContextId, reply_origin: String) {
        let correlation_id = request.correlation_id.clone();
        let started = Instant::now();
        let result = self.process(request).await;

        let (reply, outcome) = match result {
            Ok(response) => match ResponseMessage::new(correlation_id.clone(), response).to_value() {
                Ok(value) => (Ok(value), ReplyOutcome::Response),
                Err(e) => (
                    ErrorMessage::new(correlation_id.clone(), e).to_value(),
                    ReplyOutcome::Error,
                ),
            },
            Err(error) => {
                warn!(
                    correlation_id = %correlation_id,
                    code = %error.code,
                    error = %error.message,
                    "Request failed"
                );
                (
                    ErrorMessage::new(correlation_id.clone(), error).to_value(),
                    ReplyOutcome::Error,
                )
            }
        };

        if outcome == ReplyOutcome::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }

        match reply {
            Ok(value) => {
                if self.config.debug {
                    debug!(
                        correlation_id = %correlation_id,
                        outcome = ?outcome,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        envelope = %value,
                        "Sending reply"
                    );
                }
                if let Err(e) = self
                    .port
                    .post(&reply_to, value, &TargetOrigin::Exact(reply_origin))
                {
                    warn!(correlation_id = %correlation_id, error = %e, "Failed to post reply");
                }
            }
            Err(e) => {
                error!(correlation_id = %correlation_id, error = %e, "Failed to encode reply");
            }
        }

        self.ledger
            .lock()
            .complete(&correlation_id, outcome, Instant::now());
    }

    async fn process(&self, request: InboundRequest) -> Result<CallResponse, WireError> {
        match request.into_request()? {
            Request::Plugin(call) => self.execute_plugin(call).await,
            Request::Http(call) => self.execute_http(call).await,
        }
    }

    async fn execute_plugin(&self, call: PluginCall) -> Result<CallResponse, WireError> {
        let method = call.validate()?;
        let route = self
            .routes
            .route(method)
            .ok_or_else(|| WireError::invalid_request(format!("no route for {method}")))?;
        let outbound = self.builder.plugin(route, &call)?;
        let response = self.send(outbound).await?;

        match route.response {
            ResponseShape::RawBody => Ok(wrap_raw(&response)),
            ResponseShape::Envelope => parse_envelope(&response),
        }
    }

    async fn execute_http(&self, call: HttpCall) -> Result<CallResponse, WireError> {
        call.validate()?;
        let outbound = self.builder.http(&call)?;
        let response = self.send(outbound).await?;
        Ok(wrap_raw(&response))
    }

    async fn send(&self, call: OutboundCall) -> Result<HttpResponse, WireError> {
        let deadline = call.timeout;
        let method = call.method;
        let url = call.url.clone();

        match tokio::time::timeout(deadline, self.executor.execute(call)).await {
            Err(_) => Err(WireError::timeout(format!(
                "{method} {url} timed out after {}ms",
                deadline.as_millis()
            ))),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(response)) if !response.is_success() => Err(WireError::network(format!(
                "{method} {url} returned HTTP {}",
                response.status
            ))),
            Ok(Ok(response)) => Ok(response),
        }
    }
}

/// Wrap a body that does not speak the envelope: parsed JSON when it is
/// JSON, text otherwise.
fn wrap_raw(response: &HttpResponse) -> CallResponse {
    let result = response
        .json()
        .unwrap_or_else(|_| serde_json::Value::String(response.text()));
    CallResponse::ok(result)
}

fn parse_envelope(response: &HttpResponse) -> Result<CallResponse, WireError> {
    let body = response
        .json()
        .map_err(|e| WireError::invalid_response(format!("body is not JSON: {e}")))?;
    if !body.is_object() {
        return Err(WireError::invalid_response("expected a JSON object"));
    }
    CallResponse::from_object(&body)
        .ok_or_else(|| WireError::invalid_response("missing boolean success field"))
}
