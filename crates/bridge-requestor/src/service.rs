//! Requestor service: call API, channel listener, timers and retries.

use crate::domain::config::{ChannelTarget, RequestorConfig, WireFormat};
use crate::domain::errors::RequestorError;
use crate::domain::latency::LatencyWindow;
use crate::domain::pending::{
    CallResult, CallState, PendingCall, PendingTable, TimeoutHandle, TimerKind,
};
use bridge_wire::{
    classify, CallResponse, CorrelationId, HttpCall, Inbound, LegacyRequest,
    LegacyRequestMessage, PluginCall, Request, RequestMessage, WireError,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use shared_channel::{ChannelMessage, MessagePort};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Point-in-time view of a requestor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestorStatus {
    pub initialized: bool,
    pub has_target: bool,
    pub pending_count: usize,
    pub total_request_count: u64,
    pub error_count: u64,
    /// Rounded mean over the most recent resolved calls.
    pub average_latency_ms: u64,
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Server id from the first ready notice, if one arrived.
    pub server_id: Option<String>,
}

/// The eventual result of one submitted call.
#[derive(Debug)]
pub struct PendingReply {
    correlation_id: CorrelationId,
    rx: oneshot::Receiver<CallResult>,
}

impl PendingReply {
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }
}

impl Future for PendingReply {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(RequestorError::Destroyed)))
    }
}

/// Caller-side protocol endpoint.
///
/// Dropping the requestor tears it down.
pub struct Requestor {
    inner: Arc<RequestorInner>,
}

struct RequestorInner {
    config: RequestorConfig,
    port: Arc<dyn MessagePort>,
    target: RwLock<Option<ChannelTarget>>,
    pending: PendingTable,
    latency: Mutex<LatencyWindow>,
    total_calls: AtomicU64,
    error_count: AtomicU64,
    last_activity: Mutex<Option<DateTime<Utc>>>,
    destroyed: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
    ready: watch::Sender<Option<String>>,
    timer_seq: AtomicU64,
}

/// Outcome of feeding a failure into the state machine.
enum Transition {
    Retry(u32),
    Fail,
    Ignore,
}

impl Requestor {
    /// Create a requestor listening on `port`. Must be called from within a
    /// tokio runtime.
    pub fn new(config: RequestorConfig, port: Arc<dyn MessagePort>) -> Result<Self, RequestorError> {
        config.validate()?;

        let (ready, _) = watch::channel(None);
        let inner = Arc::new(RequestorInner {
            config,
            port,
            target: RwLock::new(None),
            pending: PendingTable::new(),
            latency: Mutex::new(LatencyWindow::default()),
            total_calls: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            last_activity: Mutex::new(None),
            destroyed: AtomicBool::new(false),
            listener: Mutex::new(None),
            ready,
            timer_seq: AtomicU64::new(0),
        });

        let mut subscription = inner.port.subscribe();
        let listener_inner = Arc::clone(&inner);
        let listener = tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                listener_inner.on_message(message);
            }
        });
        *inner.listener.lock() = Some(listener);

        info!(
            context = %inner.port.context_id(),
            timeout_ms = inner.config.timeout_ms,
            max_retries = inner.config.max_retries,
            wire_format = ?inner.config.wire_format,
            "Requestor initialized"
        );

        Ok(Self { inner })
    }

    /// Create a requestor with default configuration.
    pub fn with_defaults(port: Arc<dyn MessagePort>) -> Result<Self, RequestorError> {
        Self::new(RequestorConfig::default(), port)
    }

    /// Register where calls go. In-flight calls use whichever target is
    /// current when they are (re)sent.
    pub fn set_target(&self, target: ChannelTarget) {
        if self.inner.config.debug {
            debug!(recipient = %target.context, origin = %target.origin, "Target set");
        }
        *self.inner.target.write() = Some(target);
    }

    /// Forget the target. Pending retries fail instead of resending.
    pub fn clear_target(&self) {
        *self.inner.target.write() = None;
    }

    pub fn target(&self) -> Option<ChannelTarget> {
        self.inner.target.read().clone()
    }

    /// Send a request; the returned future resolves with its single result.
    ///
    /// Validation and target checks happen here, before anything is sent.
    pub fn submit(&self, request: impl Into<Request>) -> Result<PendingReply, RequestorError> {
        self.inner.submit(request.into())
    }

    /// Structured call.
    pub async fn call(&self, call: PluginCall) -> CallResult {
        self.submit(call)?.await
    }

    /// Raw HTTP passthrough call.
    pub async fn call_http(&self, call: HttpCall) -> CallResult {
        self.submit(call)?.await
    }

    /// Wait for the responder's ready notice. Resolves immediately if one
    /// was already seen.
    pub async fn wait_for_ready(&self, timeout: Duration) -> Result<String, RequestorError> {
        let mut rx = self.inner.ready.subscribe();
        let waited = tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await;
        match waited {
            Ok(Ok(server_id)) => Ok(server_id.clone().unwrap_or_default()),
            Ok(Err(_)) => Err(RequestorError::Destroyed),
            Err(_) => Err(RequestorError::ReadyTimeout(timeout)),
        }
    }

    pub fn status(&self) -> RequestorStatus {
        let inner = &self.inner;
        RequestorStatus {
            initialized: !inner.destroyed.load(Ordering::Acquire),
            has_target: inner.target.read().is_some(),
            pending_count: inner.pending.len(),
            total_request_count: inner.total_calls.load(Ordering::Relaxed),
            error_count: inner.error_count.load(Ordering::Relaxed),
            average_latency_ms: inner.latency.lock().average_ms(),
            last_activity_at: *inner.last_activity.lock(),
            server_id: inner.ready.borrow().clone(),
        }
    }

    /// Reject every pending call, cancel every timer, stop listening and
    /// clear the target. Idempotent.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }
}

impl Drop for Requestor {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}

impl RequestorInner {
    fn touch(&self) {
        *self.last_activity.lock() = Some(Utc::now());
    }

    fn transition(&self, id: &CorrelationId, transition: &'static str, attempt: u32) {
        if self.config.debug {
            debug!(correlation_id = %id, transition, attempt, "Correlation state transition");
        }
    }

    fn submit(self: &Arc<Self>, request: Request) -> Result<PendingReply, RequestorError> {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.touch();

        let result = self.try_submit(request);
        if let Err(e) = &result {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            debug!(error = %e, kind = %e.kind(), "Call rejected before sending");
        }
        result
    }

    fn try_submit(self: &Arc<Self>, request: Request) -> Result<PendingReply, RequestorError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(RequestorError::Destroyed);
        }
        request
            .validate()
            .map_err(|e| RequestorError::InvalidRequest(e.message))?;
        let target = self.target.read().clone().ok_or(RequestorError::NoTarget)?;

        let id = CorrelationId::generate(&self.config.id_prefix);
        let envelope = self.encode(&id, &request)?;

        let (call, rx) = PendingCall::new(id.clone(), request);
        self.pending.insert(call);
        self.arm_reply_timer(&id, 0);
        self.transition(&id, "armed", 0);

        if let Err(e) = self.post(&target, envelope) {
            self.pending.take(&id);
            self.pending.cancel_timer(&id);
            return Err(e);
        }

        Ok(PendingReply {
            correlation_id: id,
            rx,
        })
    }

    fn encode(&self, id: &CorrelationId, request: &Request) -> Result<Value, RequestorError> {
        let encoded = match (self.config.wire_format, request) {
            (WireFormat::Legacy, Request::Plugin(call)) => {
                LegacyRequestMessage::new(id.clone(), LegacyRequest::from_call(call)).to_value()
            }
            _ => RequestMessage::new(id.clone(), request.clone()).to_value(),
        };
        encoded.map_err(RequestorError::Encode)
    }

    fn post(&self, target: &ChannelTarget, envelope: Value) -> Result<(), RequestorError> {
        if self.config.debug {
            debug!(recipient = %target.context, envelope = %envelope, "Posting request");
        }
        self.port
            .post(&target.context, envelope, &target.origin)
            .map_err(RequestorError::from)
    }

    fn next_seq(&self) -> u64 {
        self.timer_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn arm_reply_timer(self: &Arc<Self>, id: &CorrelationId, attempt: u32) {
        let seq = self.next_seq();
        let deadline = Instant::now() + self.config.timeout();
        self.pending.arm_with(id, || {
            let inner = Arc::clone(self);
            let timer_id = id.clone();
            let task = tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                inner.on_reply_timeout(&timer_id, attempt, seq);
            });
            TimeoutHandle::new(id.clone(), deadline, TimerKind::Reply, attempt, seq, task)
        });
    }

    fn schedule_retry(self: &Arc<Self>, id: &CorrelationId, attempt: u32) {
        let seq = self.next_seq();
        let deadline = Instant::now() + self.config.retry_delay();
        self.pending.arm_with(id, || {
            let inner = Arc::clone(self);
            let timer_id = id.clone();
            let task = tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                inner.resend(&timer_id, attempt, seq);
            });
            TimeoutHandle::new(id.clone(), deadline, TimerKind::RetryDelay, attempt, seq, task)
        });
    }

    fn on_message(self: &Arc<Self>, message: ChannelMessage) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }
        match classify(&message.data) {
            Some(Inbound::Response {
                correlation_id,
                response,
            }) => self.on_response(&correlation_id, response),
            Some(Inbound::Error {
                correlation_id,
                error,
            }) => self.on_error_envelope(&correlation_id, error),
            Some(Inbound::Ready { server_id }) => {
                let first = self.ready.send_if_modified(|current| {
                    if current.is_none() {
                        *current = Some(server_id.clone());
                        true
                    } else {
                        false
                    }
                });
                if first {
                    info!(server_id = %server_id, origin = %message.origin, "Responder ready");
                }
            }
            Some(Inbound::Request(_)) | None => {}
        }
    }

    fn on_response(&self, id: &CorrelationId, response: CallResponse) {
        let Some(call) = self.pending.take(id) else {
            if self.config.debug {
                debug!(correlation_id = %id, "Ignoring response for unknown correlation id");
            }
            return;
        };
        self.pending.cancel_timer(id);

        let latency = call.started_at.elapsed();
        self.latency.lock().record(latency);
        self.touch();
        self.transition(id, "resolved", call.retry_count);

        if !call.complete(Ok(response)) {
            debug!(correlation_id = %id, "Caller stopped waiting before the reply");
        }
    }

    fn on_error_envelope(self: &Arc<Self>, id: &CorrelationId, error: WireError) {
        self.retry_or_fail(id, None, RequestorError::Remote(error));
    }

    fn on_reply_timeout(self: &Arc<Self>, id: &CorrelationId, attempt: u32, seq: u64) {
        if !self.pending.release_timer(id, seq) {
            return;
        }
        let error = RequestorError::Timeout {
            correlation_id: id.clone(),
            attempts: attempt + 1,
        };
        self.retry_or_fail(id, Some(attempt), error);
    }

    /// Feed a failure into the machine. `attempt`, when given,
    /// must match the record's current attempt or the failure is stale.
    fn retry_or_fail(self: &Arc<Self>, id: &CorrelationId, attempt: Option<u32>, error: RequestorError) {
        let max_retries = self.config.max_retries;
        let next = self
            .pending
            .with_call_mut(id, |call| {
                if call.state != CallState::Armed {
                    return Transition::Ignore;
                }
                if attempt.is_some_and(|a| a != call.retry_count) {
                    return Transition::Ignore;
                }
                call.last_error = Some(error.clone());
                if call.retry_count < max_retries {
                    call.retry_count += 1;
                    call.state = CallState::Retrying;
                    Transition::Retry(call.retry_count)
                } else {
                    Transition::Fail
                }
            })
            .unwrap_or(Transition::Ignore);

        match next {
            Transition::Retry(next_attempt) => {
                warn!(
                    correlation_id = %id,
                    attempt = next_attempt,
                    max_retries,
                    error = %error,
                    "Call failed, retrying"
                );
                self.transition(id, "retrying", next_attempt);
                self.schedule_retry(id, next_attempt);
            }
            Transition::Fail => {
                if let Some(call) = self.pending.take(id) {
                    self.pending.cancel_timer(id);
                    self.fail(call, error);
                }
            }
            Transition::Ignore => {}
        }
    }

    fn resend(self: &Arc<Self>, id: &CorrelationId, attempt: u32, seq: u64) {
        if !self.pending.release_timer(id, seq) {
            return;
        }

        let Some(target) = self.target.read().clone() else {
            if let Some(call) = self.pending.take(id) {
                let error = call.last_error.clone().unwrap_or(RequestorError::NoTarget);
                debug!(correlation_id = %id, "Target cleared during retry wait");
                self.fail(call, error);
            }
            return;
        };

        let request = self
            .pending
            .with_call_mut(id, |call| {
                if call.state == CallState::Retrying && call.retry_count == attempt {
                    call.state = CallState::Armed;
                    Some(call.request.clone())
                } else {
                    None
                }
            })
            .flatten();
        let Some(request) = request else {
            return;
        };

        self.arm_reply_timer(id, attempt);
        self.transition(id, "armed", attempt);

        let sent = self
            .encode(id, &request)
            .and_then(|envelope| self.post(&target, envelope));
        if let Err(e) = sent {
            if let Some(call) = self.pending.take(id) {
                self.pending.cancel_timer(id);
                self.fail(call, e);
            }
        }
    }

    fn fail(&self, call: PendingCall, error: RequestorError) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.touch();
        warn!(
            correlation_id = %call.id,
            attempts = call.retry_count + 1,
            kind = %error.kind(),
            error = %error,
            "Call failed"
        );
        self.transition(&call.id, "failed", call.retry_count);
        call.complete(Err(error));
    }

    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        *self.target.write() = None;

        let drained = self.pending.drain();
        let rejected = drained.len();
        for call in drained {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            call.complete(Err(RequestorError::Destroyed));
        }

        info!(
            context = %self.port.context_id(),
            rejected,
            "Requestor destroyed"
        );
    }
}
