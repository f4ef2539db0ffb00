//! Shared fixtures: a host context running a requestor, a nested frame
//! running a responder, and a scripted network behind it.

use async_trait::async_trait;
use bridge_requestor::{ChannelTarget, Requestor, RequestorConfig};
use bridge_responder::{
    ExecutorError, HttpExecutor, HttpResponse, OutboundCall, Responder, ResponderConfig,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_channel::{InMemoryChannel, Subscription, TargetOrigin};
use std::sync::Arc;
use std::time::Duration;

pub const HOST_ORIGIN: &str = "https://app.example";
pub const FRAME_ORIGIN: &str = "null";
pub const BASE_URL: &str = "https://api.example";

type Handler = dyn Fn(&OutboundCall) -> Result<HttpResponse, ExecutorError> + Send + Sync;
type Delay = dyn Fn(&OutboundCall) -> Duration + Send + Sync;

/// Network executor that records every call and answers from a closure.
pub struct MockExecutor {
    calls: Mutex<Vec<OutboundCall>>,
    handler: Box<Handler>,
    delay: Box<Delay>,
}

impl MockExecutor {
    pub fn new(
        handler: impl Fn(&OutboundCall) -> Result<HttpResponse, ExecutorError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::delayed(|_| Duration::ZERO, handler)
    }

    /// Answer after a per-call delay.
    pub fn delayed(
        delay: impl Fn(&OutboundCall) -> Duration + Send + Sync + 'static,
        handler: impl Fn(&OutboundCall) -> Result<HttpResponse, ExecutorError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
            delay: Box::new(delay),
        })
    }

    /// Answers every call with `{success: true, result}`.
    pub fn returning(result: Value) -> Arc<Self> {
        Self::new(move |_| Ok(HttpResponse::json_ok(&json!({"success": true, "result": result}))))
    }

    pub fn calls(&self) -> Vec<OutboundCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

/// Success envelope carrying the request body's `params`.
pub fn echo(call: &OutboundCall) -> Value {
    let body: Value = call
        .body
        .as_deref()
        .and_then(|b| serde_json::from_str(b).ok())
        .unwrap_or(Value::Null);
    json!({"success": true, "result": body["params"].clone()})
}

#[async_trait]
impl HttpExecutor for MockExecutor {
    async fn execute(&self, call: OutboundCall) -> Result<HttpResponse, ExecutorError> {
        self.calls.lock().push(call.clone());
        let delay = (self.delay)(&call);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(&call)
    }
}

pub fn responder_config() -> ResponderConfig {
    ResponderConfig::new(BASE_URL)
        .with_server_id("srv-it")
        .with_allowed_origins([HOST_ORIGIN])
}

/// A requestor in the host context wired to a responder in a nested frame.
pub struct Bridge {
    pub channel: Arc<InMemoryChannel>,
    pub requestor: Requestor,
    pub responder: Responder,
    pub executor: Arc<MockExecutor>,
    traffic: Subscription,
}

impl Bridge {
    /// Start both sides and wait for the ready notice.
    pub async fn start(
        requestor: RequestorConfig,
        responder: ResponderConfig,
        executor: Arc<MockExecutor>,
    ) -> Self {
        Self::start_in(HOST_ORIGIN, requestor, responder, executor).await
    }

    /// Same as [`start`](Self::start) with the host at `host_origin`.
    pub async fn start_in(
        host_origin: &str,
        requestor: RequestorConfig,
        responder: ResponderConfig,
        executor: Arc<MockExecutor>,
    ) -> Self {
        let channel = InMemoryChannel::new();
        let traffic = channel.tap();
        let host = channel.attach("host", host_origin).expect("attach host");
        let frame = channel
            .attach_nested("frame", FRAME_ORIGIN, &"host".into())
            .expect("attach frame");

        let requestor = Requestor::new(requestor, Arc::new(host)).expect("requestor");
        requestor.set_target(ChannelTarget::new(
            "frame",
            TargetOrigin::Exact(FRAME_ORIGIN.to_string()),
        ));

        let responder = Responder::start(responder, Arc::new(frame), executor.clone())
            .expect("responder");
        requestor
            .wait_for_ready(Duration::from_secs(5))
            .await
            .expect("ready notice");

        Self {
            channel,
            requestor,
            responder,
            executor,
            traffic,
        }
    }

    /// Every channel message posted since the last call.
    pub fn traffic(&mut self) -> Vec<Value> {
        self.traffic.drain().into_iter().map(|m| m.data).collect()
    }

    /// Request envelopes posted since the last call to `traffic`.
    pub fn requests(&mut self) -> Vec<Value> {
        self.traffic()
            .into_iter()
            .filter(|m| m["kind"] == json!("request"))
            .collect()
    }
}
