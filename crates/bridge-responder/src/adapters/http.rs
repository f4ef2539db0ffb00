//! `reqwest`-backed network executor.

use crate::ports::outbound::{ExecutorError, HttpExecutor, HttpResponse, OutboundCall};
use async_trait::async_trait;
use bridge_wire::HttpVerb;
use reqwest::{Client, Method};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Executes outbound calls with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    /// Create an executor with a fresh client.
    pub fn new() -> Result<Self, ExecutorError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("bridge-responder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExecutorError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_method(verb: HttpVerb) -> Method {
    match verb {
        HttpVerb::Get => Method::GET,
        HttpVerb::Post => Method::POST,
        HttpVerb::Put => Method::PUT,
        HttpVerb::Patch => Method::PATCH,
        HttpVerb::Delete => Method::DELETE,
        HttpVerb::Head => Method::HEAD,
        HttpVerb::Options => Method::OPTIONS,
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, call: OutboundCall) -> Result<HttpResponse, ExecutorError> {
        let timeout = call.timeout;
        let mut request = self
            .client
            .request(to_method(call.method), &call.url)
            .timeout(timeout);
        for (name, value) in &call.headers {
            request = request.header(name, value);
        }
        if let Some(body) = call.body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExecutorError::Timeout(timeout)
            } else if e.is_builder() {
                ExecutorError::InvalidRequest(e.to_string())
            } else {
                ExecutorError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ExecutorError::Timeout(timeout)
            } else {
                ExecutorError::Transport(e.to_string())
            }
        })?;

        debug!(
            method = %call.method,
            url = %call.url,
            status,
            bytes = body.len(),
            "Outbound call completed"
        );

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
