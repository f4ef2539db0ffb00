//! bridge-probe: send one call through a requestor/responder pair.
//!
//! Builds an in-process channel with a host context and a nested frame, runs
//! a responder in the frame against `--base-url`, and prints the call result
//! as JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Map, Value};

use bridge_requestor::{ChannelTarget, Requestor, RequestorConfig, WireFormat};
use bridge_responder::{ReqwestExecutor, Responder, ResponderConfig};
use bridge_telemetry::{init_telemetry, TelemetryConfig};
use bridge_wire::{HttpCall, HttpVerb, PluginCall, Request};
use shared_channel::{InMemoryChannel, TargetOrigin};

const HOST_ORIGIN: &str = "https://host.local";
const FRAME_ORIGIN: &str = "null";

/// Issue one bridged call and print the result
#[derive(Parser, Debug)]
#[command(name = "bridge-probe")]
#[command(about = "Send one call through a requestor/responder pair")]
struct Args {
    /// Backend base address the responder targets
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Plugin method to call (ignored with --url)
    #[arg(short, long, default_value = "getUserInfo")]
    method: String,

    /// Caller id
    #[arg(long, default_value = "")]
    caller: String,

    /// Scope id
    #[arg(long, default_value = "")]
    scope: String,

    /// Signature for methods that authenticate with one
    #[arg(long)]
    signature: Option<String>,

    /// Method parameters as a JSON object
    #[arg(long)]
    params: Option<String>,

    /// Send a raw HTTP passthrough to this URL instead of a plugin call
    #[arg(long)]
    url: Option<String>,

    /// Verb for --url
    #[arg(long, default_value = "GET")]
    verb: String,

    /// Body for --url, sent as JSON when it parses, else as text
    #[arg(long)]
    body: Option<String>,

    /// Per-attempt reply deadline in milliseconds
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Retries after the first attempt
    #[arg(long, default_value = "0")]
    retries: u32,

    /// Send plugin calls in the legacy envelope
    #[arg(long)]
    legacy: bool,

    /// Log every wire message and transition
    #[arg(long)]
    debug: bool,
}

fn parse_verb(verb: &str) -> Result<HttpVerb> {
    let verb = serde_json::from_value(json!(verb.to_ascii_uppercase()))
        .with_context(|| format!("unsupported verb {verb:?}"))?;
    Ok(verb)
}

fn build_request(args: &Args) -> Result<Request> {
    if let Some(url) = &args.url {
        let mut call = HttpCall::new(url.clone()).with_method(parse_verb(&args.verb)?);
        if let Some(body) = &args.body {
            let body = serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone()));
            call = call.with_body(body);
        }
        return Ok(call.into());
    }

    let mut call = PluginCall::new(args.method.clone(), args.caller.clone(), args.scope.clone());
    if let Some(params) = &args.params {
        let params: Map<String, Value> =
            serde_json::from_str(params).context("--params must be a JSON object")?;
        call = call.with_params(params);
    }
    if let Some(signature) = &args.signature {
        call = call.with_signature(signature.clone());
    }
    Ok(call.into())
}

/// `--debug` wins over the environment; with neither, stay quiet.
fn telemetry_config(debug: bool, lookup: impl Fn(&str) -> Option<String>) -> TelemetryConfig {
    let level_from_env = lookup("BRIDGE_LOG_LEVEL").is_some() || lookup("RUST_LOG").is_some();
    let config = TelemetryConfig::from_lookup(&lookup).with_service_name("bridge-probe");
    if debug {
        config.with_log_level("debug")
    } else if level_from_env {
        config
    } else {
        config.with_log_level("warn")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let telemetry = telemetry_config(args.debug, |key| std::env::var(key).ok());
    init_telemetry(&telemetry)?;

    let request = build_request(&args)?;

    let channel = InMemoryChannel::new();
    let host = channel.attach("host", HOST_ORIGIN)?;
    let frame = channel.attach_nested("frame", FRAME_ORIGIN, &"host".into())?;

    let responder_config = ResponderConfig::new(args.base_url.clone())
        .with_debug(args.debug)
        .with_allowed_origins([HOST_ORIGIN])
        .with_server_id("bridge-probe");
    let executor = Arc::new(ReqwestExecutor::new()?);

    let requestor_config = RequestorConfig::default()
        .with_timeout_ms(args.timeout_ms)
        .with_max_retries(args.retries)
        .with_debug(args.debug)
        .with_wire_format(if args.legacy {
            WireFormat::Legacy
        } else {
            WireFormat::Enhanced
        });
    let requestor = Requestor::new(requestor_config, Arc::new(host))?;
    requestor.set_target(ChannelTarget::new("frame", TargetOrigin::parse(FRAME_ORIGIN)));

    let responder = Responder::start(responder_config, Arc::new(frame), executor)?;
    let server_id = requestor.wait_for_ready(Duration::from_secs(5)).await?;
    tracing::debug!(server_id = %server_id, "Responder ready");

    let outcome = requestor.submit(request)?.await;
    let status = requestor.status();
    requestor.destroy();
    responder.shutdown();

    match outcome {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                bail!("call returned success=false");
            }
        }
        Err(e) => {
            let report = json!({
                "error": { "code": e.kind(), "message": e.to_string() },
                "status": status,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            bail!("call failed: {e}");
        }
    }

    Ok(())
}
