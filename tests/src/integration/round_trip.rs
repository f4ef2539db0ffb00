//! # Round Trip
//!
//! One logical call per correlation id, each resolved with its own reply.

#[cfg(test)]
mod tests {
    use crate::support::{responder_config, Bridge, MockExecutor, BASE_URL};
    use bridge_requestor::RequestorConfig;
    use bridge_responder::HttpResponse;
    use bridge_wire::{ErrorKind, HttpCall, HttpVerb, PluginCall};
    use serde_json::{json, Value};
    use std::time::Duration;

    // =============================================================================
    // STRUCTURED CALLS
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_plugin_call_round_trip() {
        let executor = MockExecutor::returning(json!({"name": "Ada"}));
        let mut bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;

        let response = bridge
            .requestor
            .call(PluginCall::new("getUserInfo", "u1", "c1"))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.result, Some(json!({"name": "Ada"})));

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, HttpVerb::Post);
        assert_eq!(calls[0].url, format!("{BASE_URL}/api/plugin/user-info"));
        let body: Value = serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["callerId"], json!("u1"));
        assert_eq!(body["scopeId"], json!("c1"));

        // one request, one reply, same id
        let traffic = bridge.traffic();
        let ids: Vec<&Value> = traffic
            .iter()
            .filter(|m| m["kind"] != json!("ready"))
            .map(|m| &m["correlationId"])
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], ids[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interleaved_replies_resolve_their_own_calls() {
        // later calls finish first
        let executor = MockExecutor::delayed(
            |call| {
                let n = crate::support::echo(call)["result"]["n"].as_u64().unwrap_or(0);
                Duration::from_millis((20 - n) * 100)
            },
            |call| Ok(HttpResponse::json_ok(&crate::support::echo(call))),
        );
        let bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;

        let replies: Vec<_> = (0..20u64)
            .map(|n| {
                bridge
                    .requestor
                    .submit(PluginCall::new("getSettings", "u1", "c1").with_param("n", json!(n)))
                    .unwrap()
            })
            .collect();

        let ids: std::collections::HashSet<String> = replies
            .iter()
            .map(|r| r.correlation_id().to_string())
            .collect();
        assert_eq!(ids.len(), 20);

        for (n, reply) in replies.into_iter().enumerate() {
            let response = reply.await.unwrap();
            assert_eq!(response.result, Some(json!({"n": n})));
        }
        assert_eq!(executor.call_count(), 20);
        assert_eq!(bridge.requestor.status().pending_count, 0);
        assert_eq!(bridge.responder.status().in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_false_is_a_resolved_reply() {
        let executor = MockExecutor::new(|_| {
            Ok(HttpResponse::json_ok(
                &json!({"success": false, "error": "scope locked"}),
            ))
        });
        let bridge = Bridge::start(RequestorConfig::default(), responder_config(), executor).await;

        let response = bridge
            .requestor
            .call(PluginCall::new("updateSettings", "u1", "c1"))
            .await
            .unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("scope locked"));
        assert_eq!(bridge.requestor.status().error_count, 0);
    }

    // =============================================================================
    // RAW-BODY ROUTES
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_uses_bearer_and_wraps_body() {
        let executor = MockExecutor::new(|_| Ok(HttpResponse::new(200, "window.cfg = {}")));
        let bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;

        let response = bridge
            .requestor
            .call(PluginCall::new("getBootstrap", "u1", "c1").with_signature("sig-1"))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.result, Some(json!("window.cfg = {}")));

        let call = &executor.calls()[0];
        assert_eq!(call.method, HttpVerb::Get);
        assert_eq!(call.url, format!("{BASE_URL}/api/bootstrap"));
        assert_eq!(call.headers.get("Authorization").map(String::as_str), Some("Bearer sig-1"));
        assert!(call.body.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_validate_session_sends_token_field() {
        let executor = MockExecutor::new(|_| Ok(HttpResponse::json_ok(&json!({"valid": true}))));
        let bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;

        let response = bridge
            .requestor
            .call(PluginCall::new("validateSession", "u1", "c1").with_signature("tok"))
            .await
            .unwrap();
        assert_eq!(response.result, Some(json!({"valid": true})));

        let body: Value =
            serde_json::from_str(executor.calls()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"token": "tok"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_signature_is_invalid_request() {
        let executor = MockExecutor::returning(json!(null));
        let bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;

        let err = bridge
            .requestor
            .call(PluginCall::new("getBootstrap", "u1", "c1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(executor.call_count(), 0);
    }

    // =============================================================================
    // HTTP PASSTHROUGH
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_http_passthrough() {
        // passthrough replies carry the raw body, not a success envelope
        let executor = MockExecutor::new(|_| Ok(HttpResponse::json_ok(&json!("pong"))));
        let bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;

        let response = bridge
            .requestor
            .call_http(
                HttpCall::new("/v2/ping")
                    .with_method(HttpVerb::Put)
                    .with_header("X-Trace", "t1")
                    .with_body(json!({"a": 1})),
            )
            .await
            .unwrap();
        assert_eq!(response.result, Some(json!("pong")));

        let call = &executor.calls()[0];
        assert_eq!(call.method, HttpVerb::Put);
        assert_eq!(call.url, format!("{BASE_URL}/v2/ping"));
        assert_eq!(call.headers.get("X-Trace").map(String::as_str), Some("t1"));
        assert_eq!(call.body.as_deref(), Some(r#"{"a":1}"#));
    }

    // =============================================================================
    // LOCAL VALIDATION AND ACCOUNTING
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_unknown_method_never_reaches_channel() {
        let executor = MockExecutor::returning(json!(null));
        let mut bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;
        bridge.traffic();

        let err = bridge
            .requestor
            .call(PluginCall::new("doesNotExist", "u1", "c1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(bridge.traffic().is_empty());
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_accounting() {
        let executor = MockExecutor::delayed(
            |_| Duration::from_millis(250),
            |call| {
                if call.url.ends_with("/broken") {
                    Ok(HttpResponse::new(500, "oops"))
                } else {
                    Ok(HttpResponse::json_ok(&json!({"success": true, "result": 1})))
                }
            },
        );
        let config = RequestorConfig::default().with_max_retries(0);
        let bridge = Bridge::start(config, responder_config(), executor).await;

        bridge
            .requestor
            .call(PluginCall::new("getUserInfo", "u1", "c1"))
            .await
            .unwrap();
        bridge
            .requestor
            .call(PluginCall::new("getScopeInfo", "u1", "c1"))
            .await
            .unwrap();
        let _ = bridge.requestor.call(PluginCall::new("nope", "u1", "c1")).await;
        let err = bridge
            .requestor
            .call_http(HttpCall::new("/broken"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkError);

        let status = bridge.requestor.status();
        assert!(status.initialized);
        assert!(status.has_target);
        assert_eq!(status.total_request_count, 4);
        assert_eq!(status.error_count, 2);
        assert_eq!(status.pending_count, 0);
        assert_eq!(status.average_latency_ms, 250);
        assert_eq!(status.server_id.as_deref(), Some("srv-it"));
        assert!(status.last_activity_at.is_some());

        let served = bridge.responder.status();
        assert_eq!(served.request_count, 3);
        assert_eq!(served.error_count, 1);
    }
}
