//! # Retry Bound and Correlation Identity
//!
//! Every resend reuses the original correlation id, and a call is sent at
//! most `maxRetries + 1` times before failing.

#[cfg(test)]
mod tests {
    use crate::support::{responder_config, Bridge, MockExecutor};
    use bridge_requestor::{RequestorConfig, RequestorError};
    use bridge_responder::{ExecutorError, HttpResponse};
    use bridge_wire::{ErrorKind, PluginCall};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn user_info() -> PluginCall {
        PluginCall::new("getUserInfo", "u1", "c1")
    }

    fn assert_single_id(requests: &[Value]) {
        let first = &requests[0]["correlationId"];
        assert!(first.is_string());
        assert!(requests.iter().all(|m| &m["correlationId"] == first));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failures_retry_to_the_bound() {
        let executor = MockExecutor::new(|_| Err(ExecutorError::Transport("connection refused".into())));
        let mut bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;

        let err = bridge.requestor.call(user_info()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkError);

        let requests = bridge.requests();
        assert_eq!(requests.len(), 4);
        assert_single_id(&requests);
        // errored ids are released by the responder, so every resend executes
        assert_eq!(executor.call_count(), 4);
        assert_eq!(bridge.requestor.status().error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_responder_times_out_after_bound() {
        let executor = MockExecutor::returning(json!(1));
        let mut bridge = Bridge::start(
            RequestorConfig::default().with_max_retries(2),
            responder_config(),
            executor.clone(),
        )
        .await;
        bridge.responder.shutdown();

        let started = tokio::time::Instant::now();
        let err = bridge.requestor.call(user_info()).await.unwrap_err();
        assert!(matches!(err, RequestorError::Timeout { attempts: 3, .. }));

        // three 10s attempts with two 1s waits between them
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(32) && elapsed < Duration::from_secs(33));
        let requests = bridge.requests();
        assert_eq!(requests.len(), 3);
        assert_single_id(&requests);
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_on_later_attempt() {
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        let executor = MockExecutor::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(HttpResponse::new(502, "bad gateway"))
            } else {
                Ok(HttpResponse::json_ok(&json!({"success": true, "result": "third time"})))
            }
        });
        let mut bridge =
            Bridge::start(RequestorConfig::default(), responder_config(), executor.clone()).await;

        let response = bridge.requestor.call(user_info()).await.unwrap();
        assert_eq!(response.result, Some(json!("third time")));
        assert_eq!(executor.call_count(), 3);
        assert_eq!(bridge.requests().len(), 3);
        assert_eq!(bridge.requestor.status().error_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_any_error_kind_is_retried_to_the_bound() {
        let executor = MockExecutor::new(|_| Ok(HttpResponse::new(200, "<html>")));
        let mut bridge = Bridge::start(
            RequestorConfig::default().with_max_retries(2),
            responder_config(),
            executor.clone(),
        )
        .await;

        let err = bridge.requestor.call(user_info()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert_eq!(executor.call_count(), 3);
        let requests = bridge.requests();
        assert_eq!(requests.len(), 3);
        assert_single_id(&requests);
        assert_eq!(bridge.requestor.status().error_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upstream_timeout_is_reported() {
        // responder gives up at 30s, long before the requestor does
        let executor = MockExecutor::delayed(|_| Duration::from_secs(45), |_| {
            Ok(HttpResponse::json_ok(&json!({"success": true, "result": 1})))
        });
        let config = RequestorConfig::default()
            .with_timeout_ms(60_000)
            .with_max_retries(0);
        let bridge = Bridge::start(config, responder_config(), executor.clone()).await;

        let err = bridge.requestor.call(user_info()).await.unwrap_err();
        assert!(matches!(err, RequestorError::Remote(_)));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(executor.call_count(), 1);
    }

    /// A slow reply that lands during the retry wait still resolves the call,
    /// and the scheduled resend never happens.
    #[tokio::test(start_paused = true)]
    async fn test_late_reply_during_retry_wait() {
        let executor = MockExecutor::delayed(|_| Duration::from_millis(1_500), |_| {
            Ok(HttpResponse::json_ok(&json!({"success": true, "result": "late"})))
        });
        let config = RequestorConfig::default().with_timeout_ms(1_000);
        let mut bridge = Bridge::start(config, responder_config(), executor.clone()).await;

        let response = bridge.requestor.call(user_info()).await.unwrap();
        assert_eq!(response.result, Some(json!("late")));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(bridge.requests().len(), 1);
        assert_eq!(executor.call_count(), 1);
    }

    /// A resend of an id the responder is still working on is dropped; the
    /// one reply answers the call.
    #[tokio::test(start_paused = true)]
    async fn test_resend_while_in_flight_is_deduplicated() {
        let executor = MockExecutor::delayed(|_| Duration::from_millis(2_500), |_| {
            Ok(HttpResponse::json_ok(&json!({"success": true, "result": "once"})))
        });
        let config = RequestorConfig::default().with_timeout_ms(1_000);
        let mut bridge = Bridge::start(config, responder_config(), executor.clone()).await;

        let response = bridge.requestor.call(user_info()).await.unwrap();
        assert_eq!(response.result, Some(json!("once")));

        let traffic = bridge.traffic();
        let requests = traffic.iter().filter(|m| m["kind"] == json!("request")).count();
        let replies = traffic.iter().filter(|m| m["kind"] == json!("response")).count();
        assert_eq!(requests, 2);
        assert_eq!(replies, 1);
        assert_eq!(executor.call_count(), 1);
    }
}
