//! # Origin Enforcement
//!
//! Messages from origins outside the responder's whitelist are dropped
//! without a reply, and the requestor sees them time out.

#[cfg(test)]
mod tests {
    use crate::support::{responder_config, Bridge, MockExecutor};
    use bridge_requestor::{ChannelTarget, RequestorConfig, RequestorError};
    use bridge_wire::{ErrorKind, PluginCall};
    use serde_json::json;
    use shared_channel::TargetOrigin;

    fn impatient() -> RequestorConfig {
        RequestorConfig::default()
            .with_timeout_ms(2_000)
            .with_max_retries(0)
    }

    fn user_info() -> PluginCall {
        PluginCall::new("getUserInfo", "u1", "c1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_disallowed_origin_gets_no_reply() {
        let executor = MockExecutor::returning(json!(1));
        let mut bridge = Bridge::start_in(
            "https://evil.example",
            impatient(),
            responder_config(),
            executor.clone(),
        )
        .await;

        let err = bridge.requestor.call(user_info()).await.unwrap_err();
        assert!(matches!(err, RequestorError::Timeout { attempts: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(executor.call_count(), 0);

        // the request was delivered; only replies are missing
        let traffic = bridge.traffic();
        assert!(traffic.iter().any(|m| m["kind"] == json!("request")));
        assert!(!traffic.iter().any(|m| m["kind"] == json!("response")));
        assert!(!traffic.iter().any(|m| m["kind"] == json!("error")));
        assert_eq!(bridge.responder.status().request_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wildcard_whitelist() {
        let config = responder_config().with_allowed_origins(["https://*.example"]);

        let bridge = Bridge::start_in(
            "https://tenant-1.example",
            impatient(),
            config.clone(),
            MockExecutor::returning(json!("ok")),
        )
        .await;
        assert!(bridge.requestor.call(user_info()).await.is_ok());

        let bridge = Bridge::start_in(
            "https://example.org",
            impatient(),
            config,
            MockExecutor::returning(json!("ok")),
        )
        .await;
        assert!(bridge.requestor.call(user_info()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_whitelist_accepts_any_origin() {
        let config = responder_config().with_allowed_origins(Vec::<String>::new());
        let bridge = Bridge::start_in(
            "https://anywhere.test",
            impatient(),
            config,
            MockExecutor::returning(json!("ok")),
        )
        .await;
        assert!(bridge.requestor.call(user_info()).await.is_ok());
    }

    /// The requestor's own target origin restriction is enforced by the
    /// channel: a mismatched frame never sees the request.
    #[tokio::test(start_paused = true)]
    async fn test_target_origin_mismatch_is_dropped_by_channel() {
        let executor = MockExecutor::returning(json!(1));
        let bridge = Bridge::start(impatient(), responder_config(), executor.clone()).await;
        bridge.requestor.set_target(ChannelTarget::new(
            "frame",
            TargetOrigin::Exact("https://frame.example".into()),
        ));

        let err = bridge.requestor.call(user_info()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(executor.call_count(), 0);
        assert!(bridge.channel.messages_dropped() >= 1);
    }
}
