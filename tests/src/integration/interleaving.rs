//! # Reply Interleaving
//!
//! Many calls share one channel and the responder answers them in whatever
//! order the network finishes. Each call must still resolve with its own
//! result.

#[cfg(test)]
mod tests {
    use crate::support::{echo, responder_config, Bridge, MockExecutor};
    use bridge_requestor::RequestorConfig;
    use bridge_responder::{HttpResponse, OutboundCall};
    use bridge_wire::PluginCall;
    use proptest::prelude::*;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Network delay carried in the call's own params.
    fn delay_of(call: &OutboundCall) -> Duration {
        let body: Value = call
            .body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
            .unwrap_or(Value::Null);
        Duration::from_millis(body["params"]["delayMs"].as_u64().unwrap_or(0))
    }

    fn run_interleaved(delays: Vec<u64>) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        runtime.block_on(async move {
            let executor = MockExecutor::delayed(delay_of, |call| Ok(HttpResponse::json_ok(&echo(call))));
            let bridge =
                Bridge::start(RequestorConfig::default(), responder_config(), executor.clone())
                    .await;

            let replies: Vec<_> = delays
                .iter()
                .enumerate()
                .map(|(i, delay)| {
                    bridge
                        .requestor
                        .submit(
                            PluginCall::new("getUserInfo", "u1", "c1")
                                .with_param("n", json!(i))
                                .with_param("delayMs", json!(delay)),
                        )
                        .unwrap()
                })
                .collect();

            for (i, reply) in replies.into_iter().enumerate() {
                let response = reply.await.unwrap();
                assert_eq!(response.result.unwrap()["n"], json!(i));
            }

            let status = bridge.requestor.status();
            assert_eq!(status.pending_count, 0);
            assert_eq!(status.error_count, 0);
            assert_eq!(executor.call_count(), delays.len());
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_each_call_gets_its_own_reply(delays in proptest::collection::vec(0u64..5_000, 1..20)) {
            run_interleaved(delays);
        }
    }

    #[test]
    fn test_reverse_completion_order() {
        run_interleaved((0..10).rev().map(|i| i * 100).collect());
    }
}
