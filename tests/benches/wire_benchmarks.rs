//! # Context Bridge Wire Benchmarks
//!
//! Per-message costs on the hot path of both components:
//!
//! | Operation | Side |
//! |-----------|------|
//! | correlation id generation | requestor, once per call |
//! | request envelope encode | requestor, once per attempt |
//! | classify | both, once per channel message |
//! | legacy conversion | responder, legacy envelopes only |
//! | channel round trip | both |

use bridge_wire::{
    classify, convert_legacy_to_structured, CallResponse, CorrelationId, LegacyRequest,
    LegacyRequestMessage, PluginCall, RequestMessage, ResponseMessage,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_channel::{InMemoryChannel, MessagePort, TargetOrigin};

fn sample_call(params: usize) -> PluginCall {
    (0..params).fold(
        PluginCall::new("updateSettings", "user-42", "scope-7").with_signature("sig"),
        |call, i| call.with_param(format!("key{i}"), json!(i)),
    )
}

fn bench_correlation_ids(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");
    group.bench_function("generate", |b| {
        b.iter(|| black_box(CorrelationId::generate("req")))
    });
    let id = CorrelationId::generate("req");
    group.bench_function("timestamp_ms", |b| b.iter(|| black_box(id.timestamp_ms())));
    group.finish();
}

fn bench_envelopes(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelopes");

    for params in [0usize, 8, 64] {
        let call = sample_call(params);
        group.throughput(Throughput::Elements(1));

        group.bench_with_input(BenchmarkId::new("encode_request", params), &call, |b, call| {
            b.iter(|| {
                let message = RequestMessage::new(CorrelationId::from_wire("req_1"), call.clone().into());
                black_box(message.to_value())
            })
        });

        let enhanced = RequestMessage::new(CorrelationId::from_wire("req_1"), call.clone().into())
            .to_value()
            .unwrap();
        group.bench_with_input(BenchmarkId::new("classify_request", params), &enhanced, |b, msg| {
            b.iter(|| black_box(classify(msg)))
        });

        let legacy_request = LegacyRequest::from_call(&call);
        group.bench_with_input(
            BenchmarkId::new("legacy_to_structured", params),
            &legacy_request,
            |b, legacy| b.iter(|| black_box(convert_legacy_to_structured(legacy))),
        );

        let legacy = LegacyRequestMessage::new(CorrelationId::from_wire("req_1"), legacy_request)
            .to_value()
            .unwrap();
        group.bench_with_input(BenchmarkId::new("classify_legacy", params), &legacy, |b, msg| {
            b.iter(|| black_box(classify(msg)))
        });
    }

    let response = ResponseMessage::new(
        CorrelationId::from_wire("req_1"),
        CallResponse::ok(json!({"name": "Ada", "roles": ["admin"]})),
    )
    .to_value()
    .unwrap();
    group.bench_function("classify_response", |b| b.iter(|| black_box(classify(&response))));

    let foreign = json!({"type": "resize", "height": 480});
    group.bench_function("classify_foreign", |b| b.iter(|| black_box(classify(&foreign))));

    group.finish();
}

fn bench_channel(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let _guard = runtime.enter();

    let channel = InMemoryChannel::new();
    let host = channel.attach("host", "https://app.example").unwrap();
    let frame = channel
        .attach_nested("frame", "null", host.context_id())
        .unwrap();
    let mut inbox = frame.subscribe();
    let target = frame.context_id().clone();
    let message = RequestMessage::new(CorrelationId::from_wire("req_1"), sample_call(8).into())
        .to_value()
        .unwrap();

    c.bench_function("channel/post_and_receive", |b| {
        b.iter(|| {
            host.post(&target, message.clone(), &TargetOrigin::Any).unwrap();
            black_box(inbox.try_recv().unwrap())
        })
    });
}

criterion_group!(benches, bench_correlation_ids, bench_envelopes, bench_channel);
criterion_main!(benches);
