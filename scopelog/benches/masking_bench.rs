//! Benchmarks for masking and entry processing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scopelog::logging::{LogCall, LogPipeline};
use scopelog::masking::MaskingEngine;
use scopelog::LogLevel;
use serde_json::{json, Map};

fn masking_benchmark(c: &mut Criterion) {
    let engine = MaskingEngine::new(Vec::new())
        .with_default_rules()
        .expect("default rules compile");
    let payload = json!({
        "user": {"email": "al@example.com", "password": "hunter2", "phone": "+1 555 123 4567"},
        "request": {
            "url": "https://api.example.com/v1?token=abc123&page=2",
            "apiKey": "sk_live_abcdefgh1234"
        },
        "items": [{"id": 1, "cardNumber": "4111 1111 1111 1111"}, {"id": 2}],
    });

    c.bench_function("mask_nested_payload", |b| {
        b.iter(|| black_box(engine.process(black_box(&payload))));
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let pipeline = LogPipeline::new().with_masking(
        MaskingEngine::new(Vec::new())
            .with_default_rules()
            .expect("default rules compile"),
    );
    let call = LogCall::new("user %s logged in")
        .arg(json!("al"))
        .with_field("password", "hunter2")
        .with_field("attempt", 3);

    c.bench_function("process_entry", |b| {
        b.iter(|| {
            runtime.block_on(pipeline.process(
                LogLevel::Info,
                "bench",
                &Map::new(),
                black_box(&call),
            ))
        });
    });
}

criterion_group!(benches, masking_benchmark, pipeline_benchmark);
criterion_main!(benches);
