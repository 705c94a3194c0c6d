// SPDX-License-Identifier: MIT OR Apache-2.0
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde::{Deserialize, Serialize};

use envelope_wire::carrier::OriginalMessage;
use envelope_wire::codec::JsonCodec;
use envelope_wire::collaborators::{
    CallbackChain, MappingRegistry, StaticSource, SystemClock, UuidGenerator,
};
use envelope_wire::orchestrator::{EnvelopeSerializer, EnvelopeSerializerOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Payload {
    items: Vec<serde_json::Value>,
}

fn payload(n: usize) -> Payload {
    Payload {
        items: (0..n)
            .map(|i| serde_json::json!({"street": format!("Street {i}"), "unit": i, "zip": "10000"}))
            .collect(),
    }
}

fn serializer() -> EnvelopeSerializer {
    let mut registry = MappingRegistry::new();
    registry.register::<Payload>("addressInfoList", "Payload", Arc::new(JsonCodec::<Payload>::new()));
    let registry = Arc::new(registry);
    EnvelopeSerializer::new(
        EnvelopeSerializerOptions::default(),
        registry.clone(),
        registry,
        Arc::new(SystemClock),
        Arc::new(UuidGenerator),
        Arc::new(StaticSource("/backend/service".to_string())),
        CallbackChain::new(),
    )
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    for &n in &[1usize, 50, 500] {
        let serializer = serializer();
        group.bench_function(format!("items_{n}"), |b| {
            b.iter(|| {
                let envelope = serializer.create_envelope(black_box(payload(n))).unwrap();
                serializer.serialize(black_box(envelope)).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_convert_to_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_to_envelope");
    for &n in &[1usize, 50, 500] {
        let serializer = serializer();
        let envelope = serializer.create_envelope(payload(n)).unwrap();
        let json = serializer.serialize(envelope).unwrap();
        group.bench_function(format!("items_{n}"), |b| {
            b.iter(|| {
                let original = OriginalMessage::from_body(black_box(json.clone()));
                serializer.convert_to_envelope(original).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_convert_notification_wrapped(c: &mut Criterion) {
    let serializer = serializer();
    let envelope = serializer.create_envelope(payload(50)).unwrap();
    let inner = serializer.serialize(envelope).unwrap();
    let escaped = inner.replace('\\', "\\\\").replace('"', "\\\"");
    let wrapped = format!(
        r#"{{"Type":"Notification","MessageId":"mid-1","TopicArn":"arn:aws:sns:us-east-1:123:topic","Timestamp":"2024-01-01T00:00:00Z","Message":"{escaped}"}}"#
    );
    c.bench_function("convert_notification_wrapped", |b| {
        b.iter(|| {
            let original = OriginalMessage::from_body(black_box(wrapped.clone()));
            serializer.convert_to_envelope(original).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_serialize,
    bench_convert_to_envelope,
    bench_convert_notification_wrapped,
);
criterion_main!(benches);
