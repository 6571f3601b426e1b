//! Envelope and marshalling benchmarks.
//!
//! Measures baseline performance of the wire-crossing path every
//! forked/remote send takes (§4.3, §4.6):
//! - Envelope JSON round-trip (encode + decode)
//! - `MarshallerRegistry` argument round-trip throughput
//! - Balancer broadcast fan-out to 10 clustered actors

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::hint::black_box;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

// Layer 3: Internal module imports
use hactor::actor::{ActorContext, Behaviour, Dispatch};
use hactor::balancer::RoundRobinBalancer;
use hactor::inmemory::InMemoryActor;
use hactor::marshal::default_registry;
use hactor::message::{ActorMessageBody, Args, Envelope, EnvelopeBody};
use hactor::util::{ActorId, ActorMode};

struct Echo;

#[async_trait]
impl Behaviour for Echo {
    async fn dispatch(&mut self, topic: &str, args: Args, _ctx: &ActorContext) -> Dispatch {
        if topic == "ping" {
            Dispatch::Handled(json!("pong"))
        } else {
            Dispatch::NoHandler(args)
        }
    }
}

/// Benchmark: encode + decode a single `actor-message` envelope over JSON.
fn envelope_json_roundtrip(c: &mut Criterion) {
    c.bench_function("envelope_json_roundtrip", |b| {
        b.iter(|| {
            let envelope = Envelope::new(
                ActorId::new(),
                EnvelopeBody::ActorMessage(ActorMessageBody {
                    topic: "ping".to_string(),
                    message: hactor::message::WireArgs::new(vec![Value::from(1)]),
                    marshalled_type: None,
                    receive: true,
                }),
            );
            let encoded = serde_json::to_vec(&envelope).unwrap();
            let decoded: Envelope = serde_json::from_slice(&encoded).unwrap();
            black_box(decoded);
        });
    });
}

/// Benchmark: marshal + unmarshal 100 pre-marshalled JSON arguments
/// through the default registry.
fn marshaller_registry_throughput(c: &mut Criterion) {
    let registry = default_registry();
    c.bench_function("marshaller_registry_throughput", |b| {
        b.iter(|| {
            for i in 0..100i64 {
                let mut args = Args::new();
                args.push(Value::from(i));
                let (wire, kinds) = registry.marshall_args(&args, ActorMode::Forked).unwrap();
                let restored = registry.unmarshall_args(wire, &kinds).unwrap();
                black_box(restored);
            }
        });
    });
}

/// Benchmark: `broadcast_and_receive` fan-out to a 10-member cluster.
fn balancer_broadcast_small(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let balancer = rt.block_on(async {
        let mut children = Vec::with_capacity(10);
        for i in 0..10 {
            children.push(
                InMemoryActor::spawn(format!("echo-{i}"), None, Box::new(Echo), Default::default())
                    .await
                    .unwrap(),
            );
        }
        RoundRobinBalancer::new(children, ActorMode::InMemory)
    });

    c.bench_function("balancer_broadcast_small", |b| {
        b.to_async(&rt).iter(|| async {
            let args_per_child = (0..10).map(|_| Args::new()).collect();
            let responses = balancer.broadcast_and_receive("ping", args_per_child).await;
            black_box(responses);
        });
    });

    for child in balancer.children() {
        let _ = rt.block_on(child.destroy());
    }
}

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(30)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(2))
        .without_plots()
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets =
        envelope_json_roundtrip,
        marshaller_registry_throughput,
        balancer_broadcast_small
}

criterion_main!(benches);
