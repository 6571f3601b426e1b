//! In-memory actor benchmarks.
//!
//! Measures baseline performance of the in-memory mode's actor lifecycle
//! (§4.2) — the path every `sendAndReceive` takes when no process or
//! host boundary is crossed:
//! - Single actor spawn latency (task creation + `initialize()`)
//! - Batch actor spawn (10 actors)
//! - `sendAndReceive` throughput against a single actor

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

// Layer 1: Standard library imports
use std::hint::black_box;
use std::time::Duration;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;

// Layer 3: Internal module imports
use hactor::actor::{ActorContext, Behaviour, Dispatch};
use hactor::inmemory::InMemoryActor;
use hactor::message::Args;

struct CounterActor {
    count: i64,
}

impl CounterActor {
    fn new() -> Self {
        Self { count: 0 }
    }
}

#[async_trait]
impl Behaviour for CounterActor {
    async fn dispatch(&mut self, topic: &str, args: Args, _ctx: &ActorContext) -> Dispatch {
        if topic != "add" {
            return Dispatch::NoHandler(args);
        }
        if let Some(value) = args.downcast_ref::<i64>(0) {
            self.count += value;
        }
        Dispatch::Handled(json!(self.count))
    }
}

/// Benchmark: spawn a single in-memory actor (task creation + `initialize()`).
fn actor_spawn_single(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    c.bench_function("actor_spawn_single", |b| {
        b.to_async(&rt).iter(|| async {
            let actor = InMemoryActor::spawn("counter", None, Box::new(CounterActor::new()), Default::default())
                .await
                .unwrap();
            black_box(&actor);
            actor.destroy().await.unwrap();
        });
    });
}

/// Benchmark: spawn 10 actors in batch.
fn actor_spawn_batch_small(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    c.bench_function("actor_spawn_batch_small", |b| {
        b.to_async(&rt).iter(|| async {
            let mut actors = Vec::with_capacity(10);
            for _ in 0..10 {
                let actor = InMemoryActor::spawn("counter", None, Box::new(CounterActor::new()), Default::default())
                    .await
                    .unwrap();
                actors.push(actor);
            }
            black_box(&actors);
            for actor in actors {
                actor.destroy().await.unwrap();
            }
        });
    });
}

/// Benchmark: `sendAndReceive` throughput against a single in-memory actor.
fn actor_send_and_receive_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let actor = rt.block_on(async {
        InMemoryActor::spawn("counter", None, Box::new(CounterActor::new()), Default::default())
            .await
            .unwrap()
    });

    c.bench_function("actor_send_and_receive_throughput", |b| {
        b.to_async(&rt).iter(|| async {
            for i in 0..100i64 {
                let mut args = Args::new();
                args.push(i);
                let result = actor.send_and_receive("add", args).await.unwrap();
                black_box(result);
            }
        });
    });

    rt.block_on(actor.destroy()).unwrap();
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
        actor_spawn_single,
        actor_spawn_batch_small,
        actor_send_and_receive_throughput
}

criterion_main!(benches);
