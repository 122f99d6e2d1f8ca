//! Performance benchmarks for dispatch and wakeups.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use topicwatch::{Dispatcher, Message, Payload, StoreConfig, WireFormat};

fn demo_message() -> Message {
    Message::new("a", Payload::new().with("1", 1.0).with("2", 2.0))
}

/// Decode, route and store one message with nobody waiting
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for format in [WireFormat::Json, WireFormat::MessagePack] {
        let config = StoreConfig::demo().with_wire_format(format);
        let (_store, dispatcher) = Dispatcher::with_store(&config).unwrap();
        let raw = format.encode(&demo_message()).unwrap();

        group.bench_with_input(
            BenchmarkId::new("format", format!("{format:?}")),
            &raw,
            |b, raw| {
                b.iter(|| {
                    black_box(dispatcher.dispatch(raw).unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Register waiters, write once, collect every result
fn bench_wake_waiters(c: &mut Criterion) {
    let mut group = c.benchmark_group("wake_waiters");
    let (store, dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();

    for waiters in [1, 16, 256] {
        group.bench_with_input(
            BenchmarkId::new("waiters", waiters),
            &waiters,
            |b, &count| {
                b.iter(|| {
                    let pending: Vec<_> = (0..count)
                        .map(|_| store.wait_any(["a", "b"]).unwrap())
                        .collect();
                    dispatcher.dispatch_message(demo_message()).unwrap();
                    for p in pending {
                        black_box(p.wait_timeout(Duration::from_secs(1)).unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

/// Register and cancel without any write
fn bench_register_cancel(c: &mut Criterion) {
    let (store, _dispatcher) = Dispatcher::with_store(&StoreConfig::demo()).unwrap();

    c.bench_function("register_cancel_any_3", |b| {
        b.iter(|| {
            let pending = store.wait_any(["a", "b", "c"]).unwrap();
            pending.cancel();
        });
    });
}

criterion_group!(
    benches,
    bench_dispatch,
    bench_wake_waiters,
    bench_register_cancel,
);

criterion_main!(benches);
