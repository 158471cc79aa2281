//! Benchmark: store hot path (commit, getter read, tracked render)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use tessel_core::render::TrackingContext;
use tessel_core::store::{Store, StoreOptions};

#[derive(Clone)]
struct Counter {
    count: i64,
}

fn counter_store() -> Store<Counter> {
    Store::new(
        StoreOptions::new()
            .state(Counter { count: 0 })
            .getter("doubleCount", |s: &Counter, _| json!(s.count * 2))
            .mutation("add", |s: &mut Counter, n| s.count += n.as_i64().unwrap_or(1)),
    )
    .expect("state is set")
}

fn benchmark_commit(c: &mut Criterion) {
    let store = counter_store();

    c.bench_function("commit", |b| {
        b.iter(|| store.commit(black_box("add"), Value::Null))
    });
}

fn benchmark_getter(c: &mut Criterion) {
    let store = counter_store();

    c.bench_function("getter_cached", |b| {
        b.iter(|| store.getter(black_box("doubleCount")))
    });

    c.bench_function("commit_then_getter", |b| {
        b.iter(|| {
            store.commit("add", Value::Null).ok();
            store.getter(black_box("doubleCount"))
        })
    });
}

fn benchmark_tracked_render(c: &mut Criterion) {
    let store = counter_store();
    let mut context = TrackingContext::from_fn(|| {});

    c.bench_function("tracked_render", |b| {
        b.iter(|| {
            let store = &store;
            context.track(|| store.getter("doubleCount").ok())
        })
    });
}

criterion_group!(
    benches,
    benchmark_commit,
    benchmark_getter,
    benchmark_tracked_render
);
criterion_main!(benches);
