//! Benchmarks for outcome observation.

use criterion::{criterion_group, criterion_main, Criterion};
use cortex_runtime::domain::models::Outcome;
use serde_json::json;

fn bench_observe_numeric(c: &mut Criterion) {
    c.bench_function("observe_numeric_score", |b| {
        b.iter(|| {
            Outcome::observe(None, "latency_check", json!({"score": 100.0}), json!({"score": 104.0}), json!({}))
        });
    });
}

fn bench_observe_mixed_object(c: &mut Criterion) {
    let expected = json!({"value": 10.0, "label": "ok", "count": 3.0, "tag": "primary"});
    let actual = json!({"value": 10.5, "label": "ok", "count": 4.0, "tag": "secondary"});

    c.bench_function("observe_mixed_object", |b| {
        b.iter(|| Outcome::observe(None, "mixed", expected.clone(), actual.clone(), json!({})));
    });
}

criterion_group!(benches, bench_observe_numeric, bench_observe_mixed_object);
criterion_main!(benches);
