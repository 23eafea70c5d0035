//! Benchmarks for memory recall scoring.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cortex_runtime::domain::models::{Memory, MemoryType};

fn embedding(dim: usize, seed: f32) -> Vec<f32> {
    (0..dim).map(|i| ((i as f32) + seed).sin()).collect()
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_similarity");
    for dim in [8, 64, 256] {
        let memory = Memory::new(MemoryType::Semantic, "benchmark content", 0.5).with_embedding(embedding(dim, 1.0));
        let query = embedding(dim, 2.0);
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |b, _| {
            b.iter(|| memory.cosine_similarity(&query));
        });
    }
    group.finish();
}

fn bench_similarity_score_sort(c: &mut Criterion) {
    let query = embedding(32, 0.0);
    let memories: Vec<Memory> = (0..200)
        .map(|i| Memory::new(MemoryType::Episodic, format!("entry {i}"), 0.5).with_embedding(embedding(32, i as f32)))
        .collect();

    c.bench_function("similarity_score_sort_200", |b| {
        b.iter(|| {
            let mut scored: Vec<(f32, &Memory)> = memories.iter().map(|m| (m.similarity_score(&query), m)).collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0));
            scored
        });
    });
}

criterion_group!(benches, bench_cosine_similarity, bench_similarity_score_sort);
criterion_main!(benches);
