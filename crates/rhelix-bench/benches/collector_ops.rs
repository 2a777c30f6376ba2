//! Criterion benchmarks for cycle collection over seeded random graphs.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rhelix_bench::{build_graph, reference_profile, stress_profile, GraphProfile};
use rhelix_heap::{ManagerConfig, MemoryManager};
use rhelix_test_utils::GraphTracer;

fn setup(profile: GraphProfile, seed: u64) -> (MemoryManager, GraphTracer) {
    let budget = profile.heap_bytes() * 2;
    let mm = MemoryManager::with_config(ManagerConfig {
        collection_threshold_bytes: budget,
        ..ManagerConfig::new(budget)
    })
    .unwrap();
    let graph = GraphTracer::new();
    mm.set_tracer(graph.clone()).unwrap();
    let held = build_graph(&mm, &graph, profile, seed).unwrap();
    // The held counts are never released; teardown frees them.
    drop(held);
    (mm, graph)
}

/// Benchmark: one pass over a freshly built 1K-object graph.
fn bench_collect_reference(c: &mut Criterion) {
    c.bench_function("collect_reference_1k", |b| {
        b.iter_batched(
            || setup(reference_profile(), 42),
            |(mm, _graph)| {
                let report = mm.collect_cycles().unwrap();
                std::hint::black_box(report);
                mm
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: one pass over a freshly built 20K-object graph.
fn bench_collect_stress(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_stress");
    group.sample_size(10);
    group.bench_function("collect_stress_20k", |b| {
        b.iter_batched(
            || setup(stress_profile(), 42),
            |(mm, _graph)| {
                let report = mm.collect_cycles().unwrap();
                std::hint::black_box(report);
                mm
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

/// Benchmark: a pass over a graph with no garbage, i.e. steady-state
/// mark cost.
fn bench_collect_steady_state(c: &mut Criterion) {
    let (mm, _graph) = setup(reference_profile(), 7);
    mm.collect_cycles().unwrap();
    c.bench_function("collect_steady_state_1k", |b| {
        b.iter(|| std::hint::black_box(mm.collect_cycles().unwrap()));
    });
}

criterion_group!(
    benches,
    bench_collect_reference,
    bench_collect_stress,
    bench_collect_steady_state
);
criterion_main!(benches);
