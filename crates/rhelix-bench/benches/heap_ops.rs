//! Criterion micro-benchmarks for counted allocation, retain/release and
//! handle churn.

use criterion::{criterion_group, criterion_main, Criterion};
use rhelix_heap::{ManagerConfig, MemoryManager};

/// A manager whose threshold equals its budget, so allocation never
/// triggers a pass on its own.
fn quiet_manager() -> MemoryManager {
    let budget = 64 * 1024 * 1024;
    MemoryManager::with_config(ManagerConfig {
        collection_threshold_bytes: budget,
        ..ManagerConfig::new(budget)
    })
    .unwrap()
}

/// Benchmark: allocate and immediately release a 64-byte object.
fn bench_alloc_release(c: &mut Criterion) {
    let mm = quiet_manager();
    c.bench_function("heap_alloc_release_64b", |b| {
        b.iter(|| {
            let id = mm.allocate_raw(std::hint::black_box(64)).unwrap();
            mm.release(id).unwrap();
        });
    });
}

/// Benchmark: retain + release pair on a long-lived object.
fn bench_retain_release(c: &mut Criterion) {
    let mm = quiet_manager();
    let id = mm.allocate_raw(64).unwrap();
    c.bench_function("heap_retain_release", |b| {
        b.iter(|| {
            mm.retain(std::hint::black_box(id)).unwrap();
            mm.release(id).unwrap();
        });
    });
}

/// Benchmark: clone + drop of an RAII handle.
fn bench_handle_clone_drop(c: &mut Criterion) {
    let mm = quiet_manager();
    let obj = mm.allocate(64).unwrap();
    c.bench_function("heap_handle_clone_drop", |b| {
        b.iter(|| {
            let copy = obj.clone();
            std::hint::black_box(&copy);
        });
    });
}

/// Benchmark: 1K live objects allocated then released in bulk.
fn bench_bulk_churn(c: &mut Criterion) {
    let mm = quiet_manager();
    let mut ids = Vec::with_capacity(1_000);
    c.bench_function("heap_bulk_churn_1k", |b| {
        b.iter(|| {
            for i in 0..1_000 {
                ids.push(mm.allocate_raw(i % 128).unwrap());
            }
            for id in ids.drain(..) {
                mm.release(id).unwrap();
            }
        });
    });
}

criterion_group!(
    benches,
    bench_alloc_release,
    bench_retain_release,
    bench_handle_clone_drop,
    bench_bulk_churn
);
criterion_main!(benches);
