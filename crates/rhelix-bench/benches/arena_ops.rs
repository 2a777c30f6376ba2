//! Criterion micro-benchmarks for arena bump allocation and reset.

use criterion::{criterion_group, criterion_main, Criterion};
use rhelix_arena::{Arena, ArenaRegistry};
use rhelix_core::ArenaId;

/// Benchmark: 1K small bump allocations followed by a reset.
fn bench_bump_1k_then_reset(c: &mut Criterion) {
    let mut arena = Arena::new(ArenaId(0), 64 * 1024).unwrap();
    c.bench_function("arena_bump_1k_reset", |b| {
        b.iter(|| {
            for i in 0..1_000 {
                let slice = arena.alloc(i % 48).unwrap();
                std::hint::black_box(&slice);
            }
            arena.reset();
        });
    });
}

/// Benchmark: allocate, write and read back 256 bytes.
fn bench_write_read(c: &mut Criterion) {
    let mut arena = Arena::new(ArenaId(0), 1024 * 1024).unwrap();
    c.bench_function("arena_write_read_256b", |b| {
        b.iter(|| {
            if arena.remaining() < 256 {
                arena.reset();
            }
            let slice = arena.alloc(256).unwrap();
            arena.bytes_mut(&slice).unwrap().fill(0xAB);
            std::hint::black_box(arena.bytes(&slice).unwrap()[255]);
        });
    });
}

/// Benchmark: create and destroy an arena through the registry.
fn bench_registry_create_destroy(c: &mut Criterion) {
    let mut registry = ArenaRegistry::new();
    c.bench_function("arena_registry_create_destroy_4k", |b| {
        b.iter(|| {
            let id = registry.create(4096).unwrap();
            std::hint::black_box(registry.destroy(id).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_bump_1k_then_reset,
    bench_write_read,
    bench_registry_create_destroy
);
criterion_main!(benches);
