//! A walk through the memory manager with logging enabled.
//!
//! Run with `RUST_LOG=rhelix_heap=trace cargo run --example heap_tour`
//! to see every collection pass.

use rhelix_heap::{ManagerConfig, MemoryError, MemoryManager};
use rhelix_test_utils::{orphaned_cycle, GraphTracer};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), MemoryError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut mm = MemoryManager::with_config(ManagerConfig {
        log_every_n_passes: 5,
        ..ManagerConfig::new(16 * 1024)
    })?;
    let graph = GraphTracer::new();
    mm.set_tracer(graph.clone())?;

    // Counted objects: a long-lived root and a stream of garbage cycles.
    let root = mm.allocate(128)?;
    mm.add_root(root.id())?;
    for _ in 0..40 {
        orphaned_cycle(&mm, &graph, 3, 256)?;
    }
    tracing::info!(live_bytes = mm.allocated_bytes()?, "after cycle churn");

    // Arenas: scratch space with bulk reset.
    let arena = mm.create_arena(4096)?;
    for round in 0..3 {
        while mm.arena_alloc(arena, 100).is_ok() {}
        tracing::info!(round, used = mm.arena(arena)?.used(), "arena full, resetting");
        mm.reset_arena(arena)?;
    }

    // Budget exhaustion is an ordinary error.
    if let Err(err) = mm.allocate(32 * 1024) {
        tracing::warn!(%err, "allocation refused");
    }

    println!("{}", mm.stats()?);
    drop(root);
    let report = mm.destroy();
    println!("teardown: {report}");
    Ok(())
}
