//! Benchmark workloads for the RHelix memory manager.
//!
//! - [`GraphProfile`]: shape of a seeded random object graph
//! - [`build_graph`]: allocate and link a graph under a manager
//! - [`reference_profile`] / [`stress_profile`]: the standard sizes

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rhelix_core::ObjectId;
use rhelix_heap::{MemoryError, MemoryManager};
use rhelix_test_utils::GraphTracer;

/// Shape of a random object graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphProfile {
    /// Number of counted objects.
    pub objects: usize,
    /// Outgoing references per object.
    pub edges_per_object: usize,
    /// Payload bytes per object.
    pub payload: usize,
    /// One in `external_every` objects keeps its external count.
    pub external_every: usize,
}

impl GraphProfile {
    /// Bytes the graph occupies on the counted heap.
    pub fn heap_bytes(&self) -> usize {
        self.objects * (rhelix_core::HEADER_SIZE + self.payload)
    }
}

/// 1K objects, 2 edges each, 10% externally held.
pub fn reference_profile() -> GraphProfile {
    GraphProfile {
        objects: 1_000,
        edges_per_object: 2,
        payload: 32,
        external_every: 10,
    }
}

/// 20K objects, 4 edges each, 1% externally held.
pub fn stress_profile() -> GraphProfile {
    GraphProfile {
        objects: 20_000,
        edges_per_object: 4,
        payload: 32,
        external_every: 100,
    }
}

/// Allocate `profile.objects` objects and link each to
/// `profile.edges_per_object` random targets (self-edges allowed).
///
/// Every object's external count is then released except for one in
/// `external_every`; those ids are returned and the caller owns their
/// counts. Everything not reachable from them is cyclic garbage.
pub fn build_graph(
    mm: &MemoryManager,
    graph: &GraphTracer,
    profile: GraphProfile,
    seed: u64,
) -> Result<Vec<ObjectId>, MemoryError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let ids = (0..profile.objects)
        .map(|_| mm.allocate_raw(profile.payload))
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Ok(ids);
    }
    for &from in &ids {
        for _ in 0..profile.edges_per_object {
            let to = ids[rng.random_range(0..ids.len())];
            graph.link(mm, from, to)?;
        }
    }
    let mut held = Vec::new();
    for (i, &id) in ids.iter().enumerate() {
        if profile.external_every > 0 && i % profile.external_every == 0 {
            held.push(id);
        } else {
            mm.release(id)?;
        }
    }
    Ok(held)
}
