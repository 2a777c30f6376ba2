//! Test utilities and fixtures for RHelix development.
//!
//! Provides [`GraphTracer`], a [`ReferenceTracer`] backed by an edge map
//! the test mutates directly, and helpers that build the object graphs
//! collection tests need: cycles, chains and fan-outs whose only owners
//! are each other.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rhelix_core::{ObjectId, RefBuf, ReferenceTracer};
use rhelix_heap::{ManagerConfig, MemoryError, MemoryManager};

/// A shared, mutable object graph.
///
/// Clones share the same edges, so one copy can be installed with
/// [`MemoryManager::set_tracer`] while the test keeps linking objects
/// through another.
#[derive(Clone, Debug, Default)]
pub struct GraphTracer {
    edges: Rc<RefCell<HashMap<ObjectId, Vec<ObjectId>>>>,
}

impl GraphTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `from` reference `to`, taking a count on `to` for it.
    pub fn link(&self, mm: &MemoryManager, from: ObjectId, to: ObjectId) -> Result<(), MemoryError> {
        mm.retain(to)?;
        self.edges.borrow_mut().entry(from).or_default().push(to);
        Ok(())
    }

    /// Drop one `from -> to` reference and the count it held.
    ///
    /// Returns `false` if there was no such edge.
    pub fn unlink(
        &self,
        mm: &MemoryManager,
        from: ObjectId,
        to: ObjectId,
    ) -> Result<bool, MemoryError> {
        let removed = {
            let mut edges = self.edges.borrow_mut();
            let Some(children) = edges.get_mut(&from) else {
                return Ok(false);
            };
            match children.iter().position(|&c| c == to) {
                Some(i) => {
                    children.swap_remove(i);
                    true
                }
                None => false,
            }
        };
        if removed {
            mm.release(to)?;
        }
        Ok(removed)
    }

    /// Record an edge without touching counts.
    pub fn add_edge(&self, from: ObjectId, to: ObjectId) {
        self.edges.borrow_mut().entry(from).or_default().push(to);
    }

    /// Outgoing references of `from`.
    pub fn children(&self, from: ObjectId) -> Vec<ObjectId> {
        self.edges.borrow().get(&from).cloned().unwrap_or_default()
    }

    /// Total number of recorded edges.
    pub fn edge_count(&self) -> usize {
        self.edges.borrow().values().map(Vec::len).sum()
    }
}

impl ReferenceTracer for GraphTracer {
    fn trace(&self, object: ObjectId, _payload: &[u8], out: &mut RefBuf) {
        if let Some(children) = self.edges.borrow().get(&object) {
            out.extend(children.iter().copied());
        }
    }
}

/// A config that reports invariant violations as errors instead of
/// panicking, for tests that provoke them.
pub fn lenient_config(budget_bytes: usize) -> ManagerConfig {
    ManagerConfig {
        abort_on_invariant_violation: false,
        ..ManagerConfig::new(budget_bytes)
    }
}

/// A config whose threshold equals its budget, so collection only runs
/// on demand or when the budget would be exceeded.
pub fn on_demand_config(budget_bytes: usize) -> ManagerConfig {
    ManagerConfig {
        collection_threshold_bytes: budget_bytes,
        ..ManagerConfig::new(budget_bytes)
    }
}

/// Allocate `len` objects of `size` bytes linked into a ring and release
/// the external counts, leaving a cycle only the collector can reclaim.
pub fn orphaned_cycle(
    mm: &MemoryManager,
    graph: &GraphTracer,
    len: usize,
    size: usize,
) -> Result<Vec<ObjectId>, MemoryError> {
    let ids = ring(mm, graph, len, size)?;
    for &id in &ids {
        mm.release(id)?;
    }
    Ok(ids)
}

/// Allocate `len` objects of `size` bytes linked into a ring. Each object
/// keeps its external count; the caller owns those.
pub fn ring(
    mm: &MemoryManager,
    graph: &GraphTracer,
    len: usize,
    size: usize,
) -> Result<Vec<ObjectId>, MemoryError> {
    let ids = (0..len)
        .map(|_| mm.allocate_raw(size))
        .collect::<Result<Vec<_>, _>>()?;
    for (i, &id) in ids.iter().enumerate() {
        graph.link(mm, id, ids[(i + 1) % len])?;
    }
    Ok(ids)
}

/// Allocate a chain `head -> ... -> tail` of `len` objects. Only the head
/// keeps its external count; every other object is owned by its
/// predecessor.
pub fn chain(
    mm: &MemoryManager,
    graph: &GraphTracer,
    len: usize,
    size: usize,
) -> Result<Vec<ObjectId>, MemoryError> {
    let ids = (0..len)
        .map(|_| mm.allocate_raw(size))
        .collect::<Result<Vec<_>, _>>()?;
    for pair in ids.windows(2) {
        graph.link(mm, pair[0], pair[1])?;
        mm.release(pair[1])?;
    }
    Ok(ids)
}
