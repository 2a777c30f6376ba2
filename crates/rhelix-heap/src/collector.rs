//! Mark-sweep cycle collection over the counted heap.
//!
//! Reference counting alone never reclaims a cycle: every member keeps a
//! count on the next. A collection pass finds objects no longer reachable
//! from anything outside the heap and reclaims them in bulk.
//!
//! # Algorithm
//!
//! 1. **Trace.** The [`ReferenceTracer`] is asked once per live object
//!    for its outgoing references. The edges are cached for the rest of
//!    the pass and each target's *internal in-degree* is tallied.
//! 2. **Roots.** An object is a root if it is in the caller's root set,
//!    is immortal, or has an ownership count above its internal
//!    in-degree. The last case means some count is held from outside
//!    the heap (a local variable, a runtime register) and the object must
//!    survive even though nobody registered it.
//! 3. **Mark.** Roots and everything reachable from them get the
//!    `MARKED` flag. The worklist is threaded through each header's
//!    `trace_link`; an object is marked and queued at most once, so
//!    cycles terminate.
//! 4. **Sweep.** Unmarked objects are garbage. Marks on survivors are
//!    cleared. References that garbage held on survivors are released,
//!    so a survivor's count again equals its true owner count; a
//!    survivor only kept alive by garbage is reclaimed in turn.
//!
//! Reachability never depends on pointer identity or layout, only on
//! slot ids, so a pass is deterministic for a given heap and tracer.

use rhelix_core::{ObjectFlags, ObjectId, RefBuf, ReferenceTracer};

use crate::error::InvariantViolation;
use crate::heap::{Heap, Release};

/// Summary of one collection pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Objects that seeded the mark phase.
    pub roots: usize,
    /// Objects found reachable.
    pub marked: usize,
    /// Objects reclaimed, including survivors freed by edge release.
    pub reclaimed_objects: usize,
    /// Bytes reclaimed, headers included.
    pub reclaimed_bytes: usize,
}

/// A reusable mark-sweep collector.
///
/// Holds per-slot scratch buffers so repeated passes over a stable heap
/// do not reallocate.
#[derive(Debug, Default)]
pub struct CycleCollector {
    /// Outgoing references per slot, valid for the current pass.
    edges: Vec<RefBuf>,
    /// Internal in-degree per slot.
    in_degree: Vec<u32>,
    /// Per-slot "reclaimed in this pass" flag.
    doomed: Vec<bool>,
    live: Vec<ObjectId>,
    garbage: Vec<ObjectId>,
    pending: Vec<ObjectId>,
}

impl CycleCollector {
    /// Create a collector with empty scratch space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one pass over `heap`.
    ///
    /// `roots` are marked but own no count: a root whose only owners are
    /// garbage is freed once the garbage releases its references. Callers
    /// that need roots kept hold a count on each, as the manager's root
    /// set does.
    ///
    /// `roots` may contain stale ids; they are skipped. Fails only if an
    /// ownership invariant turns out to be broken while releasing edges
    /// held by garbage.
    pub fn collect<I>(
        &mut self,
        heap: &mut Heap,
        roots: I,
        tracer: &dyn ReferenceTracer,
    ) -> Result<CollectionReport, InvariantViolation>
    where
        I: IntoIterator<Item = ObjectId>,
    {
        self.prepare(heap);
        let mut report = CollectionReport::default();

        // Trace.
        for (id, object) in heap.iter() {
            let out = &mut self.edges[id.slot()];
            tracer.trace(id, object.payload(), out);
            out.retain(|child| heap.contains(*child));
            for child in out.iter() {
                let degree = &mut self.in_degree[child.slot()];
                *degree = degree.saturating_add(1);
            }
        }

        // Roots.
        let mut worklist = None;
        for root in roots {
            if !heap.contains(root) {
                tracing::debug!(%root, "skipping stale root");
                continue;
            }
            if push(heap, &mut worklist, root) {
                report.roots += 1;
            }
        }
        for &id in &self.live {
            let Some(object) = heap.get(id) else { continue };
            let header = object.header();
            let pinned = header.is_immortal()
                || header.ownership_count() > self.in_degree[id.slot()];
            if pinned && push(heap, &mut worklist, id) {
                report.roots += 1;
            }
        }
        report.marked = report.roots;

        // Mark.
        while let Some(id) = worklist {
            worklist = heap
                .get_mut(id)
                .and_then(|object| object.header.trace_link.take());
            for &child in self.edges[id.slot()].iter() {
                if push(heap, &mut worklist, child) {
                    report.marked += 1;
                }
            }
        }

        // Sweep.
        for &id in &self.live {
            let Some(object) = heap.get_mut(id) else { continue };
            if object.header.flags.contains(ObjectFlags::MARKED) {
                object.header.flags.remove(ObjectFlags::MARKED);
            } else {
                self.doomed[id.slot()] = true;
                self.garbage.push(id);
            }
        }

        self.pending.extend_from_slice(&self.garbage);
        while let Some(source) = self.pending.pop() {
            for i in 0..self.edges[source.slot()].len() {
                let child = self.edges[source.slot()][i];
                if self.doomed[child.slot()] || !heap.contains(child) {
                    continue;
                }
                if let Release::Freed { bytes } = heap.release(child)? {
                    report.reclaimed_objects += 1;
                    report.reclaimed_bytes += bytes;
                    self.doomed[child.slot()] = true;
                    self.pending.push(child);
                }
            }
        }

        for &id in &self.garbage {
            if let Some(bytes) = heap.free(id) {
                report.reclaimed_objects += 1;
                report.reclaimed_bytes += bytes;
            }
        }

        Ok(report)
    }

    fn prepare(&mut self, heap: &Heap) {
        let slots = heap.slot_count();
        self.edges.resize_with(slots, RefBuf::new);
        for edges in &mut self.edges {
            edges.clear();
        }
        self.in_degree.clear();
        self.in_degree.resize(slots, 0);
        self.doomed.clear();
        self.doomed.resize(slots, false);
        self.live.clear();
        self.live.extend(heap.ids());
        self.garbage.clear();
        self.pending.clear();
    }
}

/// Mark `id` and thread it onto the worklist. Returns `false` if it was
/// already marked or is not live.
fn push(heap: &mut Heap, worklist: &mut Option<ObjectId>, id: ObjectId) -> bool {
    let Some(object) = heap.get_mut(id) else {
        return false;
    };
    let header = &mut object.header;
    if header.flags.contains(ObjectFlags::MARKED) {
        return false;
    }
    header.flags.insert(ObjectFlags::MARKED);
    header.trace_link = worklist.replace(id);
    true
}
