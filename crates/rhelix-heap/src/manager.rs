//! The memory manager: budgeted counted allocation, cycle collection and
//! arena ownership behind one explicit context value.
//!
//! Counted-heap state lives behind `Rc<RefCell<..>>` so that
//! [`ObjectRef`] handles can release their count on drop without
//! borrowing the manager. Arena operations need `&mut self` instead;
//! arena slices carry no ownership and never outlive a reset unnoticed.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use rhelix_arena::{Arena, ArenaRegistry, ArenaSlice};
use rhelix_core::{ArenaId, NoReferences, ObjectFlags, ObjectId, ReferenceTracer, HEADER_SIZE};

use crate::collector::{CollectionReport, CycleCollector};
use crate::config::ManagerConfig;
use crate::error::{raise, InvariantViolation, MemoryError};
use crate::handle::ObjectRef;
use crate::header::HeapObject;
use crate::heap::{Heap, Release};
use crate::stats::{MemoryStats, TeardownReport};

/// An ownership change requested by an [`ObjectRef`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Deferred {
    Retain(ObjectId),
    Release(ObjectId),
}

/// State shared between the manager and its handles.
pub(crate) struct Shared {
    abort_on_invariant: bool,
    state: RefCell<HeapState>,
    /// Ownership changes submitted while `state` was borrowed. Applied in
    /// order before the next heap operation.
    deferred: RefCell<Vec<Deferred>>,
}

impl Shared {
    fn reentrant(&self) -> MemoryError {
        raise(self.abort_on_invariant, InvariantViolation::ReentrantAccess)
    }

    fn state(&self) -> Result<RefMut<'_, HeapState>, MemoryError> {
        let mut state = self.state.try_borrow_mut().map_err(|_| self.reentrant())?;
        self.drain(&mut state);
        Ok(state)
    }

    fn drain(&self, state: &mut HeapState) {
        let pending = std::mem::take(&mut *self.deferred.borrow_mut());
        for op in pending {
            if state.apply(op).is_err() {
                // Already reported by `raise`; nobody is left to return it to.
                state.deferred_violations += 1;
            }
        }
    }

    /// Apply an ownership change now, or queue it if the heap is busy.
    pub(crate) fn submit(&self, op: Deferred) -> Result<(), MemoryError> {
        match self.state.try_borrow_mut() {
            Ok(mut state) => {
                self.drain(&mut state);
                let result = state.apply(op);
                if result.is_err() {
                    state.deferred_violations += 1;
                }
                result
            }
            Err(_) => {
                self.deferred.borrow_mut().push(op);
                Ok(())
            }
        }
    }

    /// Count of `id`, or `None` if it is not live or the heap is busy.
    /// Never raises and leaves queued changes queued.
    pub(crate) fn ownership_count(&self, id: ObjectId) -> Option<u32> {
        let state = self.state.try_borrow().ok()?;
        let header = state.heap.get(id)?.header();
        let count = header.ownership_count();
        if header.is_immortal() {
            return Some(count);
        }
        let queued = self.deferred.borrow();
        let pending = queued.iter().fold(i64::from(count), |n, op| match op {
            Deferred::Retain(d) if *d == id => n + 1,
            Deferred::Release(d) if *d == id => n - 1,
            _ => n,
        });
        u32::try_from(pending).ok()
    }
}

struct HeapState {
    config: ManagerConfig,
    heap: Heap,
    collector: CycleCollector,
    roots: IndexSet<ObjectId>,
    tracer: Box<dyn ReferenceTracer>,
    passes: u64,
    reclaimed_by_collector: u64,
    failed_allocations: u64,
    failed_passes: u64,
    /// Violations raised by handle clones and drops.
    deferred_violations: u64,
}

impl HeapState {
    fn violation(&self, violation: InvariantViolation) -> MemoryError {
        raise(self.config.abort_on_invariant_violation, violation)
    }

    fn stale(&self, object: ObjectId) -> MemoryError {
        self.violation(InvariantViolation::StaleHandle { object })
    }

    fn object(&self, id: ObjectId) -> Result<&HeapObject, MemoryError> {
        self.heap.get(id).ok_or_else(|| self.stale(id))
    }

    fn apply(&mut self, op: Deferred) -> Result<(), MemoryError> {
        let result = match op {
            Deferred::Retain(id) => self.heap.retain(id).map(drop),
            Deferred::Release(id) => self.heap.release(id).map(drop),
        };
        result.map_err(|v| self.violation(v))
    }

    fn allocate(&mut self, size: usize, flags: ObjectFlags) -> Result<ObjectId, MemoryError> {
        let Some(required) = HEADER_SIZE.checked_add(size) else {
            return Err(self.out_of_memory(usize::MAX));
        };
        if !self.fits(required) {
            self.collect_registered()?;
            if !self.fits(required) {
                return Err(self.out_of_memory(required));
            }
        }
        let id = self.heap.insert(size, flags)?;
        if self.heap.live_bytes() > self.config.collection_threshold_bytes {
            let result = self.trace_registered();
            self.settle_after_insert(id, result);
        }
        Ok(id)
    }

    /// Finish the proactive pass that follows a successful insert. The
    /// new object already has its owner, so a failed pass is reported
    /// but never undoes the allocation.
    fn settle_after_insert(
        &mut self,
        id: ObjectId,
        result: Result<CollectionReport, InvariantViolation>,
    ) {
        if let Err(err) = self.finish_pass(result) {
            tracing::warn!(object = %id, %err, "collection after allocation failed; allocation kept");
        }
    }

    fn fits(&self, required: usize) -> bool {
        self.heap
            .live_bytes()
            .checked_add(required)
            .is_some_and(|total| total <= self.config.budget_bytes)
    }

    fn out_of_memory(&mut self, requested: usize) -> MemoryError {
        self.failed_allocations += 1;
        let live = self.heap.live_bytes();
        let budget = self.config.budget_bytes;
        tracing::warn!(
            requested,
            live_bytes = live,
            budget_bytes = budget,
            "out of memory"
        );
        MemoryError::OutOfMemory {
            requested,
            live,
            budget,
        }
    }

    fn collect_registered(&mut self) -> Result<CollectionReport, MemoryError> {
        let result = self.trace_registered();
        self.finish_pass(result)
    }

    fn trace_registered(&mut self) -> Result<CollectionReport, InvariantViolation> {
        self.collector.collect(
            &mut self.heap,
            self.roots.iter().copied(),
            self.tracer.as_ref(),
        )
    }

    fn finish_pass(
        &mut self,
        result: Result<CollectionReport, InvariantViolation>,
    ) -> Result<CollectionReport, MemoryError> {
        self.passes += 1;
        let report = result.map_err(|v| {
            self.failed_passes += 1;
            self.violation(v)
        })?;
        self.reclaimed_by_collector += report.reclaimed_objects as u64;

        let pass = self.passes;
        let live_bytes = self.heap.live_bytes();
        if pass % self.config.log_every_n_passes == 0 {
            tracing::info!(
                pass,
                roots = report.roots,
                marked = report.marked,
                reclaimed = report.reclaimed_objects,
                reclaimed_bytes = report.reclaimed_bytes,
                live_bytes,
                "collection pass"
            );
        } else {
            tracing::trace!(
                pass,
                roots = report.roots,
                marked = report.marked,
                reclaimed = report.reclaimed_objects,
                live_bytes,
                "collection pass"
            );
        }
        if report.reclaimed_objects > 0 {
            tracing::debug!(
                pass,
                objects = report.reclaimed_objects,
                bytes = report.reclaimed_bytes,
                "reclaimed unreachable objects"
            );
        }
        Ok(report)
    }
}

/// One heap per runtime instance: counted objects under a byte budget,
/// a cycle collector, and a registry of bump-allocated arenas.
///
/// The manager is `!Send` and `!Sync`. Every operation runs to
/// completion on the owning thread; collection only happens inside
/// [`allocate`](Self::allocate) and the explicit collection calls.
///
/// Dropping the manager is equivalent to [`destroy`](Self::destroy):
/// every arena is released and every counted object, immortal ones
/// included, is freed. Outstanding [`ObjectRef`]s become inert.
pub struct MemoryManager {
    shared: Rc<Shared>,
    arenas: ArenaRegistry,
    config: ManagerConfig,
    torn_down: bool,
}

impl MemoryManager {
    /// Create a manager with the given budget and default settings.
    pub fn new(budget_bytes: usize) -> Result<Self, MemoryError> {
        Self::with_config(ManagerConfig::new(budget_bytes))
    }

    /// Create a manager from an explicit configuration.
    pub fn with_config(config: ManagerConfig) -> Result<Self, MemoryError> {
        config.validate()?;
        tracing::debug!(
            budget_bytes = config.budget_bytes,
            collection_threshold_bytes = config.collection_threshold_bytes,
            "memory manager created"
        );
        let state = HeapState {
            config: config.clone(),
            heap: Heap::new(),
            collector: CycleCollector::new(),
            roots: IndexSet::new(),
            tracer: Box::new(NoReferences),
            passes: 0,
            reclaimed_by_collector: 0,
            failed_allocations: 0,
            failed_passes: 0,
            deferred_violations: 0,
        };
        Ok(Self {
            shared: Rc::new(Shared {
                abort_on_invariant: config.abort_on_invariant_violation,
                state: RefCell::new(state),
                deferred: RefCell::new(Vec::new()),
            }),
            arenas: ArenaRegistry::new(),
            config,
            torn_down: false,
        })
    }

    /// The configuration this manager was created with.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub(crate) fn shared(&self) -> &Rc<Shared> {
        &self.shared
    }

    // ── Counted objects ──────────────────────────────────────────

    /// Allocate a zeroed object of `size` payload bytes, owned by the
    /// returned handle.
    ///
    /// If the budget cannot hold `HEADER_SIZE + size` more bytes, one
    /// collection pass runs first; if that does not free enough,
    /// [`MemoryError::OutOfMemory`] is returned and nothing is created.
    /// A successful allocation that leaves live bytes above the
    /// collection threshold triggers a pass before returning; if that
    /// pass fails, the violation is reported and the allocation stands.
    pub fn allocate(&self, size: usize) -> Result<ObjectRef, MemoryError> {
        let id = self.allocate_raw(size)?;
        Ok(ObjectRef::from_raw(self, id))
    }

    /// Like [`allocate`](Self::allocate), but returns the bare id. The
    /// caller owns one count and must [`release`](Self::release) it.
    pub fn allocate_raw(&self, size: usize) -> Result<ObjectId, MemoryError> {
        self.shared.state()?.allocate(size, ObjectFlags::empty())
    }

    /// Allocate an object that is never counted or collected. Only
    /// teardown frees it.
    pub fn allocate_immortal(&self, size: usize) -> Result<ObjectId, MemoryError> {
        self.shared.state()?.allocate(size, ObjectFlags::IMMORTAL)
    }

    /// Add an owner to `id`. Returns the new count; immortal objects
    /// report their frozen count.
    pub fn retain(&self, id: ObjectId) -> Result<u32, MemoryError> {
        let mut state = self.shared.state()?;
        state.heap.retain(id).map_err(|v| state.violation(v))
    }

    /// Remove an owner from `id`, freeing it when the count reaches
    /// zero.
    ///
    /// Releasing an object that was already freed is an invariant
    /// violation, never a no-op.
    pub fn release(&self, id: ObjectId) -> Result<Release, MemoryError> {
        let mut state = self.shared.state()?;
        state.heap.release(id).map_err(|v| state.violation(v))
    }

    /// Take an additional count on `id` and wrap it in a handle.
    pub fn handle(&self, id: ObjectId) -> Result<ObjectRef, MemoryError> {
        self.retain(id)?;
        Ok(ObjectRef::from_raw(self, id))
    }

    /// Exempt `id` from counting and collection for the rest of the
    /// manager's life.
    pub fn make_immortal(&self, id: ObjectId) -> Result<(), MemoryError> {
        let mut state = self.shared.state()?;
        match state.heap.get_mut(id) {
            Some(object) => {
                object.header.flags.insert(ObjectFlags::IMMORTAL);
                Ok(())
            }
            None => Err(state.stale(id)),
        }
    }

    /// Whether `id` names a live object.
    pub fn is_live(&self, id: ObjectId) -> bool {
        self.shared
            .state()
            .is_ok_and(|state| state.heap.contains(id))
    }

    /// Current ownership count of `id`.
    pub fn ownership_count(&self, id: ObjectId) -> Result<u32, MemoryError> {
        let state = self.shared.state()?;
        Ok(state.object(id)?.header().ownership_count())
    }

    /// Current flags of `id`.
    pub fn flags(&self, id: ObjectId) -> Result<ObjectFlags, MemoryError> {
        let state = self.shared.state()?;
        Ok(state.object(id)?.header().flags())
    }

    /// Payload length of `id` in bytes.
    pub fn payload_size(&self, id: ObjectId) -> Result<usize, MemoryError> {
        let state = self.shared.state()?;
        Ok(state.object(id)?.header().payload_size())
    }

    /// Borrow the payload of `id`.
    ///
    /// The guard borrows the whole heap: drop it before calling back into
    /// the manager. Handle drops while it is held are deferred.
    pub fn payload(&self, id: ObjectId) -> Result<Ref<'_, [u8]>, MemoryError> {
        drop(self.shared.state()?);
        let state = self
            .shared
            .state
            .try_borrow()
            .map_err(|_| self.shared.reentrant())?;
        Ref::filter_map(state, |s| s.heap.get(id).map(HeapObject::payload)).map_err(|state| {
            let err = state.stale(id);
            drop(state);
            err
        })
    }

    /// Mutably borrow the payload of `id`.
    ///
    /// Same borrowing rules as [`payload`](Self::payload).
    pub fn payload_mut(&self, id: ObjectId) -> Result<RefMut<'_, [u8]>, MemoryError> {
        let state = self.shared.state()?;
        RefMut::filter_map(state, |s| s.heap.get_mut(id).map(HeapObject::payload_mut)).map_err(
            |state| {
                let err = state.stale(id);
                drop(state);
                err
            },
        )
    }

    // ── Collection ───────────────────────────────────────────────

    /// Register `id` as reachable from outside the heap. Returns `false`
    /// if it was already registered.
    ///
    /// The root set owns one count on each registered object, so a root
    /// stays live until [`remove_root`](Self::remove_root) even when
    /// every other owner lets go.
    pub fn add_root(&self, id: ObjectId) -> Result<bool, MemoryError> {
        let mut state = self.shared.state()?;
        if !state.heap.contains(id) {
            return Err(state.stale(id));
        }
        if state.roots.contains(&id) {
            return Ok(false);
        }
        state.heap.retain(id).map_err(|v| state.violation(v))?;
        state.roots.insert(id);
        Ok(true)
    }

    /// Unregister a root and release the root set's count on it, which
    /// frees it if that was the last one. Returns `false` if it was not
    /// registered.
    pub fn remove_root(&self, id: ObjectId) -> Result<bool, MemoryError> {
        let mut state = self.shared.state()?;
        if !state.roots.shift_remove(&id) {
            return Ok(false);
        }
        if state.heap.contains(id) {
            state.heap.release(id).map_err(|v| state.violation(v))?;
        }
        Ok(true)
    }

    /// The registered roots in insertion order. A root only goes stale
    /// if its count was over-released.
    pub fn roots(&self) -> Result<Vec<ObjectId>, MemoryError> {
        let state = self.shared.state()?;
        Ok(state.roots.iter().copied().collect())
    }

    /// Install the tracer used by [`collect_cycles`](Self::collect_cycles)
    /// and by budget-triggered passes.
    ///
    /// Until one is set, objects are assumed to hold no references.
    pub fn set_tracer(&self, tracer: impl ReferenceTracer + 'static) -> Result<(), MemoryError> {
        self.shared.state()?.tracer = Box::new(tracer);
        Ok(())
    }

    /// Run one collection pass with the registered roots and tracer.
    pub fn collect_cycles(&self) -> Result<CollectionReport, MemoryError> {
        self.shared.state()?.collect_registered()
    }

    /// Run one collection pass with the given roots and tracer instead
    /// of the registered ones.
    ///
    /// Unlike registered roots, these ids own no count: they are marked
    /// for this pass, but one whose only owners turn out to be garbage is
    /// freed once the garbage releases its references.
    pub fn collect_with<I>(
        &self,
        roots: I,
        tracer: &dyn ReferenceTracer,
    ) -> Result<CollectionReport, MemoryError>
    where
        I: IntoIterator<Item = ObjectId>,
    {
        let mut state = self.shared.state()?;
        let state = &mut *state;
        let result = state.collector.collect(&mut state.heap, roots, tracer);
        state.finish_pass(result)
    }

    // ── Arenas ───────────────────────────────────────────────────

    /// Reserve and register a new arena of exactly `capacity` bytes.
    pub fn create_arena(&mut self, capacity: usize) -> Result<ArenaId, MemoryError> {
        Ok(self.arenas.create(capacity)?)
    }

    /// Bump-allocate `len` zeroed bytes from `arena`.
    pub fn arena_alloc(&mut self, arena: ArenaId, len: usize) -> Result<ArenaSlice, MemoryError> {
        Ok(self.arenas.alloc(arena, len)?)
    }

    /// Bump-allocate from the most recently created live arena.
    pub fn alloc_in_current_arena(&mut self, len: usize) -> Result<ArenaSlice, MemoryError> {
        Ok(self.arenas.alloc_current(len)?)
    }

    /// Rewind `arena`, invalidating every slice it has issued.
    pub fn reset_arena(&mut self, arena: ArenaId) -> Result<(), MemoryError> {
        Ok(self.arenas.reset(arena)?)
    }

    /// Release `arena` and its region. Returns the bytes released.
    pub fn destroy_arena(&mut self, arena: ArenaId) -> Result<usize, MemoryError> {
        Ok(self.arenas.destroy(arena)?)
    }

    /// Resolve a slice to its bytes.
    pub fn arena_bytes(&self, slice: &ArenaSlice) -> Result<&[u8], MemoryError> {
        Ok(self.arenas.bytes(slice)?)
    }

    /// Resolve a slice to its bytes, mutably.
    pub fn arena_bytes_mut(&mut self, slice: &ArenaSlice) -> Result<&mut [u8], MemoryError> {
        Ok(self.arenas.bytes_mut(slice)?)
    }

    /// Look up a live arena.
    pub fn arena(&self, arena: ArenaId) -> Result<&Arena, MemoryError> {
        Ok(self.arenas.get(arena)?)
    }

    /// The most recently created live arena.
    pub fn current_arena(&self) -> Option<ArenaId> {
        self.arenas.current()
    }

    /// The arena registry.
    pub fn arenas(&self) -> &ArenaRegistry {
        &self.arenas
    }

    // ── Observability ────────────────────────────────────────────

    /// Counted-heap bytes in use, headers included.
    pub fn allocated_bytes(&self) -> Result<usize, MemoryError> {
        Ok(self.shared.state()?.heap.live_bytes())
    }

    /// Snapshot every counter.
    pub fn stats(&self) -> Result<MemoryStats, MemoryError> {
        let state = self.shared.state()?;
        let acc = state.heap.accounting();
        Ok(MemoryStats {
            budget_bytes: state.config.budget_bytes,
            collection_threshold_bytes: state.config.collection_threshold_bytes,
            live_bytes: acc.live_bytes,
            live_objects: acc.live_objects,
            lifetime_allocated_bytes: acc.lifetime_allocated_bytes,
            lifetime_freed_bytes: acc.lifetime_freed_bytes,
            lifetime_allocations: acc.lifetime_allocations,
            lifetime_frees: acc.lifetime_frees,
            collection_passes: state.passes,
            objects_reclaimed_by_collector: state.reclaimed_by_collector,
            failed_allocations: state.failed_allocations,
            failed_passes: state.failed_passes,
            deferred_violations: state.deferred_violations,
            roots: state.roots.len(),
            arenas: self.arenas.len(),
            arena_reserved_bytes: self.arenas.reserved_bytes(),
            arena_used_bytes: self.arenas.used_bytes(),
        })
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Release every arena and free every counted object, immortal ones
    /// included.
    pub fn destroy(mut self) -> TeardownReport {
        self.teardown()
    }

    fn teardown(&mut self) -> TeardownReport {
        self.torn_down = true;
        let arena_bytes = self.arenas.reserved_bytes();
        let arenas = self.arenas.clear();
        let (objects, bytes) = match self.shared.state.try_borrow_mut() {
            Ok(mut state) => {
                state.roots.clear();
                state.heap.clear()
            }
            // A payload guard borrows the manager, so it cannot be alive here.
            Err(_) => (0, 0),
        };
        self.shared.deferred.borrow_mut().clear();
        let report = TeardownReport {
            arenas,
            arena_bytes,
            objects,
            bytes,
        };
        tracing::info!(
            arenas,
            arena_bytes,
            objects,
            bytes,
            "memory manager destroyed"
        );
        report
    }
}

impl Drop for MemoryManager {
    fn drop(&mut self) {
        if !self.torn_down {
            self.teardown();
        }
    }
}

impl fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("MemoryManager");
        s.field("config", &self.config);
        if let Ok(state) = self.shared.state.try_borrow() {
            s.field("live_bytes", &state.heap.live_bytes())
                .field("live_objects", &state.heap.len())
                .field("roots", &state.roots.len());
        }
        s.field("arenas", &self.arenas.len()).finish()
    }
}
