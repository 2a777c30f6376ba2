//! Insertion-ordered ownership of a manager's arenas.
//!
//! [`ArenaRegistry`] is the sole owner of every [`Arena`] created through
//! a memory manager. Arenas are kept in creation order; destroying one
//! preserves the relative order of the rest, so "the current arena" is
//! always the most recently created arena still alive.

use indexmap::IndexMap;
use rhelix_core::ArenaId;

use crate::arena::Arena;
use crate::error::ArenaError;
use crate::handle::ArenaSlice;

/// Registry of live arenas keyed by [`ArenaId`].
#[derive(Debug, Default)]
pub struct ArenaRegistry {
    arenas: IndexMap<ArenaId, Arena>,
    /// Next id to issue. Ids are never reused.
    next_id: u32,
}

impl ArenaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a new arena of `capacity` bytes and register it.
    pub fn create(&mut self, capacity: usize) -> Result<ArenaId, ArenaError> {
        let id = ArenaId(self.next_id);
        let next = self.next_id.checked_add(1).ok_or(ArenaError::InvalidConfig {
            reason: "arena id counter overflow".into(),
        })?;
        let arena = Arena::new(id, capacity)?;
        self.next_id = next;
        tracing::trace!(arena = %id, capacity = arena.capacity(), "arena created");
        self.arenas.insert(id, arena);
        Ok(id)
    }

    /// Remove an arena and release its region.
    ///
    /// Every slice previously handed out from the arena becomes invalid;
    /// later lookups report [`ArenaError::UnknownArena`]. Returns the
    /// capacity that was released.
    pub fn destroy(&mut self, id: ArenaId) -> Result<usize, ArenaError> {
        let arena = self
            .arenas
            .shift_remove(&id)
            .ok_or(ArenaError::UnknownArena { arena: id })?;
        tracing::trace!(arena = %id, capacity = arena.capacity(), "arena destroyed");
        Ok(arena.capacity())
    }

    /// Look up an arena.
    pub fn get(&self, id: ArenaId) -> Result<&Arena, ArenaError> {
        self.arenas
            .get(&id)
            .ok_or(ArenaError::UnknownArena { arena: id })
    }

    /// Look up an arena mutably.
    pub fn get_mut(&mut self, id: ArenaId) -> Result<&mut Arena, ArenaError> {
        self.arenas
            .get_mut(&id)
            .ok_or(ArenaError::UnknownArena { arena: id })
    }

    /// Bump-allocate `len` bytes from the given arena.
    pub fn alloc(&mut self, id: ArenaId, len: usize) -> Result<ArenaSlice, ArenaError> {
        self.get_mut(id)?.alloc(len)
    }

    /// Rewind the given arena, invalidating all of its allocations.
    pub fn reset(&mut self, id: ArenaId) -> Result<(), ArenaError> {
        let arena = self.get_mut(id)?;
        arena.reset();
        tracing::trace!(arena = %id, epoch = arena.epoch(), "arena reset");
        Ok(())
    }

    /// Resolve a slice to its bytes through the owning arena.
    pub fn bytes(&self, slice: &ArenaSlice) -> Result<&[u8], ArenaError> {
        self.get(slice.arena())?.bytes(slice)
    }

    /// Resolve a slice to its bytes mutably through the owning arena.
    pub fn bytes_mut(&mut self, slice: &ArenaSlice) -> Result<&mut [u8], ArenaError> {
        self.get_mut(slice.arena())?.bytes_mut(slice)
    }

    /// The most recently created arena that is still alive.
    pub fn current(&self) -> Option<ArenaId> {
        self.arenas.last().map(|(&id, _)| id)
    }

    /// Bump-allocate from the [`current`](ArenaRegistry::current) arena.
    pub fn alloc_current(&mut self, len: usize) -> Result<ArenaSlice, ArenaError> {
        self.arenas
            .last_mut()
            .ok_or(ArenaError::NoArena)?
            .1
            .alloc(len)
    }

    /// Whether `id` names a live arena.
    pub fn contains(&self, id: ArenaId) -> bool {
        self.arenas.contains_key(&id)
    }

    /// Number of live arenas.
    pub fn len(&self) -> usize {
        self.arenas.len()
    }

    /// Returns `true` if no arena is registered.
    pub fn is_empty(&self) -> bool {
        self.arenas.is_empty()
    }

    /// Iterate over live arenas in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Arena> {
        self.arenas.values()
    }

    /// Total capacity reserved across all live arenas.
    pub fn reserved_bytes(&self) -> usize {
        self.arenas.values().map(Arena::capacity).sum()
    }

    /// Total bytes handed out across all live arenas.
    pub fn used_bytes(&self) -> usize {
        self.arenas.values().map(Arena::used).sum()
    }

    /// Release every arena. Returns how many were released.
    pub fn clear(&mut self) -> usize {
        let released = self.arenas.len();
        self.arenas.clear();
        released
    }
}
