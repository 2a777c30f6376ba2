//! Strongly-typed identifiers for heap objects and arenas.

use std::fmt;

/// Identifies a counted object in a memory manager's slot table.
///
/// An id is the pair of a slot index and the slot's generation at the
/// time the object was allocated. When an object is freed its slot
/// generation advances, so an id that outlives its object never aliases
/// a later occupant of the same slot: every lookup compares both halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    /// Create an id from its raw parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the owning heap.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation this id was issued for.
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Slot index as a `usize`, for indexing dense side tables.
    pub const fn slot(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}@{}", self.index, self.generation)
    }
}

/// Identifies an arena registered with a memory manager.
///
/// Arena ids are issued from a monotonic per-manager counter and never
/// reused, so an id of a destroyed arena stays unknown forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(pub u32);

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arena#{}", self.0)
    }
}

impl From<u32> for ArenaId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
