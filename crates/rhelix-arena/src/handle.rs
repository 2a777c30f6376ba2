//! Arena allocation handles.
//!
//! An [`ArenaSlice`] encodes where an allocation lives inside an arena.
//! It is epoch-scoped: the `epoch` field lets the arena reject handles
//! issued before its last reset in O(1), without a lookup table.

use std::fmt;

use rhelix_core::ArenaId;

/// Location of a bump allocation within an arena.
///
/// Slices never expose raw addresses; the bytes are reached through the
/// owning [`Arena`](crate::Arena), which checks the epoch and bounds on
/// every access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct ArenaSlice {
    /// Arena this allocation was carved from.
    pub(crate) arena: ArenaId,
    /// Arena epoch when the allocation was made.
    pub(crate) epoch: u64,
    /// Byte offset from the start of the region. Always 8-byte aligned.
    pub(crate) offset: usize,
    /// Requested length in bytes (before alignment padding).
    pub(crate) len: usize,
}

impl ArenaSlice {
    pub(crate) fn new(arena: ArenaId, epoch: u64, offset: usize, len: usize) -> Self {
        Self {
            arena,
            epoch,
            offset,
            len,
        }
    }

    /// The arena this slice points into.
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// The arena epoch this slice was issued in.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Byte offset from the start of the arena's region.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Requested length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte of the allocation.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

impl fmt::Display for ArenaSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ArenaSlice({}, epoch={}, off={}, len={})",
            self.arena, self.epoch, self.offset, self.len
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let s = ArenaSlice::new(ArenaId(2), 5, 64, 10);
        assert_eq!(s.arena(), ArenaId(2));
        assert_eq!(s.epoch(), 5);
        assert_eq!(s.offset(), 64);
        assert_eq!(s.len(), 10);
        assert_eq!(s.end(), 74);
        assert!(!s.is_empty());
    }

    #[test]
    fn empty_slice() {
        assert!(ArenaSlice::new(ArenaId(0), 0, 0, 0).is_empty());
    }
}
