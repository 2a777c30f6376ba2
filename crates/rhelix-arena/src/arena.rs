//! A single contiguous region with bump allocation.
//!
//! An [`Arena`] owns a fixed-capacity `Vec<u8>` and a cursor that only
//! moves forward until [`Arena::reset`] rewinds it. Allocations start on
//! 8-byte boundaries and are zeroed; they are never freed individually.

use rhelix_core::{align_up, ArenaId, ARENA_ALIGNMENT};

use crate::error::ArenaError;
use crate::handle::ArenaSlice;

/// A fixed-capacity bump-allocated region.
///
/// The region spans offsets `0..capacity`. The cursor satisfies
/// `0 <= cursor <= capacity` at all times; everything below the cursor
/// has been handed out in the current epoch.
///
/// Resetting rewinds the cursor and advances the epoch. Every
/// [`ArenaSlice`] issued before the reset is stale from then on and is
/// rejected by [`bytes`](Arena::bytes) and [`bytes_mut`](Arena::bytes_mut).
#[derive(Debug)]
pub struct Arena {
    id: ArenaId,
    /// Backing storage, allocated to full capacity at creation.
    data: Vec<u8>,
    /// Bump pointer: offset of the next free byte.
    cursor: usize,
    /// Number of resets so far.
    epoch: u64,
}

impl Arena {
    /// Reserve a new region of exactly `capacity` bytes.
    ///
    /// The reservation is fallible: if the allocator cannot provide the
    /// region, [`ArenaError::ReservationFailed`] is returned and nothing
    /// is left allocated. A zero capacity is rejected.
    pub fn new(id: ArenaId, capacity: usize) -> Result<Self, ArenaError> {
        if capacity == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "arena capacity must be non-zero".into(),
            });
        }
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| ArenaError::ReservationFailed { capacity })?;
        data.resize(capacity, 0);
        Ok(Self {
            id,
            data,
            cursor: 0,
            epoch: 0,
        })
    }

    /// Bump-allocate `len` bytes.
    ///
    /// The request is rounded up to [`ARENA_ALIGNMENT`] and the cursor
    /// advances by the aligned size, stopping at the end of the region:
    /// the last allocation may use the unaligned tail of a region whose
    /// capacity is not a multiple of the alignment. Returns
    /// [`ArenaError::Exhausted`] if the request does not fit; the cursor
    /// is left untouched in that case.
    pub fn alloc(&mut self, len: usize) -> Result<ArenaSlice, ArenaError> {
        let remaining = self.remaining();
        let aligned = align_up(len, ARENA_ALIGNMENT).ok_or(ArenaError::Exhausted {
            requested: len,
            remaining,
        })?;
        let offset = self.cursor;
        // An unaligned cursor only happens once the tail has been handed out.
        if len > remaining || offset % ARENA_ALIGNMENT != 0 {
            return Err(ArenaError::Exhausted {
                requested: aligned,
                remaining,
            });
        }
        self.cursor = offset + aligned.min(remaining);
        // The region may hold bytes from a previous epoch.
        self.data[offset..self.cursor].fill(0);
        Ok(ArenaSlice::new(self.id, self.epoch, offset, len))
    }

    /// Borrow the bytes of a live allocation.
    pub fn bytes(&self, slice: &ArenaSlice) -> Result<&[u8], ArenaError> {
        self.check(slice)?;
        Ok(&self.data[slice.offset..slice.end()])
    }

    /// Mutably borrow the bytes of a live allocation.
    pub fn bytes_mut(&mut self, slice: &ArenaSlice) -> Result<&mut [u8], ArenaError> {
        self.check(slice)?;
        Ok(&mut self.data[slice.offset..slice.end()])
    }

    fn check(&self, slice: &ArenaSlice) -> Result<(), ArenaError> {
        if slice.arena != self.id {
            return Err(ArenaError::UnknownArena { arena: slice.arena });
        }
        if slice.epoch != self.epoch {
            return Err(ArenaError::StaleAllocation {
                arena: self.id,
                epoch: slice.epoch,
                current: self.epoch,
            });
        }
        match slice.offset.checked_add(slice.len) {
            Some(end) if end <= self.cursor => Ok(()),
            _ => Err(ArenaError::OutOfBounds {
                arena: self.id,
                offset: slice.offset,
                len: slice.len,
                used: self.cursor,
            }),
        }
    }

    /// Rewind the cursor to the start of the region in O(1).
    ///
    /// All previous allocations become invalid. The backing memory is
    /// NOT zeroed here; [`alloc`](Arena::alloc) zeroes what it hands out.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.epoch += 1;
    }

    /// The id this arena was registered under.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Current epoch (number of resets so far).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Bytes handed out in the current epoch, alignment padding included.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Total capacity of the region in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes left between the cursor and the end of the region.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(capacity: usize) -> Arena {
        Arena::new(ArenaId(0), capacity).unwrap()
    }

    #[test]
    fn alloc_returns_zeroed_bytes() {
        let mut a = arena(1024);
        let s = a.alloc(10).unwrap();
        assert_eq!(s.offset(), 0);
        assert_eq!(a.bytes(&s).unwrap().len(), 10);
        assert!(a.bytes(&s).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn sequential_allocs_are_aligned_and_disjoint() {
        let mut a = arena(1024);
        let s1 = a.alloc(3).unwrap();
        let s2 = a.alloc(9).unwrap();
        let s3 = a.alloc(1).unwrap();
        assert_eq!(s1.offset(), 0);
        assert_eq!(s2.offset(), 8);
        assert_eq!(s3.offset(), 24);
        assert_eq!(a.used(), 32);
    }

    #[test]
    fn third_hundred_byte_alloc_exhausts_256_byte_arena() {
        let mut a = arena(256);
        let s1 = a.alloc(100).unwrap();
        let s2 = a.alloc(100).unwrap();
        assert_eq!(s1.offset(), 0);
        assert_eq!(s2.offset(), 104);
        assert_eq!(a.used(), 208);

        let err = a.alloc(100).unwrap_err();
        assert_eq!(
            err,
            ArenaError::Exhausted {
                requested: 104,
                remaining: 48,
            }
        );
        assert_eq!(a.used(), 208, "failed alloc must not move the cursor");
    }

    #[test]
    fn exact_fit_succeeds() {
        let mut a = arena(64);
        assert!(a.alloc(64).is_ok());
        assert_eq!(a.remaining(), 0);
        assert!(a.alloc(1).is_err());
    }

    #[test]
    fn reset_allows_full_capacity_alloc() {
        let mut a = arena(256);
        a.alloc(200).unwrap();
        a.reset();
        assert_eq!(a.used(), 0);
        let s = a.alloc(256).unwrap();
        assert_eq!(s.len(), 256);
    }

    #[test]
    fn reset_rejects_stale_slices() {
        let mut a = arena(128);
        let s = a.alloc(16).unwrap();
        a.reset();
        assert_eq!(
            a.bytes(&s),
            Err(ArenaError::StaleAllocation {
                arena: ArenaId(0),
                epoch: 0,
                current: 1,
            })
        );
    }

    #[test]
    fn realloc_after_reset_is_zeroed() {
        let mut a = arena(64);
        let s = a.alloc(8).unwrap();
        a.bytes_mut(&s).unwrap().fill(0xAB);
        a.reset();
        let s = a.alloc(8).unwrap();
        assert!(a.bytes(&s).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn written_bytes_read_back() {
        let mut a = arena(64);
        let s = a.alloc(4).unwrap();
        a.bytes_mut(&s).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(a.bytes(&s).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn slice_from_other_arena_rejected() {
        let mut a = arena(64);
        let mut b = Arena::new(ArenaId(1), 64).unwrap();
        let s = b.alloc(8).unwrap();
        a.alloc(8).unwrap();
        assert_eq!(
            a.bytes(&s),
            Err(ArenaError::UnknownArena { arena: ArenaId(1) })
        );
    }

    #[test]
    fn capacity_is_kept_as_requested() {
        let mut a = arena(250);
        assert_eq!(a.capacity(), 250);
        let s = a.alloc(250).unwrap();
        assert_eq!(s.len(), 250);
        assert_eq!(a.used(), 250);
        assert_eq!(a.remaining(), 0);
    }

    #[test]
    fn tail_allocation_uses_unaligned_end() {
        let mut a = arena(20);
        let s1 = a.alloc(8).unwrap();
        let s2 = a.alloc(12).unwrap();
        assert_eq!(s1.offset(), 0);
        assert_eq!(s2.offset(), 8);
        assert_eq!(a.used(), 20);
        assert_eq!(
            a.alloc(0).unwrap_err(),
            ArenaError::Exhausted {
                requested: 0,
                remaining: 0,
            }
        );
    }

    #[test]
    fn request_larger_than_tail_is_exhausted() {
        let mut a = arena(20);
        a.alloc(8).unwrap();
        assert_eq!(
            a.alloc(13).unwrap_err(),
            ArenaError::Exhausted {
                requested: 16,
                remaining: 12,
            }
        );
        assert_eq!(a.used(), 8);
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(
            Arena::new(ArenaId(0), 0),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn impossible_reservation_fails_cleanly() {
        assert_eq!(
            Arena::new(ArenaId(0), usize::MAX).unwrap_err(),
            ArenaError::ReservationFailed {
                capacity: usize::MAX,
            }
        );
    }

    #[test]
    fn huge_request_is_exhaustion_not_panic() {
        let mut a = arena(64);
        assert!(matches!(
            a.alloc(usize::MAX),
            Err(ArenaError::Exhausted { .. })
        ));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn allocations_aligned_disjoint_and_bounded(
                capacity in 1usize..4096,
                sizes in proptest::collection::vec(0usize..300, 1..40),
            ) {
                let mut a = Arena::new(ArenaId(0), capacity).unwrap();
                let mut slices = Vec::new();
                for len in sizes {
                    if let Ok(s) = a.alloc(len) {
                        slices.push(s);
                    }
                }
                let mut handed_out = 0usize;
                for (i, s) in slices.iter().enumerate() {
                    prop_assert_eq!(s.offset() % ARENA_ALIGNMENT, 0);
                    prop_assert!(s.end() <= capacity);
                    handed_out += s.len();
                    if let Some(next) = slices.get(i + 1) {
                        prop_assert!(s.end() <= next.offset());
                    }
                }
                prop_assert!(handed_out <= capacity);
                prop_assert_eq!(a.capacity(), capacity);
                prop_assert!(a.used() <= a.capacity());
            }

            #[test]
            fn reset_restores_full_capacity(
                capacity in 1usize..4096,
                sizes in proptest::collection::vec(0usize..300, 0..20),
            ) {
                let mut a = Arena::new(ArenaId(0), capacity).unwrap();
                for len in sizes {
                    let _ = a.alloc(len);
                }
                a.reset();
                prop_assert!(a.alloc(capacity).is_ok());
            }
        }
    }
}
