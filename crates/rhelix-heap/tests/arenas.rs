//! Integration tests: arena lifecycle through the memory manager.

use rhelix_arena::ArenaError;
use rhelix_core::ARENA_ALIGNMENT;
use rhelix_heap::{MemoryError, MemoryManager};

#[test]
fn third_allocation_exhausts_256_byte_arena() {
    let mut mm = MemoryManager::new(4096).unwrap();
    let arena = mm.create_arena(256).unwrap();
    let first = mm.arena_alloc(arena, 100).unwrap();
    let second = mm.arena_alloc(arena, 100).unwrap();
    assert_eq!(first.offset(), 0);
    assert_eq!(second.offset(), 104);

    let err = mm.arena_alloc(arena, 100).unwrap_err();
    assert_eq!(
        err,
        MemoryError::Arena(ArenaError::Exhausted {
            requested: 104,
            remaining: 48,
        })
    );
    assert!(err.is_recoverable());
    assert_eq!(mm.arena(arena).unwrap().used(), 208);
}

#[test]
fn reset_restores_full_capacity_and_invalidates_slices() {
    let mut mm = MemoryManager::new(4096).unwrap();
    let arena = mm.create_arena(256).unwrap();
    let old = mm.arena_alloc(arena, 200).unwrap();
    mm.arena_bytes_mut(&old).unwrap().fill(0xFF);

    mm.reset_arena(arena).unwrap();
    assert!(matches!(
        mm.arena_bytes(&old),
        Err(MemoryError::Arena(ArenaError::StaleAllocation { .. }))
    ));

    let full = mm.arena_alloc(arena, 256).unwrap();
    assert!(mm.arena_bytes(&full).unwrap().iter().all(|&b| b == 0));
}

#[test]
fn allocations_are_aligned_and_disjoint() {
    let mut mm = MemoryManager::new(4096).unwrap();
    let arena = mm.create_arena(1024).unwrap();
    let sizes = [1, 7, 8, 9, 15, 16, 33, 0, 64];
    let slices: Vec<_> = sizes
        .iter()
        .map(|&n| mm.arena_alloc(arena, n).unwrap())
        .collect();
    for pair in slices.windows(2) {
        assert_eq!(pair[0].offset() % ARENA_ALIGNMENT, 0);
        assert!(pair[0].end() <= pair[1].offset());
    }
    for (i, slice) in slices.iter().enumerate() {
        mm.arena_bytes_mut(slice).unwrap().fill(i as u8 + 1);
    }
    for (i, slice) in slices.iter().enumerate() {
        assert!(mm.arena_bytes(slice).unwrap().iter().all(|&b| b == i as u8 + 1));
    }
}

#[test]
fn destroyed_arena_rejects_its_slices() {
    let mut mm = MemoryManager::new(4096).unwrap();
    let a = mm.create_arena(64).unwrap();
    let b = mm.create_arena(64).unwrap();
    let slice = mm.arena_alloc(a, 8).unwrap();
    assert_eq!(mm.destroy_arena(a).unwrap(), 64);
    assert_eq!(
        mm.arena_bytes(&slice),
        Err(MemoryError::Arena(ArenaError::UnknownArena { arena: a }))
    );
    assert_eq!(mm.current_arena(), Some(b));
    assert_eq!(mm.arenas().len(), 1);
}

#[test]
fn current_arena_fallback() {
    let mut mm = MemoryManager::new(4096).unwrap();
    assert_eq!(
        mm.alloc_in_current_arena(8),
        Err(MemoryError::Arena(ArenaError::NoArena))
    );
    let arena = mm.create_arena(32).unwrap();
    let slice = mm.alloc_in_current_arena(8).unwrap();
    assert_eq!(slice.arena(), arena);
    // Exhaustion is the caller's cue to open a fresh arena.
    assert!(mm.alloc_in_current_arena(32).is_err());
    let next = mm.create_arena(32).unwrap();
    assert_eq!(mm.alloc_in_current_arena(32).unwrap().arena(), next);
}

#[test]
fn zero_capacity_arena_rejected() {
    let mut mm = MemoryManager::new(4096).unwrap();
    assert!(matches!(
        mm.create_arena(0),
        Err(MemoryError::Arena(ArenaError::InvalidConfig { .. }))
    ));
    assert_eq!(mm.current_arena(), None);
}

#[test]
fn teardown_releases_arenas() {
    let mut mm = MemoryManager::new(4096).unwrap();
    mm.create_arena(64).unwrap();
    mm.create_arena(128).unwrap();
    let stats = mm.stats().unwrap();
    assert_eq!(stats.arenas, 2);
    assert_eq!(stats.arena_reserved_bytes, 192);
    let report = mm.destroy();
    assert_eq!(report.arenas, 2);
    assert_eq!(report.arena_bytes, 192);
    assert_eq!(report.objects, 0);
}

#[test]
fn unaligned_capacity_is_reported_as_requested() {
    let mut mm = MemoryManager::new(4096).unwrap();
    let arena = mm.create_arena(250).unwrap();
    assert_eq!(mm.arena(arena).unwrap().capacity(), 250);
    assert_eq!(mm.stats().unwrap().arena_reserved_bytes, 250);

    let whole = mm.arena_alloc(arena, 250).unwrap();
    assert_eq!(mm.arena_bytes(&whole).unwrap().len(), 250);
    assert!(mm.arena_alloc(arena, 1).is_err());

    mm.reset_arena(arena).unwrap();
    assert!(mm.arena_alloc(arena, 250).is_ok());
    assert_eq!(mm.destroy_arena(arena).unwrap(), 250);
}
