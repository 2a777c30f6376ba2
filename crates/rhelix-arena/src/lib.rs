//! Bump-pointer arena regions for the RHelix memory manager.
//!
//! Arenas are the fast path of the hybrid allocator: a fixed region, a
//! cursor that only moves forward, and bulk reclamation by reset or
//! destruction. Objects carved from an arena have no individual
//! ownership.
//!
//! # Architecture
//!
//! ```text
//! ArenaRegistry (owned by the memory manager)
//! └── IndexMap<ArenaId, Arena> (creation order)
//!     └── Arena: Vec<u8> region + cursor + epoch
//!         └── ArenaSlice { arena, epoch, offset, len }
//! ```
//!
//! # Invalidation
//!
//! Allocations are never addressed by raw pointer. An [`ArenaSlice`]
//! records the epoch it was issued in; [`Arena::reset`] advances the
//! epoch, so every slice from before the reset is rejected with
//! [`ArenaError::StaleAllocation`] instead of silently aliasing new data.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod error;
pub mod handle;
pub mod registry;

pub use arena::Arena;
pub use error::ArenaError;
pub use handle::ArenaSlice;
pub use registry::ArenaRegistry;
