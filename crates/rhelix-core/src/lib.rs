//! Core types and traits for the RHelix memory manager.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the arena and heap crates: object and arena
//! identifiers, the object flag set, header layout constants, and the
//! [`ReferenceTracer`] trait through which a language runtime exposes
//! the references its objects hold.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod flags;
pub mod id;
pub mod layout;
pub mod traits;

pub use flags::ObjectFlags;
pub use id::{ArenaId, ObjectId};
pub use layout::{align_up, ARENA_ALIGNMENT, HEADER_SIZE};
pub use traits::{NoReferences, RefBuf, ReferenceTracer};
