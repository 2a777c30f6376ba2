//! RHelix: the hybrid memory manager of the RHelix language runtime.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all RHelix sub-crates. For most users, adding `rhelix` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use rhelix::prelude::*;
//! use std::cell::RefCell;
//! use std::collections::HashMap;
//! use std::rc::Rc;
//!
//! // The runtime's object graph: which objects each object references.
//! let edges: Rc<RefCell<HashMap<ObjectId, Vec<ObjectId>>>> = Rc::default();
//! let graph = Rc::clone(&edges);
//! let tracer = move |obj: ObjectId, _payload: &[u8], out: &mut RefBuf| {
//!     if let Some(children) = graph.borrow().get(&obj) {
//!         out.extend(children.iter().copied());
//!     }
//! };
//!
//! let mm = MemoryManager::new(64 * 1024).unwrap();
//! mm.set_tracer(tracer).unwrap();
//!
//! // Two objects that reference each other. Each reference owns a count.
//! let a = mm.allocate_raw(16).unwrap();
//! let b = mm.allocate_raw(16).unwrap();
//! mm.retain(b).unwrap();
//! mm.retain(a).unwrap();
//! edges.borrow_mut().insert(a, vec![b]);
//! edges.borrow_mut().insert(b, vec![a]);
//!
//! // Drop the external counts: counting alone cannot free the pair.
//! mm.release(a).unwrap();
//! mm.release(b).unwrap();
//! assert!(mm.is_live(a));
//!
//! let report = mm.collect_cycles().unwrap();
//! assert_eq!(report.reclaimed_objects, 2);
//! assert_eq!(mm.allocated_bytes().unwrap(), 0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `rhelix-core` | IDs, object flags, layout constants, the tracer trait |
//! | [`arena`] | `rhelix-arena` | Bump regions, epoch-checked slices, the arena registry |
//! | [`heap`] | `rhelix-heap` | Counted heap, cycle collector, memory manager, handles |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`rhelix-core`).
///
/// Contains [`types::ObjectId`], [`types::ObjectFlags`], the header
/// layout constants, and the [`types::ReferenceTracer`] trait through
/// which the runtime exposes its object graph.
pub use rhelix_core as types;

/// Bump-pointer arenas (`rhelix-arena`).
///
/// Most users go through [`heap::MemoryManager`]'s arena methods; the
/// [`arena::Arena`] type is usable on its own for scratch space.
pub use rhelix_arena as arena;

/// Counted heap, cycle collector and memory manager (`rhelix-heap`).
pub use rhelix_heap as heap;

/// Common imports for typical RHelix usage.
///
/// ```rust
/// use rhelix::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use rhelix_core::{ArenaId, ObjectFlags, ObjectId, RefBuf, ReferenceTracer, HEADER_SIZE};

    // Arenas
    pub use rhelix_arena::{ArenaError, ArenaSlice};

    // Heap
    pub use rhelix_heap::{
        CollectionReport, InvariantViolation, ManagerConfig, MemoryError, MemoryManager,
        MemoryStats, ObjectRef,
    };
}
