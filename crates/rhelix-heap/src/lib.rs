//! Reference-counted object heap, cycle collector and memory manager.
//!
//! Counted objects live in a generational slot table ([`Heap`]) and are
//! addressed by [`ObjectId`](rhelix_core::ObjectId). Each object starts
//! with one owner; [`MemoryManager::retain`] and
//! [`MemoryManager::release`] adjust the count, and the object is freed
//! the moment it reaches zero. [`ObjectRef`] wraps one count in an RAII
//! handle.
//!
//! Counting never frees a cycle, so the manager runs a mark-sweep
//! [`CycleCollector`] when live bytes cross the configured threshold or
//! when an allocation would exceed the budget. The runtime describes its
//! object graph through a [`ReferenceTracer`](rhelix_core::ReferenceTracer).
//!
//! The manager also owns the bump-allocated arenas of
//! [`rhelix_arena`]; arena bytes are outside the counted budget.
//!
//! # Example
//!
//! ```
//! use rhelix_heap::MemoryManager;
//!
//! let mm = MemoryManager::new(64 * 1024).unwrap();
//! let obj = mm.allocate(32).unwrap();
//! mm.payload_mut(obj.id()).unwrap()[0] = 7;
//!
//! let other = obj.clone();
//! assert_eq!(obj.ownership_count(), Some(2));
//! drop(other);
//! assert_eq!(obj.ownership_count(), Some(1));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collector;
pub mod config;
pub mod error;
pub mod handle;
pub mod header;
pub mod heap;
pub mod manager;
pub mod stats;

pub use collector::{CollectionReport, CycleCollector};
pub use config::ManagerConfig;
pub use error::{InvariantViolation, MemoryError};
pub use handle::ObjectRef;
pub use header::{HeapObject, ObjectHeader};
pub use heap::{Heap, HeapAccounting, Release};
pub use manager::MemoryManager;
pub use stats::{MemoryStats, TeardownReport};
