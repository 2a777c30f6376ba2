//! RAII ownership handles for counted objects.

use std::fmt;
use std::rc::{Rc, Weak};

use rhelix_core::ObjectId;

use crate::manager::{Deferred, MemoryManager, Shared};

/// One owned count on a counted object.
///
/// Cloning retains; dropping releases. If the heap is busy when the
/// handle is cloned or dropped (inside a tracer callback or while a
/// payload guard is held) the change is queued and applied before the
/// next heap operation.
///
/// The handle does not keep the manager alive. Once the manager is
/// destroyed, the handle is inert: dropping it does nothing and
/// [`ownership_count`](Self::ownership_count) returns `None`.
#[must_use]
pub struct ObjectRef {
    id: ObjectId,
    /// `None` once the count has been handed off by [`into_raw`](Self::into_raw).
    shared: Option<Weak<Shared>>,
}

impl ObjectRef {
    /// Wrap a count the caller already owns, e.g. one returned by
    /// [`MemoryManager::allocate_raw`] or kept by [`into_raw`](Self::into_raw).
    ///
    /// The count is not incremented: the handle takes over the caller's
    /// obligation to release it.
    pub fn from_raw(manager: &MemoryManager, id: ObjectId) -> Self {
        Self {
            id,
            shared: Some(Rc::downgrade(manager.shared())),
        }
    }

    /// Give up the handle without releasing its count.
    ///
    /// The caller now owns the count and must release it through the
    /// manager, or re-wrap it with [`from_raw`](Self::from_raw).
    pub fn into_raw(mut self) -> ObjectId {
        self.shared = None;
        self.id
    }

    /// The object this handle owns a count on.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Current ownership count, queued changes included.
    ///
    /// Returns `None` if the manager is gone, or if the heap is mutably
    /// borrowed (during a collection pass or while a mutable payload
    /// guard is held). Never reports an invariant violation.
    pub fn ownership_count(&self) -> Option<u32> {
        self.shared
            .as_ref()
            .and_then(Weak::upgrade)
            .and_then(|shared| shared.ownership_count(self.id))
    }
}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        let shared = self
            .shared
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|shared| shared.submit(Deferred::Retain(self.id)).is_ok());
        Self {
            id: self.id,
            shared: shared.as_ref().map(Rc::downgrade),
        }
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take().as_ref().and_then(Weak::upgrade) {
            // Failures were already reported when raised.
            let _ = shared.submit(Deferred::Release(self.id));
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef").field(&self.id).finish()
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}
