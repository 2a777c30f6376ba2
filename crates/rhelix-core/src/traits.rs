//! The reference-enumeration seam between the heap and its runtime.

use smallvec::SmallVec;

use crate::id::ObjectId;

/// Buffer receiving the outgoing references of one object.
///
/// Most runtime objects hold a handful of references, so eight fit
/// inline before the buffer spills to the heap.
pub type RefBuf = SmallVec<[ObjectId; 8]>;

/// Enumerates the counted references an object holds.
///
/// The heap knows nothing about the layout of the runtime's objects. The
/// cycle collector asks the tracer, once per live object and pass, for
/// the ids the object refers to. Every reported reference is taken to
/// own one count on its target: the runtime retained the target on the
/// source's behalf.
///
/// Implementations must not allocate, retain or release through the
/// manager that is calling them. The payload is the object's current
/// bytes and is read-only for the duration of the call.
pub trait ReferenceTracer {
    /// Push every object referenced by `object` into `out`.
    fn trace(&self, object: ObjectId, payload: &[u8], out: &mut RefBuf);
}

impl<F> ReferenceTracer for F
where
    F: Fn(ObjectId, &[u8], &mut RefBuf),
{
    fn trace(&self, object: ObjectId, payload: &[u8], out: &mut RefBuf) {
        self(object, payload, out)
    }
}

/// A tracer for heaps whose objects never reference each other.
///
/// With it installed every counted object is externally owned, so no
/// collection pass can reclaim anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoReferences;

impl ReferenceTracer for NoReferences {
    fn trace(&self, _object: ObjectId, _payload: &[u8], _out: &mut RefBuf) {}
}
