//! Per-object metadata and storage.

use rhelix_core::{ObjectFlags, ObjectId, HEADER_SIZE};

/// Metadata carried by every counted object.
///
/// Accounting treats the header as [`HEADER_SIZE`] bytes regardless of
/// the in-memory size of this struct, so byte totals are identical
/// across targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectHeader {
    pub(crate) ownership_count: u32,
    pub(crate) flags: ObjectFlags,
    pub(crate) payload_size: usize,
    /// Intrusive link used by the collector to thread its mark worklist.
    /// `None` outside a collection pass.
    pub(crate) trace_link: Option<ObjectId>,
}

impl ObjectHeader {
    pub(crate) fn new(payload_size: usize, flags: ObjectFlags) -> Self {
        Self {
            ownership_count: 1,
            flags,
            payload_size,
            trace_link: None,
        }
    }

    /// Number of owners. Starts at 1; frozen once the object is immortal.
    pub fn ownership_count(&self) -> u32 {
        self.ownership_count
    }

    /// Current flag set.
    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    /// Payload length in bytes.
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Whether the object is exempt from counting and collection.
    pub fn is_immortal(&self) -> bool {
        self.flags.contains(ObjectFlags::IMMORTAL)
    }

    /// Bytes this object contributes to the live total.
    pub fn footprint(&self) -> usize {
        HEADER_SIZE + self.payload_size
    }
}

/// A counted object: header plus zero-initialised payload.
#[derive(Debug)]
pub struct HeapObject {
    pub(crate) header: ObjectHeader,
    payload: Box<[u8]>,
}

impl HeapObject {
    pub(crate) fn new(header: ObjectHeader, payload: Box<[u8]>) -> Self {
        debug_assert_eq!(header.payload_size, payload.len());
        Self { header, payload }
    }

    /// The object's header.
    pub fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Mutable payload bytes.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_header_has_single_owner() {
        let h = ObjectHeader::new(24, ObjectFlags::empty());
        assert_eq!(h.ownership_count(), 1);
        assert!(h.flags().is_empty());
        assert_eq!(h.trace_link, None);
        assert_eq!(h.footprint(), 40);
    }

    #[test]
    fn immortal_flag_reported() {
        let h = ObjectHeader::new(0, ObjectFlags::IMMORTAL);
        assert!(h.is_immortal());
        assert_eq!(h.footprint(), HEADER_SIZE);
    }
}
