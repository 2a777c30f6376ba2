//! The counted heap: a generational slot table of [`HeapObject`]s.
//!
//! Each slot carries a generation that is bumped when its object is
//! reclaimed. An [`ObjectId`] names a slot *and* the generation it was
//! issued in, so an id that outlives its object is detected instead of
//! silently aliasing whatever reuses the slot.
//!
//! The heap enforces per-object counting rules and keeps byte
//! accounting. It knows nothing about budgets, roots or collection;
//! those live in [`MemoryManager`](crate::MemoryManager) and
//! [`CycleCollector`](crate::CycleCollector).

use rhelix_core::{ObjectFlags, ObjectId};

use crate::error::{InvariantViolation, MemoryError};
use crate::header::{HeapObject, ObjectHeader};

/// Outcome of a successful [`Heap::release`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// The count dropped but other owners remain.
    Retained {
        /// The count after the release.
        count: u32,
    },
    /// The last owner let go; the object was reclaimed.
    Freed {
        /// Bytes returned to the live total.
        bytes: usize,
    },
    /// The object is immortal; nothing changed.
    Immortal,
}

/// Running byte and object totals for a [`Heap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapAccounting {
    /// Bytes held by live objects, headers included.
    pub live_bytes: usize,
    /// Number of live objects.
    pub live_objects: usize,
    /// Bytes ever allocated.
    pub lifetime_allocated_bytes: u64,
    /// Bytes ever reclaimed.
    pub lifetime_freed_bytes: u64,
    /// Objects ever allocated.
    pub lifetime_allocations: u64,
    /// Objects ever reclaimed.
    pub lifetime_frees: u64,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<HeapObject>,
}

/// Generational slot table holding every counted object.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    /// Indices of empty slots, reused LIFO.
    free_slots: Vec<u32>,
    accounting: HeapAccounting,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object with a zeroed payload of `payload_size` bytes and
    /// an ownership count of 1.
    ///
    /// The payload reservation is fallible; nothing is left allocated
    /// when it fails.
    pub fn insert(
        &mut self,
        payload_size: usize,
        flags: ObjectFlags,
    ) -> Result<ObjectId, MemoryError> {
        let mut payload = Vec::new();
        payload
            .try_reserve_exact(payload_size)
            .map_err(|_| MemoryError::ReservationFailed {
                requested: payload_size,
            })?;
        payload.resize(payload_size, 0);
        let object = HeapObject::new(
            ObjectHeader::new(payload_size, flags),
            payload.into_boxed_slice(),
        );
        let footprint = object.header.footprint();

        let id = match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.object = Some(object);
                ObjectId::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| {
                    MemoryError::ReservationFailed {
                        requested: footprint,
                    }
                })?;
                self.slots.push(Slot {
                    generation: 0,
                    object: Some(object),
                });
                ObjectId::new(index, 0)
            }
        };

        let acc = &mut self.accounting;
        acc.live_bytes += footprint;
        acc.live_objects += 1;
        acc.lifetime_allocated_bytes += footprint as u64;
        acc.lifetime_allocations += 1;
        Ok(id)
    }

    /// Look up a live object.
    pub fn get(&self, id: ObjectId) -> Option<&HeapObject> {
        self.slots
            .get(id.slot())
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.object.as_ref())
    }

    /// Look up a live object mutably.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut HeapObject> {
        self.slots
            .get_mut(id.slot())
            .filter(|s| s.generation == id.generation())
            .and_then(|s| s.object.as_mut())
    }

    /// Whether `id` names a live object.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Add an owner. Immortal objects are left unchanged.
    ///
    /// Returns the resulting count.
    pub fn retain(&mut self, id: ObjectId) -> Result<u32, InvariantViolation> {
        let object = self
            .get_mut(id)
            .ok_or(InvariantViolation::StaleHandle { object: id })?;
        let header = &mut object.header;
        if header.is_immortal() {
            return Ok(header.ownership_count);
        }
        header.ownership_count = header
            .ownership_count
            .checked_add(1)
            .ok_or(InvariantViolation::CountOverflow { object: id })?;
        Ok(header.ownership_count)
    }

    /// Remove an owner, reclaiming the object when the count reaches
    /// zero.
    ///
    /// Releasing an id whose object is already gone is a
    /// [`InvariantViolation::DoubleRelease`].
    pub fn release(&mut self, id: ObjectId) -> Result<Release, InvariantViolation> {
        let object = self
            .get_mut(id)
            .ok_or(InvariantViolation::DoubleRelease { object: id })?;
        let header = &mut object.header;
        if header.is_immortal() {
            return Ok(Release::Immortal);
        }
        header.ownership_count = header
            .ownership_count
            .checked_sub(1)
            .ok_or(InvariantViolation::CountUnderflow { object: id })?;
        if header.ownership_count > 0 {
            return Ok(Release::Retained {
                count: header.ownership_count,
            });
        }
        let bytes = self.free(id).unwrap_or(0);
        Ok(Release::Freed { bytes })
    }

    /// Reclaim an object regardless of its count.
    ///
    /// Used by the collector and by teardown. Returns the bytes
    /// reclaimed, or `None` if `id` is not live.
    pub fn free(&mut self, id: ObjectId) -> Option<usize> {
        let slot = self
            .slots
            .get_mut(id.slot())
            .filter(|s| s.generation == id.generation())?;
        let object = slot.object.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index());

        let bytes = object.header.footprint();
        let acc = &mut self.accounting;
        acc.live_bytes -= bytes;
        acc.live_objects -= 1;
        acc.lifetime_freed_bytes += bytes as u64;
        acc.lifetime_frees += 1;
        Some(bytes)
    }

    /// Reclaim every live object, immortal ones included.
    ///
    /// Returns `(objects, bytes)` reclaimed.
    pub fn clear(&mut self) -> (usize, usize) {
        let ids: Vec<ObjectId> = self.ids().collect();
        let mut bytes = 0;
        for &id in &ids {
            bytes += self.free(id).unwrap_or(0);
        }
        (ids.len(), bytes)
    }

    /// Iterate over the ids of all live objects in slot order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// Iterate over all live objects in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &HeapObject)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.object
                .as_ref()
                .map(|o| (ObjectId::new(index as u32, slot.generation), o))
        })
    }

    /// Number of slots ever created. Every live id has `slot() <
    /// slot_count()`.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Running totals.
    pub fn accounting(&self) -> &HeapAccounting {
        &self.accounting
    }

    /// Bytes held by live objects, headers included.
    pub fn live_bytes(&self) -> usize {
        self.accounting.live_bytes
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.accounting.live_objects
    }

    /// Whether the heap holds no live objects.
    pub fn is_empty(&self) -> bool {
        self.accounting.live_objects == 0
    }
}
