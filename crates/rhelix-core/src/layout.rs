//! Header layout and alignment constants.

/// Bytes of bookkeeping charged for every counted object.
///
/// Mirrors the runtime's object header: a 4-byte ownership count, 2-byte
/// flags, 2-byte size and an 8-byte trace link. The budget and all byte
/// statistics charge `HEADER_SIZE + payload_size` per object.
pub const HEADER_SIZE: usize = 16;

/// Alignment of every arena allocation, in bytes.
pub const ARENA_ALIGNMENT: usize = 8;

/// Round `value` up to the next multiple of `align`.
///
/// `align` must be a power of two. Returns `None` on overflow.
pub const fn align_up(value: usize, align: usize) -> Option<usize> {
    let mask = align - 1;
    match value.checked_add(mask) {
        Some(v) => Some(v & !mask),
        None => None,
    }
}
