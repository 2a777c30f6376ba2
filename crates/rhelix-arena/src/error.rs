//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use rhelix_core::ArenaId;

/// Errors that can occur during arena operations.
///
/// [`Exhausted`](ArenaError::Exhausted) is an ordinary outcome of bump
/// allocation, not an out-of-memory condition: callers fall back to a new
/// arena or to the counted heap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The arena has too little room left for the (aligned) request.
    Exhausted {
        /// Aligned number of bytes requested.
        requested: usize,
        /// Bytes remaining between the cursor and the end of the region.
        remaining: usize,
    },
    /// The arena id is not registered (never created, or destroyed).
    UnknownArena {
        /// The unrecognised arena.
        arena: ArenaId,
    },
    /// There is no live arena to allocate from.
    NoArena,
    /// An [`ArenaSlice`](crate::ArenaSlice) issued before the arena's last reset.
    StaleAllocation {
        /// The arena the slice points into.
        arena: ArenaId,
        /// Epoch recorded in the slice.
        epoch: u64,
        /// The arena's current epoch.
        current: u64,
    },
    /// A slice that does not lie within the arena's allocated prefix.
    OutOfBounds {
        /// The arena the slice points into.
        arena: ArenaId,
        /// Offset recorded in the slice.
        offset: usize,
        /// Length recorded in the slice.
        len: usize,
        /// Bytes currently allocated in the arena.
        used: usize,
    },
    /// The backing region could not be reserved.
    ReservationFailed {
        /// Requested region capacity in bytes.
        capacity: usize,
    },
    /// Invalid arena parameters.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                requested,
                remaining,
            } => {
                write!(
                    f,
                    "arena exhausted: requested {requested} bytes, {remaining} bytes remaining"
                )
            }
            Self::UnknownArena { arena } => write!(f, "unknown arena: {arena}"),
            Self::NoArena => write!(f, "no live arena"),
            Self::StaleAllocation {
                arena,
                epoch,
                current,
            } => {
                write!(
                    f,
                    "stale allocation in {arena}: issued in epoch {epoch}, arena is at epoch {current}"
                )
            }
            Self::OutOfBounds {
                arena,
                offset,
                len,
                used,
            } => {
                write!(
                    f,
                    "allocation out of bounds in {arena}: offset {offset} + len {len} exceeds {used} used bytes"
                )
            }
            Self::ReservationFailed { capacity } => {
                write!(f, "failed to reserve {capacity} bytes for arena region")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}
