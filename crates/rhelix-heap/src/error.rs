//! Error types for the counted heap and the memory manager.
//!
//! Failures fall into three classes:
//!
//! - **Resource exhaustion** ([`MemoryError::OutOfMemory`], arena
//!   exhaustion): recoverable, the caller picks a fallback.
//! - **Construction failure** ([`MemoryError::InvalidConfig`],
//!   [`MemoryError::ReservationFailed`]): recoverable, nothing is left
//!   alive.
//! - **Invariant violation** ([`MemoryError::Invariant`]): a bug in the
//!   caller's ownership discipline. Always logged at `error`; panics when
//!   [`ManagerConfig::abort_on_invariant_violation`](crate::ManagerConfig)
//!   is set (the default in debug builds).

use std::error::Error;
use std::fmt;

use rhelix_arena::ArenaError;
use rhelix_core::ObjectId;

/// A broken ownership invariant. Never recoverable locally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Release of an object whose storage was already reclaimed.
    DoubleRelease {
        /// The released id.
        object: ObjectId,
    },
    /// Any other operation on an id whose object was reclaimed.
    StaleHandle {
        /// The stale id.
        object: ObjectId,
    },
    /// Release of a live object whose count is already zero.
    CountUnderflow {
        /// The released id.
        object: ObjectId,
    },
    /// Retain past the maximum representable ownership count.
    CountOverflow {
        /// The retained id.
        object: ObjectId,
    },
    /// The manager was re-entered while it was already borrowed, e.g.
    /// from inside a reference tracer or while a payload guard was held.
    ReentrantAccess,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoubleRelease { object } => {
                write!(f, "double release of {object}: object already reclaimed")
            }
            Self::StaleHandle { object } => write!(f, "stale handle {object}"),
            Self::CountUnderflow { object } => {
                write!(f, "ownership count of {object} would drop below zero")
            }
            Self::CountOverflow { object } => {
                write!(f, "ownership count of {object} overflowed")
            }
            Self::ReentrantAccess => write!(f, "memory manager re-entered during an operation"),
        }
    }
}

impl Error for InvariantViolation {}

/// Errors returned by memory manager operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryError {
    /// The budget cannot accommodate the request, even after collection.
    OutOfMemory {
        /// Bytes the allocation needed (header plus payload).
        requested: usize,
        /// Counted-heap bytes in use when the allocation failed.
        live: usize,
        /// The manager's hard ceiling.
        budget: usize,
    },
    /// Invalid manager configuration.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
    /// The system allocator could not provide the requested storage.
    ReservationFailed {
        /// Bytes that could not be reserved.
        requested: usize,
    },
    /// An ownership invariant was broken.
    Invariant(InvariantViolation),
    /// An arena operation failed.
    Arena(ArenaError),
}

impl MemoryError {
    /// Whether the caller can reasonably continue after this error.
    ///
    /// Only invariant violations are unrecoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Invariant(_))
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                live,
                budget,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes with {live} of {budget} bytes in use"
                )
            }
            Self::InvalidConfig { reason } => write!(f, "invalid manager config: {reason}"),
            Self::ReservationFailed { requested } => {
                write!(f, "failed to reserve {requested} bytes")
            }
            Self::Invariant(v) => write!(f, "invariant violation: {v}"),
            Self::Arena(e) => write!(f, "arena error: {e}"),
        }
    }
}

impl Error for MemoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invariant(v) => Some(v),
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for MemoryError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

/// Report a broken invariant.
///
/// Logs at `error`, then panics if `abort` is set. Otherwise returns the
/// violation wrapped as a [`MemoryError`] for the caller to propagate.
pub(crate) fn raise(abort: bool, violation: InvariantViolation) -> MemoryError {
    tracing::error!(%violation, "heap invariant violated");
    if abort {
        panic!("heap invariant violated: {violation}");
    }
    MemoryError::Invariant(violation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariants_are_unrecoverable() {
        let oom = MemoryError::OutOfMemory {
            requested: 1,
            live: 2,
            budget: 3,
        };
        assert!(oom.is_recoverable());
        assert!(MemoryError::Arena(ArenaError::UnknownArena {
            arena: rhelix_core::ArenaId(0)
        })
        .is_recoverable());
        assert!(!MemoryError::Invariant(InvariantViolation::ReentrantAccess).is_recoverable());
    }

    #[test]
    fn raise_without_abort_returns_error() {
        let v = InvariantViolation::DoubleRelease {
            object: ObjectId::new(0, 1),
        };
        assert_eq!(raise(false, v), MemoryError::Invariant(v));
    }

    #[test]
    #[should_panic(expected = "heap invariant violated")]
    fn raise_with_abort_panics() {
        raise(true, InvariantViolation::ReentrantAccess);
    }

    #[test]
    fn source_chains_wrapped_errors() {
        let e = MemoryError::from(ArenaError::ReservationFailed { capacity: 8 });
        assert!(e.source().is_some());
        assert_eq!(
            e.to_string(),
            "arena error: failed to reserve 8 bytes for arena region"
        );
    }
}
