//! Per-object flag bits stored in the object header.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of object header flags.
///
/// Bit values match the header layout shared with the runtime:
///
/// | Flag | Bit |
/// |------|-----|
/// | [`MARKED`](ObjectFlags::MARKED) | `0x0001` |
/// | [`IMMORTAL`](ObjectFlags::IMMORTAL) | `0x0002` |
/// | [`ARENA_BACKED`](ObjectFlags::ARENA_BACKED) | `0x0004` |
/// | [`STACK_BACKED`](ObjectFlags::STACK_BACKED) | `0x0008` |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObjectFlags(u16);

impl ObjectFlags {
    /// Visited during the current collection pass. Cleared by the sweep.
    pub const MARKED: Self = Self(0x0001);
    /// Exempt from counting and collection; freed only at teardown.
    pub const IMMORTAL: Self = Self(0x0002);
    /// Storage lives inside an arena region.
    pub const ARENA_BACKED: Self = Self(0x0004);
    /// Storage lives on the runtime's stack.
    pub const STACK_BACKED: Self = Self(0x0008);

    const ALL: [(Self, &'static str); 4] = [
        (Self::MARKED, "MARKED"),
        (Self::IMMORTAL, "IMMORTAL"),
        (Self::ARENA_BACKED, "ARENA_BACKED"),
        (Self::STACK_BACKED, "STACK_BACKED"),
    ];

    /// The empty flag set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a flag set from raw bits. Unknown bits are kept.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether every flag in `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set every flag in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clear every flag in `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Returns `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ObjectFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ObjectFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ObjectFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(none)");
        }
        let mut first = true;
        for (flag, name) in Self::ALL {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        let unknown = self.0 & !0x000f;
        if unknown != 0 {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{unknown:#06x}")?;
        }
        Ok(())
    }
}
