//! Point-in-time statistics and teardown summaries.

use std::fmt;

/// Snapshot of a manager's counters, returned by
/// [`MemoryManager::stats`](crate::MemoryManager::stats).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Hard ceiling on counted-heap bytes.
    pub budget_bytes: usize,
    /// Live-byte level above which an allocation triggers a collection.
    pub collection_threshold_bytes: usize,
    /// Counted-heap bytes in use, headers included.
    pub live_bytes: usize,
    /// Live counted objects.
    pub live_objects: usize,
    /// Bytes ever allocated on the counted heap.
    pub lifetime_allocated_bytes: u64,
    /// Bytes ever reclaimed from the counted heap.
    pub lifetime_freed_bytes: u64,
    /// Objects ever allocated.
    pub lifetime_allocations: u64,
    /// Objects ever reclaimed, by counting or by collection.
    pub lifetime_frees: u64,
    /// Collection passes run so far.
    pub collection_passes: u64,
    /// Objects reclaimed by collection passes.
    pub objects_reclaimed_by_collector: u64,
    /// Allocations refused with out-of-memory.
    pub failed_allocations: u64,
    /// Collection passes aborted by a broken ownership invariant.
    pub failed_passes: u64,
    /// Invariant violations raised by [`ObjectRef`](crate::ObjectRef)
    /// clones and drops, which have no caller to return an error to.
    pub deferred_violations: u64,
    /// Entries in the explicit root set.
    pub roots: usize,
    /// Registered arenas.
    pub arenas: usize,
    /// Bytes reserved by all arenas.
    pub arena_reserved_bytes: usize,
    /// Bytes handed out by all arenas in their current epochs.
    pub arena_used_bytes: usize,
}

/// What [`MemoryManager::destroy`](crate::MemoryManager::destroy)
/// released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Arenas released.
    pub arenas: usize,
    /// Bytes those arenas had reserved.
    pub arena_bytes: usize,
    /// Counted objects reclaimed, immortal ones included.
    pub objects: usize,
    /// Bytes those objects held.
    pub bytes: usize,
}

/// Human-readable byte count: `512B`, `1.5K`, `3.0M`, `1.2G`.
pub(crate) struct FormattedSize(pub(crate) usize);

impl fmt::Display for FormattedSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let k = self.0 as f64 / 1024.0;
        if k < 1.0 {
            return write!(f, "{}B", self.0);
        }
        let m = k / 1024.0;
        if m < 1.0 {
            return write!(f, "{k:.1}K");
        }
        let g = m / 1024.0;
        if g < 1.0 {
            write!(f, "{m:.1}M")
        } else {
            write!(f, "{g:.1}G")
        }
    }
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Memory statistics:")?;
        writeln!(
            f,
            "  Live: {} in {} objects (budget {}, collect above {})",
            FormattedSize(self.live_bytes),
            self.live_objects,
            FormattedSize(self.budget_bytes),
            FormattedSize(self.collection_threshold_bytes),
        )?;
        writeln!(
            f,
            "  Allocated: {} objects, {} total",
            self.lifetime_allocations,
            FormattedSize(usize::try_from(self.lifetime_allocated_bytes).unwrap_or(usize::MAX)),
        )?;
        writeln!(
            f,
            "  Freed: {} objects, {} total",
            self.lifetime_frees,
            FormattedSize(usize::try_from(self.lifetime_freed_bytes).unwrap_or(usize::MAX)),
        )?;
        writeln!(
            f,
            "  Collections: {} passes, {} objects reclaimed",
            self.collection_passes, self.objects_reclaimed_by_collector,
        )?;
        writeln!(f, "  Failed allocations: {}", self.failed_allocations)?;
        if self.failed_passes + self.deferred_violations > 0 {
            writeln!(
                f,
                "  Violations: {} failed passes, {} from handles",
                self.failed_passes, self.deferred_violations,
            )?;
        }
        writeln!(f, "  Roots: {}", self.roots)?;
        write!(
            f,
            "  Arenas: {} using {} of {}",
            self.arenas,
            FormattedSize(self.arena_used_bytes),
            FormattedSize(self.arena_reserved_bytes),
        )
    }
}

impl fmt::Display for TeardownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "released {} arenas ({}) and {} objects ({})",
            self.arenas,
            FormattedSize(self.arena_bytes),
            self.objects,
            FormattedSize(self.bytes),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_size_units() {
        assert_eq!(FormattedSize(512).to_string(), "512B");
        assert_eq!(FormattedSize(1536).to_string(), "1.5K");
        assert_eq!(FormattedSize(3 * 1024 * 1024).to_string(), "3.0M");
        assert_eq!(FormattedSize(2 * 1024 * 1024 * 1024).to_string(), "2.0G");
    }

    #[test]
    fn stats_display_mentions_live_bytes() {
        let stats = MemoryStats {
            budget_bytes: 1024,
            live_bytes: 816,
            live_objects: 1,
            ..MemoryStats::default()
        };
        let text = stats.to_string();
        assert!(text.starts_with("Memory statistics:"));
        assert!(text.contains("Live: 816B in 1 objects"));
        assert!(!text.contains("Violations"));
    }

    #[test]
    fn stats_display_surfaces_violations() {
        let stats = MemoryStats {
            deferred_violations: 2,
            ..MemoryStats::default()
        };
        assert!(stats
            .to_string()
            .contains("Violations: 0 failed passes, 2 from handles"));
    }

    #[test]
    fn teardown_display() {
        let report = TeardownReport {
            arenas: 2,
            arena_bytes: 2048,
            objects: 3,
            bytes: 48,
        };
        assert_eq!(
            report.to_string(),
            "released 2 arenas (2.0K) and 3 objects (48B)"
        );
    }
}
