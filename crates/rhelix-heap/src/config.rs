//! Memory manager configuration.

use crate::error::MemoryError;

/// Configuration for a [`MemoryManager`](crate::MemoryManager).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Hard ceiling on counted-heap bytes in use (headers included).
    pub budget_bytes: usize,

    /// Soft ceiling: after a successful allocation leaves more than this
    /// many bytes live, a collection pass runs.
    ///
    /// Default: 10% of the budget. Must not exceed `budget_bytes`.
    pub collection_threshold_bytes: usize,

    /// Every N-th collection pass is logged at `info`; the others at
    /// `trace`.
    ///
    /// Default: 100. Must be non-zero.
    pub log_every_n_passes: u64,

    /// Panic on invariant violations (double release, stale handles)
    /// instead of returning [`MemoryError::Invariant`].
    ///
    /// Default: on in debug builds, off in release builds.
    pub abort_on_invariant_violation: bool,
}

impl ManagerConfig {
    /// Default budget: 1 MiB.
    pub const DEFAULT_BUDGET_BYTES: usize = 1024 * 1024;

    /// The default threshold is `budget / DEFAULT_THRESHOLD_DIVISOR`.
    pub const DEFAULT_THRESHOLD_DIVISOR: usize = 10;

    /// Default logging cadence for collection passes.
    pub const DEFAULT_LOG_EVERY_N_PASSES: u64 = 100;

    /// Create a config for the given budget.
    ///
    /// Uses default values for all other parameters.
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            budget_bytes,
            collection_threshold_bytes: budget_bytes / Self::DEFAULT_THRESHOLD_DIVISOR,
            log_every_n_passes: Self::DEFAULT_LOG_EVERY_N_PASSES,
            abort_on_invariant_violation: cfg!(debug_assertions),
        }
    }

    /// Check the parameters for consistency.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.budget_bytes == 0 {
            return Err(MemoryError::InvalidConfig {
                reason: "budget_bytes must be non-zero".into(),
            });
        }
        if self.collection_threshold_bytes > self.budget_bytes {
            return Err(MemoryError::InvalidConfig {
                reason: format!(
                    "collection_threshold_bytes ({}) exceeds budget_bytes ({})",
                    self.collection_threshold_bytes, self.budget_bytes,
                ),
            });
        }
        if self.log_every_n_passes == 0 {
            return Err(MemoryError::InvalidConfig {
                reason: "log_every_n_passes must be non-zero".into(),
            });
        }
        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET_BYTES)
    }
}
