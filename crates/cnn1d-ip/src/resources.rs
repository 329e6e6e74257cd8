//! Multiplier budget and latency model.
//!
//! The deployed kernel caps concurrent multiplier instances and relaxes the
//! sweep pipeline to one position every two cycles. These numbers size
//! latency only; no result depends on them.

use crate::params::{Dims, KERNEL_WIDTH};

/// Multiplier instance cap the kernel was synthesised against.
pub const DEFAULT_MUL_LIMIT: usize = 180;

/// Initiation interval of the fused sweep (cycles per position).
pub const SWEEP_INITIATION_INTERVAL: u64 = 2;

/// Initiation interval of the read, bias-init and write loops.
pub const IO_INITIATION_INTERVAL: u64 = 1;

/// Bound on concurrently active multiplies plus the sweep's pipeline rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBudget {
    /// Maximum multiplies in flight in one cycle. Zero is treated as one.
    pub mul_limit: usize,
    /// Minimum cycles between successive sweep positions.
    pub initiation_interval: u64,
}

impl Default for ResourceBudget {
    fn default() -> Self {
        Self {
            mul_limit: DEFAULT_MUL_LIMIT,
            initiation_interval: SWEEP_INITIATION_INTERVAL,
        }
    }
}

/// Per-phase cycle counts for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleEstimate {
    /// Input words read.
    pub read: u64,
    /// Logits initialised from dense bias.
    pub init: u64,
    /// Fused sweep over all positions.
    pub sweep: u64,
    /// Output words written.
    pub write: u64,
}

impl CycleEstimate {
    /// Cycles from first read to last write.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.read + self.init + self.sweep + self.write
    }
}

impl ResourceBudget {
    /// Budget with the given multiplier cap and the default sweep interval.
    #[must_use]
    pub const fn with_mul_limit(mul_limit: usize) -> Self {
        Self {
            mul_limit,
            initiation_interval: SWEEP_INITIATION_INTERVAL,
        }
    }

    /// Cycles one position needs: the pipeline interval, or longer when a
    /// position's multiplies do not fit the cap.
    #[must_use]
    pub fn cycles_per_position(&self, dims: &Dims) -> u64 {
        let muls = dims.conv_out * (KERNEL_WIDTH + dims.classes);
        let limit = self.mul_limit.max(1);
        let issue = muls.div_ceil(limit) as u64;
        issue.max(self.initiation_interval)
    }

    /// Estimated cycles for one invocation.
    #[must_use]
    pub fn cycle_estimate(&self, dims: &Dims) -> CycleEstimate {
        CycleEstimate {
            read: dims.d_in as u64 * IO_INITIATION_INTERVAL,
            init: dims.classes as u64 * IO_INITIATION_INTERVAL,
            sweep: dims.d_in as u64 * self.cycles_per_position(dims),
            write: dims.classes as u64 * IO_INITIATION_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_model_is_interval_bound() {
        let dims = Dims::new(4, 1, 2);
        let b = ResourceBudget::default();
        assert_eq!(b.cycles_per_position(&dims), SWEEP_INITIATION_INTERVAL);
        let est = b.cycle_estimate(&dims);
        assert_eq!(est.total(), 4 + 2 + 4 * 2 + 2);
    }

    #[test]
    fn tighter_budget_never_shortens_latency() {
        let dims = Dims::new(64, 16, 7);
        let wide = ResourceBudget::with_mul_limit(180).cycle_estimate(&dims).total();
        let narrow = ResourceBudget::with_mul_limit(8).cycle_estimate(&dims).total();
        assert!(narrow >= wide);
        // 16 × (3 + 7) = 160 muls per position, 8 at a time
        assert_eq!(ResourceBudget::with_mul_limit(8).cycles_per_position(&dims), 20);
    }

    #[test]
    fn zero_limit_behaves_as_one() {
        let dims = Dims::new(2, 1, 1);
        assert_eq!(ResourceBudget::with_mul_limit(0).cycles_per_position(&dims), 4);
    }
}
