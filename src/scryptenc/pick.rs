//! Turning a [`Budget`] into concrete scrypt parameters, and checking
//! parameters found in a container header against one.

use tracing::debug;

use super::probe::ResourceProbe;
use crate::params::{Budget, CostParams, MAX_RP};
use crate::primitive::StatusCode;

/// Memory floor regardless of budget.
pub const MIN_MEMORY: usize = 1 << 20;
/// Minimum salsa20/8 core invocations allowed regardless of budget.
pub const MIN_OPS: f64 = 32768.0;
/// Block size used for every container this crate writes.
const BLOCK_R: u32 = 8;

/// Memory and CPU ceilings resolved from a budget and a probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    memory: usize,
    ops: f64,
}

impl Limits {
    pub fn resolve<P: ResourceProbe + ?Sized>(
        probe: &P,
        budget: &Budget,
    ) -> Result<Self, StatusCode> {
        let memory = memory_to_use(probe.memory_limit()?, budget.max_mem, budget.max_mem_frac);
        let ops = (probe.salsa_ops_per_second()? * budget.max_time).max(MIN_OPS);

        debug!(memory, ops, "resolved derivation limits");
        Ok(Self { memory, ops })
    }

    pub fn memory(&self) -> usize {
        self.memory
    }

    pub fn ops(&self) -> f64 {
        self.ops
    }

    /// Chooses `N`, `r`, `p` so that `128 * N * r <= memory` and
    /// `4 * N * r * p <= ops`.
    pub fn pick(&self) -> Result<CostParams, StatusCode> {
        let r = BLOCK_R;

        let (log_n, p) = if self.ops < (self.memory / 32) as f64 {
            // CPU is the tighter bound: p = 1, N from the op limit.
            let max_n = self.ops / f64::from(r * 4);
            (smallest_log_n_above(max_n / 2.0), 1)
        } else {
            let max_n = (self.memory / (r as usize * 128)) as f64;
            let log_n = smallest_log_n_above(max_n / 2.0);

            let max_rp = ((self.ops / 4.0) / (1u64 << log_n) as f64).min((MAX_RP - 1) as f64);
            let p = ((max_rp as u32) / r).max(1);
            (log_n, p)
        };

        CostParams::new(1u64 << log_n, r, p).map_err(|_| StatusCode::DERIVATION)
    }

    /// Rejects parameters whose derivation would exceed these limits.
    pub fn check(&self, params: &CostParams) -> Result<(), StatusCode> {
        let n = params.n();
        let r = u64::from(params.r());
        let rp = r * u64::from(params.p());
        if r == 0 || rp == 0 {
            return Err(StatusCode::MALFORMED);
        }

        if (self.memory as u64 / n) / r < 128 {
            debug!(n, r, memory = self.memory, "derivation exceeds memory budget");
            return Err(StatusCode::MEMORY_BUDGET);
        }
        if (self.ops / n as f64) / (rp as f64) < 4.0 {
            debug!(n, rp, ops = self.ops, "derivation exceeds time budget");
            return Err(StatusCode::TIME_BUDGET);
        }
        Ok(())
    }
}

fn memory_to_use(system: usize, max_mem: usize, max_mem_frac: f64) -> usize {
    let frac = if max_mem_frac > 0.5 || max_mem_frac == 0.0 {
        0.5
    } else {
        max_mem_frac
    };

    let mut avail = (frac * system as f64) as usize;
    if max_mem > 0 && avail > max_mem {
        avail = max_mem;
    }
    avail.max(MIN_MEMORY)
}

/// Smallest `log_n` in `1..=63` with `2^log_n > bound`.
fn smallest_log_n_above(bound: f64) -> u32 {
    let mut log_n = 1;
    while log_n < 63 && ((1u64 << log_n) as f64) <= bound {
        log_n += 1;
    }
    log_n
}
