//! Cost parameters for raw derivation and resource budgets for the container
//! operations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exclusive upper bound on `r * p`.
pub const MAX_RP: u64 = 1 << 30;

/// Why a set of scrypt cost parameters was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamError {
    #[error("N should be a power of two > 1 (got N={0})")]
    NTooSmall(u64),

    #[error("N should be a power of two (got N={0})")]
    NotPowerOfTwo(u64),

    #[error("r*p should be < 2**30 (got r={r}, p={p})")]
    CostTooHigh { r: u32, p: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostParams {
    n: u64,
    r: u32,
    p: u32,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            // 2^14 iterations
            n: 1 << 14,
            r: 8,
            p: 1,
        }
    }
}

impl CostParams {
    pub fn new(n: u64, r: u32, p: u32) -> Result<Self, ParamError> {
        let params = Self { n, r, p };
        params.validate()?;
        Ok(params)
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn p(&self) -> u32 {
        self.p
    }

    /// `log2(N)`; exact because `N` is a validated power of two.
    pub fn log_n(&self) -> u8 {
        self.n.trailing_zeros() as u8
    }

    /// Bytes of scratch memory a derivation needs (`128 * r * N`).
    pub fn memory_required(&self) -> u64 {
        128u64
            .saturating_mul(u64::from(self.r))
            .saturating_mul(self.n)
    }

    /// Rejects degenerate parameters before anything is allocated.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.n <= 1 {
            return Err(ParamError::NTooSmall(self.n));
        }
        if !self.n.is_power_of_two() {
            return Err(ParamError::NotPowerOfTwo(self.n));
        }
        if u64::from(self.r) * u64::from(self.p) >= MAX_RP {
            return Err(ParamError::CostTooHigh {
                r: self.r,
                p: self.p,
            });
        }
        Ok(())
    }
}

/// Time and memory a container operation may spend on key derivation.
///
/// `max_mem == 0` means "use the default ceiling" and `max_mem_frac` is a
/// fraction of the memory the system reports. Values are passed through
/// unchecked; the backend enforces them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub max_time: f64,
    pub max_mem: usize,
    pub max_mem_frac: f64,
}

impl Budget {
    /// Cheap defaults for interactive encryption.
    pub const ENCRYPT: Self = Self {
        max_time: 5.0,
        max_mem: 0,
        max_mem_frac: 0.125,
    };

    /// Generous defaults for decryption, where the encryptor picked the cost.
    pub const DECRYPT: Self = Self {
        max_time: 300.0,
        max_mem: 0,
        max_mem_frac: 0.5,
    };

    pub fn new(max_time: f64, max_mem: usize, max_mem_frac: f64) -> Self {
        Self {
            max_time,
            max_mem,
            max_mem_frac,
        }
    }

    pub fn with_max_time(self, max_time: f64) -> Self {
        Self { max_time, ..self }
    }

    pub fn with_max_mem(self, max_mem: usize) -> Self {
        Self { max_mem, ..self }
    }

    pub fn with_max_mem_frac(self, max_mem_frac: f64) -> Self {
        Self {
            max_mem_frac,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        let params = CostParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.n(), 16384);
        assert_eq!(params.r(), 8);
        assert_eq!(params.p(), 1);
        assert_eq!(params.log_n(), 14);
    }

    #[test]
    fn n_must_exceed_one() {
        assert_eq!(CostParams::new(0, 1, 1), Err(ParamError::NTooSmall(0)));
        assert_eq!(CostParams::new(1, 1, 1), Err(ParamError::NTooSmall(1)));
        assert!(CostParams::new(2, 1, 1).is_ok());
    }

    #[test]
    fn n_must_be_power_of_two() {
        assert_eq!(CostParams::new(3, 1, 1), Err(ParamError::NotPowerOfTwo(3)));
        assert_eq!(
            CostParams::new(1000, 8, 1),
            Err(ParamError::NotPowerOfTwo(1000))
        );
        assert!(CostParams::new(1 << 63, 1, 1).is_ok());
    }

    #[test]
    fn rp_product_is_bounded_without_wrapping() {
        assert_eq!(
            CostParams::new(16, 1 << 20, 1 << 20),
            Err(ParamError::CostTooHigh {
                r: 1 << 20,
                p: 1 << 20
            })
        );
        assert!(CostParams::new(16, 1 << 15, 1 << 15).is_err());
        assert!(CostParams::new(16, 1, (1 << 30) - 1).is_ok());
    }

    #[test]
    fn memory_required_saturates() {
        let params = CostParams::new(1 << 14, 8, 1).unwrap();
        assert_eq!(params.memory_required(), 16 * 1024 * 1024);

        let huge = CostParams::new(1 << 62, 1 << 10, 1).unwrap();
        assert_eq!(huge.memory_required(), u64::MAX);
    }

    #[test]
    fn budget_defaults_differ_by_direction() {
        assert_eq!(Budget::ENCRYPT.max_time, 5.0);
        assert_eq!(Budget::ENCRYPT.max_mem_frac, 0.125);
        assert_eq!(Budget::DECRYPT.max_time, 300.0);
        assert_eq!(Budget::DECRYPT.max_mem_frac, 0.5);
        assert_eq!(Budget::ENCRYPT.max_mem, 0);
        assert_eq!(Budget::DECRYPT.max_mem, 0);
    }

    #[test]
    fn budget_builders_keep_other_fields() {
        let budget = Budget::DECRYPT.with_max_time(0.5).with_max_mem(1 << 20);
        assert_eq!(budget.max_time, 0.5);
        assert_eq!(budget.max_mem, 1 << 20);
        assert_eq!(budget.max_mem_frac, 0.5);
    }

    #[test]
    fn params_serialize_as_plain_fields() {
        let json = serde_json::to_string(&CostParams::default()).unwrap();
        assert_eq!(json, r#"{"n":16384,"r":8,"p":1}"#);
    }
}
