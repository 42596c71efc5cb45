//! How much memory and CPU the host can give a derivation.

use std::time::{Duration, Instant};

use crate::primitive::StatusCode;

pub trait ResourceProbe: Send + Sync {
    /// Upper bound on memory a derivation may use, in bytes.
    fn memory_limit(&self) -> Result<usize, StatusCode>;

    /// Measured salsa20/8 core invocations per second.
    fn salsa_ops_per_second(&self) -> Result<f64, StatusCode>;
}

/// Probes the running system: resource limits, physical memory, and a short
/// timed scrypt run.
#[derive(Debug, Clone, Copy)]
pub struct SystemProbe {
    window: Duration,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(100),
        }
    }
}

impl SystemProbe {
    /// Uses `window` as the CPU benchmark length.
    pub fn with_window(window: Duration) -> Self {
        Self { window }
    }
}

impl ResourceProbe for SystemProbe {
    fn memory_limit(&self) -> Result<usize, StatusCode> {
        system_memory_limit()
    }

    fn salsa_ops_per_second(&self) -> Result<f64, StatusCode> {
        // N=16, r=1, p=1 invokes the salsa20/8 core 512 times.
        const OPS_PER_RUN: u64 = 512;

        let params = scrypt::Params::new(4, 1, 1, 64).map_err(|_| StatusCode::DERIVATION)?;
        let mut scratch = [0u8; 64];

        let start = Instant::now();
        let mut ops: u64 = 0;
        loop {
            scrypt::scrypt(&[], &[], &params, &mut scratch)
                .map_err(|_| StatusCode::DERIVATION)?;
            ops += OPS_PER_RUN;

            let elapsed = start.elapsed();
            if elapsed >= self.window {
                let secs = elapsed.as_secs_f64();
                if secs <= 0.0 {
                    return Err(StatusCode::CLOCK);
                }
                return Ok(ops as f64 / secs);
            }
        }
    }
}

#[cfg(unix)]
fn system_memory_limit() -> Result<usize, StatusCode> {
    let mut limit = usize::MAX;

    for resource in [libc::RLIMIT_AS, libc::RLIMIT_DATA] {
        let mut rl = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: `rl` is a valid, writable rlimit for the duration of the call.
        if unsafe { libc::getrlimit(resource, &mut rl) } != 0 {
            return Err(StatusCode::RESOURCE_PROBE);
        }
        if rl.rlim_cur != libc::RLIM_INFINITY {
            limit = limit.min(usize::try_from(rl.rlim_cur).unwrap_or(usize::MAX));
        }
    }

    // SAFETY: sysconf only reads configuration values.
    let (pages, page_size) =
        unsafe { (libc::sysconf(libc::_SC_PHYS_PAGES), libc::sysconf(libc::_SC_PAGESIZE)) };
    if pages > 0 && page_size > 0 {
        let physical = usize::try_from(pages)
            .ok()
            .zip(usize::try_from(page_size).ok())
            .and_then(|(pages, size)| pages.checked_mul(size))
            .unwrap_or(usize::MAX);
        limit = limit.min(physical);
    }

    Ok(limit)
}

#[cfg(not(unix))]
fn system_memory_limit() -> Result<usize, StatusCode> {
    Ok(usize::MAX)
}

/// Reports fixed figures instead of measuring.
///
/// Useful when the host was benchmarked once up front, and for reproducible
/// parameter selection in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedProbe {
    memory: usize,
    ops_per_second: f64,
}

impl FixedProbe {
    pub fn new(memory: usize, ops_per_second: f64) -> Self {
        Self {
            memory,
            ops_per_second,
        }
    }
}

impl ResourceProbe for FixedProbe {
    fn memory_limit(&self) -> Result<usize, StatusCode> {
        Ok(self.memory)
    }

    fn salsa_ops_per_second(&self) -> Result<f64, StatusCode> {
        Ok(self.ops_per_second)
    }
}
