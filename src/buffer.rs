//! Output buffers for a single operation.
//!
//! A buffer is allocated at its exact capacity, wiped when dropped, and
//! released on every exit path including unwinding.

use tracing::trace;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{Error, Result};

pub(crate) struct OutputBuffer {
    bytes: Zeroizing<Vec<u8>>,
}

impl OutputBuffer {
    pub(crate) fn allocate(capacity: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| Error::AllocationFailed)?;
        bytes.resize(capacity, 0);

        Ok(Self {
            bytes: Zeroizing::new(bytes),
        })
    }

    pub(crate) fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Hands the first `used` bytes to the caller.
    ///
    /// A backend reporting more than it was given is an internal error, never
    /// a silent truncation.
    pub(crate) fn into_used(self, used: usize) -> Result<Zeroizing<Vec<u8>>> {
        let capacity = self.capacity();
        if used > capacity {
            return Err(Error::Internal(format!(
                "primitive reported {used} output bytes for a {capacity}-byte buffer"
            )));
        }

        let Self { mut bytes } = self;
        bytes[used..].zeroize();
        bytes.truncate(used);
        Ok(bytes)
    }
}

/// Runs `fill` against a fresh buffer of `capacity` bytes and returns the
/// prefix it reports as written.
pub(crate) fn with_output_buffer<F>(capacity: usize, fill: F) -> Result<Zeroizing<Vec<u8>>>
where
    F: FnOnce(&mut [u8]) -> Result<usize>,
{
    trace!(capacity, "allocating output buffer");
    let mut buffer = OutputBuffer::allocate(capacity)?;
    let used = fill(buffer.as_mut_slice())?;
    buffer.into_used(used)
}
