//! The key-derivation and container backend the operations are built on.

use std::fmt;

use crate::params::{Budget, CostParams};

/// Failure code reported by a [`Primitive`].
///
/// Values 1 through 13 follow the scrypt library's table and are translated
/// into [`crate::Error`] by the `From` impl in the error module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(i32);

impl StatusCode {
    pub const RESOURCE_PROBE: Self = Self(1);
    pub const CLOCK: Self = Self(2);
    pub const DERIVATION: Self = Self(3);
    pub const ENTROPY: Self = Self(4);
    pub const CRYPTO: Self = Self(5);
    pub const ALLOCATION: Self = Self(6);
    pub const MALFORMED: Self = Self(7);
    pub const UNRECOGNIZED_FORMAT: Self = Self(8);
    pub const MEMORY_BUDGET: Self = Self(9);
    pub const TIME_BUDGET: Self = Self(10);
    pub const PASSWORD_INCORRECT: Self = Self(11);
    pub const OUTPUT_WRITE: Self = Self(12);
    pub const INPUT_READ: Self = Self(13);

    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.0)
    }
}

/// A scrypt backend.
///
/// Implementations write into caller-provided buffers and keep no state
/// between calls, so one value can serve any number of threads.
pub trait Primitive: Send + Sync {
    /// Fills `out` with scrypt(password, salt, N, r, p).
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        params: CostParams,
        out: &mut [u8],
    ) -> Result<(), StatusCode>;

    /// Seals `plaintext` into `out`, which is exactly
    /// `plaintext.len() + CONTAINER_OVERHEAD` bytes long.
    fn encrypt_buf(
        &self,
        plaintext: &[u8],
        password: &[u8],
        budget: &Budget,
        out: &mut [u8],
    ) -> Result<(), StatusCode>;

    /// Opens `ciphertext` into `out` (`ciphertext.len()` bytes) and returns
    /// how many bytes of `out` hold plaintext.
    fn decrypt_buf(
        &self,
        ciphertext: &[u8],
        password: &[u8],
        budget: &Budget,
        out: &mut [u8],
    ) -> Result<usize, StatusCode>;
}

impl<T: Primitive + ?Sized> Primitive for &T {
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        params: CostParams,
        out: &mut [u8],
    ) -> Result<(), StatusCode> {
        (**self).derive(password, salt, params, out)
    }

    fn encrypt_buf(
        &self,
        plaintext: &[u8],
        password: &[u8],
        budget: &Budget,
        out: &mut [u8],
    ) -> Result<(), StatusCode> {
        (**self).encrypt_buf(plaintext, password, budget, out)
    }

    fn decrypt_buf(
        &self,
        ciphertext: &[u8],
        password: &[u8],
        budget: &Budget,
        out: &mut [u8],
    ) -> Result<usize, StatusCode> {
        (**self).decrypt_buf(ciphertext, password, budget, out)
    }
}
