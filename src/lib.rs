//! Password-based encryption and scrypt key derivation with bounded cost.
//!
//! Three operations are exposed, on [`Scrypt`] and as free functions using
//! the default backend:
//!
//! - [`encrypt`] seals a payload into a container `plaintext.len() + 128`
//!   bytes long, picking scrypt parameters that fit the [`Budget`].
//! - [`decrypt`] opens a container, refusing to derive a key whose declared
//!   cost exceeds the [`Budget`].
//! - [`hash`] runs raw scrypt with explicit `N`, `r`, `p` and returns 64 bytes.

mod buffer;
mod error;
mod params;
mod primitive;
pub mod scryptenc;
mod storage;

pub use crate::error::{Error, Result};
pub use crate::params::{Budget, CostParams, MAX_RP, ParamError};
pub use crate::primitive::{Primitive, StatusCode};
pub use crate::scryptenc::{CONTAINER_OVERHEAD, FixedProbe, HeaderInfo, Scryptenc, SystemProbe};
pub use crate::storage::Storage;

use crate::buffer::with_output_buffer;
use crate::scryptenc::Header;
use tracing::debug;
use zeroize::Zeroizing;

/// Length of a raw [`hash`] output.
pub const HASH_LEN: usize = 64;

/// Runs the three operations against a [`Primitive`] backend.
///
/// Holds no state besides the backend, so a single value can be shared
/// across threads.
#[derive(Debug, Clone, Default)]
pub struct Scrypt<P = Scryptenc> {
    primitive: P,
}

impl Scrypt {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: Primitive> Scrypt<P> {
    pub fn with_primitive(primitive: P) -> Self {
        Self { primitive }
    }

    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    /// Encrypts `plaintext` under `password`.
    ///
    /// # Errors
    ///
    /// Returns the translated backend error; no partial output is returned.
    pub fn encrypt(
        &self,
        plaintext: impl AsRef<[u8]>,
        password: impl AsRef<[u8]>,
        budget: &Budget,
    ) -> Result<Vec<u8>> {
        let plaintext = plaintext.as_ref();
        let capacity = plaintext
            .len()
            .checked_add(CONTAINER_OVERHEAD)
            .ok_or(Error::AllocationFailed)?;
        debug!(
            len = plaintext.len(),
            max_time = budget.max_time,
            max_mem = budget.max_mem,
            max_mem_frac = budget.max_mem_frac,
            "encrypting"
        );

        let mut sealed = with_output_buffer(capacity, |out| {
            self.primitive
                .encrypt_buf(plaintext, password.as_ref(), budget, out)?;
            Ok(out.len())
        })?;

        Ok(std::mem::take(&mut *sealed))
    }

    /// Decrypts a container produced by [`Scrypt::encrypt`].
    ///
    /// # Errors
    ///
    /// Fails closed: a wrong password, a tampered container, or a declared
    /// cost above `budget` all return an error and no plaintext.
    pub fn decrypt(
        &self,
        ciphertext: impl AsRef<[u8]>,
        password: impl AsRef<[u8]>,
        budget: &Budget,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let ciphertext = ciphertext.as_ref();
        debug!(
            len = ciphertext.len(),
            max_time = budget.max_time,
            max_mem = budget.max_mem,
            max_mem_frac = budget.max_mem_frac,
            "decrypting"
        );

        with_output_buffer(ciphertext.len(), |out| {
            Ok(self
                .primitive
                .decrypt_buf(ciphertext, password.as_ref(), budget, out)?)
        })
    }

    /// Computes a 64-byte scrypt hash.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParams`] if `n`, `r`, `p` are rejected (the backend is
    /// never called), [`Error::DerivationFailed`] if the backend fails.
    pub fn hash(
        &self,
        password: impl AsRef<[u8]>,
        salt: impl AsRef<[u8]>,
        n: u64,
        r: u32,
        p: u32,
    ) -> Result<Vec<u8>> {
        let params = CostParams::new(n, r, p)?;
        self.hash_with_params(password, salt, params)
    }

    /// [`Scrypt::hash`] with pre-built parameters.
    pub fn hash_with_params(
        &self,
        password: impl AsRef<[u8]>,
        salt: impl AsRef<[u8]>,
        params: CostParams,
    ) -> Result<Vec<u8>> {
        params.validate()?;
        debug!(n = params.n(), r = params.r(), p = params.p(), "hashing");

        let mut hashed = with_output_buffer(HASH_LEN, |out| {
            self.primitive
                .derive(password.as_ref(), salt.as_ref(), params, out)
                .map_err(|status| {
                    debug!(%status, "raw derivation failed");
                    Error::DerivationFailed
                })?;
            Ok(out.len())
        })?;

        Ok(std::mem::take(&mut *hashed))
    }
}

/// Encrypts with the default backend. See [`Scrypt::encrypt`].
pub fn encrypt(
    plaintext: impl AsRef<[u8]>,
    password: impl AsRef<[u8]>,
    budget: &Budget,
) -> Result<Vec<u8>> {
    Scrypt::new().encrypt(plaintext, password, budget)
}

/// Decrypts with the default backend. See [`Scrypt::decrypt`].
pub fn decrypt(
    ciphertext: impl AsRef<[u8]>,
    password: impl AsRef<[u8]>,
    budget: &Budget,
) -> Result<Zeroizing<Vec<u8>>> {
    Scrypt::new().decrypt(ciphertext, password, budget)
}

/// Hashes with the default backend. See [`Scrypt::hash`].
pub fn hash(
    password: impl AsRef<[u8]>,
    salt: impl AsRef<[u8]>,
    n: u64,
    r: u32,
    p: u32,
) -> Result<Vec<u8>> {
    Scrypt::new().hash(password, salt, n, r, p)
}

/// Reads the cost parameters a container declares, without deriving a key.
pub fn inspect(ciphertext: impl AsRef<[u8]>) -> Result<HeaderInfo> {
    Ok(Header::from_bytes(ciphertext.as_ref())?.info())
}
