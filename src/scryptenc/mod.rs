//! Pure-Rust scrypt backend and the `scrypt` container format.
//!
//! A container is a [`Header`] followed by the AES-256-CTR ciphertext and an
//! HMAC-SHA256 over everything before it, 128 bytes of overhead in total.

pub mod header;
pub mod pick;
pub mod probe;

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::Mac;
use tracing::debug;
use zeroize::Zeroizing;

pub use header::{Header, HeaderInfo};
pub use pick::Limits;
pub use probe::{FixedProbe, ResourceProbe, SystemProbe};

use crate::params::{Budget, CostParams};
use crate::primitive::{Primitive, StatusCode};
use header::HmacSha256;

/// Length of the random salt (32 bytes).
pub const SALT_LEN: usize = 32;
/// Length of each HMAC-SHA256 tag (32 bytes).
pub const MAC_LEN: usize = 32;
/// Bytes a container adds to its plaintext: header plus trailing MAC.
pub const CONTAINER_OVERHEAD: usize = Header::LEN + MAC_LEN;
/// Length of the scrypt output split into cipher and MAC keys.
const DK_LEN: usize = 64;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// The default [`Primitive`], parameterised over how it measures the host.
#[derive(Debug, Clone, Default)]
pub struct Scryptenc<P = SystemProbe> {
    probe: P,
}

impl Scryptenc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: ResourceProbe> Scryptenc<P> {
    pub fn with_probe(probe: P) -> Self {
        Self { probe }
    }

    /// Derives the 64-byte cipher/MAC key pair for a container.
    fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8],
        params: CostParams,
    ) -> Result<Zeroizing<[u8; DK_LEN]>, StatusCode> {
        let mut dk = Zeroizing::new([0u8; DK_LEN]);
        self.derive(password, salt, params, dk.as_mut_slice())?;
        Ok(dk)
    }
}

impl<P: ResourceProbe> Primitive for Scryptenc<P> {
    fn derive(
        &self,
        password: &[u8],
        salt: &[u8],
        params: CostParams,
        out: &mut [u8],
    ) -> Result<(), StatusCode> {
        let working_set = 128u64
            .checked_mul(u64::from(params.r()))
            .and_then(|r128| params.n().checked_add(u64::from(params.p()))?.checked_mul(r128))
            .ok_or(StatusCode::DERIVATION)?;
        let available = self
            .probe
            .memory_limit()
            .map_err(|_| StatusCode::DERIVATION)?;
        if working_set > available as u64 {
            debug!(working_set, available, "scrypt working set does not fit in memory");
            return Err(StatusCode::DERIVATION);
        }

        let scrypt_params = scrypt::Params::new(params.log_n(), params.r(), params.p(), DK_LEN)
            .map_err(|_| StatusCode::DERIVATION)?;
        scrypt::scrypt(password, salt, &scrypt_params, out).map_err(|_| StatusCode::DERIVATION)
    }

    fn encrypt_buf(
        &self,
        plaintext: &[u8],
        password: &[u8],
        budget: &Budget,
        out: &mut [u8],
    ) -> Result<(), StatusCode> {
        if plaintext.len().checked_add(CONTAINER_OVERHEAD) != Some(out.len()) {
            return Err(StatusCode::OUTPUT_WRITE);
        }

        let params = Limits::resolve(&self.probe, budget)?.pick()?;
        debug!(
            log_n = params.log_n(),
            r = params.r(),
            p = params.p(),
            "picked scrypt parameters"
        );

        let mut salt = [0u8; SALT_LEN];
        getrandom::fill(&mut salt).map_err(|_| StatusCode::ENTROPY)?;

        let dk = self.derive_key(password, &salt, params)?;
        let (enc_key, mac_key) = dk.split_at(DK_LEN / 2);

        let (head, rest) = out.split_at_mut(Header::LEN);
        head.copy_from_slice(&Header::new(params, salt).seal(mac_key)?);

        let (body, tag) = rest.split_at_mut(plaintext.len());
        body.copy_from_slice(plaintext);
        apply_keystream(enc_key, body)?;

        let mut mac = HmacSha256::new_from_slice(mac_key).map_err(|_| StatusCode::CRYPTO)?;
        mac.update(head);
        mac.update(body);
        tag.copy_from_slice(&mac.finalize().into_bytes());

        Ok(())
    }

    fn decrypt_buf(
        &self,
        ciphertext: &[u8],
        password: &[u8],
        budget: &Budget,
        out: &mut [u8],
    ) -> Result<usize, StatusCode> {
        let header = Header::from_bytes(ciphertext)?;
        let params = *header.params();
        debug!(
            log_n = params.log_n(),
            r = params.r(),
            p = params.p(),
            "container declares scrypt parameters"
        );

        Limits::resolve(&self.probe, budget)?.check(&params)?;

        let dk = self.derive_key(password, header.salt(), params)?;
        let (enc_key, mac_key) = dk.split_at(DK_LEN / 2);
        Header::verify_mac(ciphertext, mac_key)?;

        let (authenticated, tag) = ciphertext.split_at(ciphertext.len() - MAC_LEN);
        let mut mac = HmacSha256::new_from_slice(mac_key).map_err(|_| StatusCode::CRYPTO)?;
        mac.update(authenticated);
        mac.verify_slice(tag).map_err(|_| StatusCode::MALFORMED)?;

        let body = &authenticated[Header::LEN..];
        let plaintext = out.get_mut(..body.len()).ok_or(StatusCode::OUTPUT_WRITE)?;
        plaintext.copy_from_slice(body);
        apply_keystream(enc_key, plaintext)?;

        Ok(body.len())
    }
}

fn apply_keystream(key: &[u8], buf: &mut [u8]) -> Result<(), StatusCode> {
    let mut cipher =
        Aes256Ctr::new_from_slices(key, &[0u8; 16]).map_err(|_| StatusCode::CRYPTO)?;
    cipher.apply_keystream(buf);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> Scryptenc<FixedProbe> {
        Scryptenc::with_probe(FixedProbe::new(1 << 30, 1e6))
    }

    fn budget() -> Budget {
        Budget::ENCRYPT.with_max_time(0.1)
    }

    fn seal(backend: &Scryptenc<FixedProbe>, plaintext: &[u8], password: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; plaintext.len() + CONTAINER_OVERHEAD];
        backend.encrypt_buf(plaintext, password, &budget(), &mut out).unwrap();
        out
    }

    #[test]
    fn container_roundtrip() {
        let backend = backend();
        let sealed = seal(&backend, b"secret data", b"pw");

        let mut out = vec![0u8; sealed.len()];
        let used = backend
            .decrypt_buf(&sealed, b"pw", &Budget::DECRYPT, &mut out)
            .unwrap();
        assert_eq!(&out[..used], b"secret data");
    }

    #[test]
    fn ciphertext_hides_plaintext() {
        let sealed = seal(&backend(), b"AAAAAAAAAAAAAAAA", b"pw");
        let body = &sealed[Header::LEN..sealed.len() - MAC_LEN];
        assert_ne!(body, b"AAAAAAAAAAAAAAAA");
    }

    #[test]
    fn salts_differ_between_encryptions() {
        let backend = backend();
        let a = seal(&backend, b"x", b"pw");
        let b = seal(&backend, b"x", b"pw");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_password_is_reported_and_writes_nothing() {
        let backend = backend();
        let sealed = seal(&backend, b"secret", b"right");

        let mut out = vec![0u8; sealed.len()];
        let result = backend.decrypt_buf(&sealed, b"wrong", &Budget::DECRYPT, &mut out);
        assert_eq!(result, Err(StatusCode::PASSWORD_INCORRECT));
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn tampered_body_is_malformed() {
        let backend = backend();
        let mut sealed = seal(&backend, b"secret", b"pw");
        sealed[Header::LEN] ^= 0x80;

        let mut out = vec![0u8; sealed.len()];
        let result = backend.decrypt_buf(&sealed, b"pw", &Budget::DECRYPT, &mut out);
        assert_eq!(result, Err(StatusCode::MALFORMED));
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn short_output_buffer_is_rejected() {
        let mut out = vec![0u8; 10];
        let result = backend().encrypt_buf(b"0123456789", b"pw", &budget(), &mut out);
        assert_eq!(result, Err(StatusCode::OUTPUT_WRITE));
    }

    #[test]
    fn derive_matches_rfc7914_vector() {
        let mut out = [0u8; 64];
        backend()
            .derive(b"", b"", CostParams::new(16, 1, 1).unwrap(), &mut out)
            .unwrap();
        assert_eq!(
            out[..8],
            [0x77, 0xd6, 0x57, 0x62, 0x38, 0x65, 0x7b, 0x20]
        );
    }

    #[test]
    fn derive_refuses_working_set_beyond_memory() {
        let backend = Scryptenc::with_probe(FixedProbe::new(1 << 20, 1e6));
        let mut out = [0u8; 64];
        let params = CostParams::new(1 << 20, 8, 1).unwrap();
        let result = backend.derive(b"pw", b"salt", params, &mut out);
        assert_eq!(result, Err(StatusCode::DERIVATION));
    }

    #[test]
    fn derive_rejects_zero_block_size() {
        let mut out = [0u8; 64];
        let params = CostParams::new(16, 0, 1).unwrap();
        let result = backend().derive(b"pw", b"salt", params, &mut out);
        assert_eq!(result, Err(StatusCode::DERIVATION));
    }
}
