//! The 96-byte container header.
//!
//! ```text
//! "scrypt" (6) | VERSION (1) | logN (1) | r (4, BE) | p (4, BE) | SALT (32)
//!   | SHA-256 checksum of bytes 0..48, truncated (16) | HMAC-SHA256 of bytes 0..64 (32)
//! ```

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{CONTAINER_OVERHEAD, MAC_LEN, SALT_LEN};
use crate::params::CostParams;
use crate::primitive::StatusCode;

pub const MAGIC: &[u8; MAGIC_LEN] = b"scrypt";
pub const MAGIC_LEN: usize = 6;
pub const VERSION: u8 = 0;

const PARAMS_END: usize = MAGIC_LEN + 1 + 1 + 4 + 4;
const CHECKSUM_START: usize = PARAMS_END + SALT_LEN;
const CHECKSUM_LEN: usize = 16;
const MAC_START: usize = CHECKSUM_START + CHECKSUM_LEN;

pub(crate) type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    params: CostParams,
    salt: [u8; SALT_LEN],
}

/// What `info` shows about a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderInfo {
    pub version: u8,
    pub log_n: u8,
    pub n: u64,
    pub r: u32,
    pub p: u32,
    pub memory_required: u64,
}

impl Header {
    pub const LEN: usize = MAC_START + MAC_LEN;

    pub(crate) fn new(params: CostParams, salt: [u8; SALT_LEN]) -> Self {
        Self { params, salt }
    }

    pub fn params(&self) -> &CostParams {
        &self.params
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn info(&self) -> HeaderInfo {
        HeaderInfo {
            version: VERSION,
            log_n: self.params.log_n(),
            n: self.params.n(),
            r: self.params.r(),
            p: self.params.p(),
            memory_required: self.params.memory_required(),
        }
    }

    /// Serializes the header and authenticates it under `mac_key`.
    pub(crate) fn seal(&self, mac_key: &[u8]) -> Result<[u8; Self::LEN], StatusCode> {
        let mut buf = [0u8; Self::LEN];

        buf[..MAGIC_LEN].copy_from_slice(MAGIC);
        buf[MAGIC_LEN] = VERSION;
        buf[MAGIC_LEN + 1] = self.params.log_n();
        buf[MAGIC_LEN + 2..MAGIC_LEN + 6].copy_from_slice(&self.params.r().to_be_bytes());
        buf[MAGIC_LEN + 6..PARAMS_END].copy_from_slice(&self.params.p().to_be_bytes());
        buf[PARAMS_END..CHECKSUM_START].copy_from_slice(&self.salt);

        let checksum = Sha256::digest(&buf[..CHECKSUM_START]);
        buf[CHECKSUM_START..MAC_START].copy_from_slice(&checksum[..CHECKSUM_LEN]);

        let mut mac = HmacSha256::new_from_slice(mac_key).map_err(|_| StatusCode::CRYPTO)?;
        mac.update(&buf[..MAC_START]);
        buf[MAC_START..].copy_from_slice(&mac.finalize().into_bytes());

        Ok(buf)
    }

    /// Parses the header at the start of a whole container.
    ///
    /// Does not check the header MAC; that needs the derived key.
    pub fn from_bytes(data: &[u8]) -> Result<Self, StatusCode> {
        if data.len() < MAGIC_LEN + 1 || &data[..MAGIC_LEN] != MAGIC {
            return Err(StatusCode::MALFORMED);
        }
        if data[MAGIC_LEN] != VERSION {
            return Err(StatusCode::UNRECOGNIZED_FORMAT);
        }
        if data.len() < CONTAINER_OVERHEAD {
            return Err(StatusCode::MALFORMED);
        }

        let checksum = Sha256::digest(&data[..CHECKSUM_START]);
        if checksum[..CHECKSUM_LEN] != data[CHECKSUM_START..MAC_START] {
            return Err(StatusCode::MALFORMED);
        }

        let log_n = data[MAGIC_LEN + 1];
        let r = u32::from_be_bytes(read_array(&data[MAGIC_LEN + 2..MAGIC_LEN + 6])?);
        let p = u32::from_be_bytes(read_array(&data[MAGIC_LEN + 6..PARAMS_END])?);
        if !(1..64).contains(&log_n) || r == 0 || p == 0 {
            return Err(StatusCode::MALFORMED);
        }
        let params =
            CostParams::new(1u64 << log_n, r, p).map_err(|_| StatusCode::MALFORMED)?;

        let salt = read_array(&data[PARAMS_END..CHECKSUM_START])?;

        Ok(Self { params, salt })
    }

    /// Checks the header MAC of `data` under `mac_key`.
    pub(crate) fn verify_mac(data: &[u8], mac_key: &[u8]) -> Result<(), StatusCode> {
        if data.len() < Self::LEN {
            return Err(StatusCode::MALFORMED);
        }
        let mut mac = HmacSha256::new_from_slice(mac_key).map_err(|_| StatusCode::CRYPTO)?;
        mac.update(&data[..MAC_START]);
        mac.verify_slice(&data[MAC_START..Self::LEN])
            .map_err(|_| StatusCode::PASSWORD_INCORRECT)
    }
}

fn read_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], StatusCode> {
    bytes.try_into().map_err(|_| StatusCode::MALFORMED)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [9u8; 32];

    fn sealed() -> Vec<u8> {
        let header = Header::new(CostParams::new(1 << 10, 8, 2).unwrap(), [1u8; SALT_LEN]);
        let mut data = header.seal(&KEY).unwrap().to_vec();
        data.extend_from_slice(&[0u8; MAC_LEN]);
        data
    }

    #[test]
    fn header_roundtrip() {
        let data = sealed();
        assert_eq!(Header::LEN, 96);

        let parsed = Header::from_bytes(&data).unwrap();
        assert_eq!(parsed.params().n(), 1024);
        assert_eq!(parsed.params().r(), 8);
        assert_eq!(parsed.params().p(), 2);
        assert_eq!(parsed.salt(), &[1u8; SALT_LEN]);
        assert!(Header::verify_mac(&data, &KEY).is_ok());
    }

    #[test]
    fn layout_matches_scrypt_container() {
        let data = sealed();
        assert_eq!(&data[..6], b"scrypt");
        assert_eq!(data[6], 0);
        assert_eq!(data[7], 10);
        assert_eq!(&data[8..12], &[0, 0, 0, 8]);
        assert_eq!(&data[12..16], &[0, 0, 0, 2]);
    }

    #[test]
    fn header_invalid_magic_fails() {
        let mut data = sealed();
        data[..6].copy_from_slice(b"FAILED");
        assert_eq!(Header::from_bytes(&data), Err(StatusCode::MALFORMED));
    }

    #[test]
    fn header_unsupported_version_fails() {
        let mut data = sealed();
        data[6] = 1;
        assert_eq!(
            Header::from_bytes(&data),
            Err(StatusCode::UNRECOGNIZED_FORMAT)
        );
    }

    #[test]
    fn header_too_short_fails() {
        assert_eq!(Header::from_bytes(b"scr"), Err(StatusCode::MALFORMED));
        let data = sealed();
        assert_eq!(
            Header::from_bytes(&data[..CONTAINER_OVERHEAD - 1]),
            Err(StatusCode::MALFORMED)
        );
    }

    #[test]
    fn version_is_checked_before_length() {
        let mut data = b"scrypt".to_vec();
        data.push(7);
        assert_eq!(
            Header::from_bytes(&data),
            Err(StatusCode::UNRECOGNIZED_FORMAT)
        );
    }

    #[test]
    fn corrupted_checksum_fails() {
        let mut data = sealed();
        data[20] ^= 0x01;
        assert_eq!(Header::from_bytes(&data), Err(StatusCode::MALFORMED));
    }

    #[test]
    fn out_of_range_params_are_malformed() {
        for (log_n, r, p) in [(0u8, 8u32, 1u32), (64, 8, 1), (10, 0, 1), (10, 1 << 15, 1 << 15)] {
            let mut data = sealed();
            data[7] = log_n;
            data[8..12].copy_from_slice(&r.to_be_bytes());
            data[12..16].copy_from_slice(&p.to_be_bytes());
            let checksum = Sha256::digest(&data[..CHECKSUM_START]);
            data[CHECKSUM_START..MAC_START].copy_from_slice(&checksum[..CHECKSUM_LEN]);

            assert_eq!(Header::from_bytes(&data), Err(StatusCode::MALFORMED));
        }
    }

    #[test]
    fn wrong_key_fails_mac() {
        let data = sealed();
        assert_eq!(
            Header::verify_mac(&data, &[0u8; 32]),
            Err(StatusCode::PASSWORD_INCORRECT)
        );
    }

    #[test]
    fn info_reports_memory() {
        let info = Header::from_bytes(&sealed()).unwrap().info();
        assert_eq!(info.log_n, 10);
        assert_eq!(info.memory_required, 128 * 8 * 1024);
    }
}
