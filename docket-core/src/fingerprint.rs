//! Content fingerprinting
//!
//! Docket identifies submitted content by a fixed 32-byte SHA-256 digest.
//! The digest is deterministic and is used as the duplicate key everywhere
//! downstream: the local store's unique constraint, the ledger duplicate
//! index, and reconciliation all compare this value.

use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::io::Read;
use thiserror::Error;

/// Error type for fingerprint parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FingerprintError {
    /// Digest has wrong length
    #[error("Invalid fingerprint length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Invalid hex string
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for FingerprintError {
    fn from(err: hex::FromHexError) -> Self {
        FingerprintError::InvalidHex(err.to_string())
    }
}

/// 32-byte content fingerprint
///
/// Wraps a SHA-256 digest. Identical bytes always yield an identical
/// fingerprint; the value is treated as the canonical content identity for
/// the rest of the pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Create a fingerprint from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Compute the fingerprint of a byte slice
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Compute the fingerprint of a byte stream
    ///
    /// Returns the digest together with the number of bytes consumed (which
    /// feeds the submission `size` metadata). Fails only when the stream
    /// cannot be fully read; the error is surfaced to the caller, never
    /// retried here.
    pub fn from_reader<R: Read>(mut reader: R) -> std::io::Result<(Self, u64)> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            total += n as u64;
        }
        Ok((Self(hasher.finalize().into()), total))
    }

    /// Parse a fingerprint from a hex string
    pub fn from_hex(s: &str) -> Result<Self, FingerprintError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(FingerprintError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Convert to a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create a zero fingerprint (null marker)
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Check if this is a zero fingerprint
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = Fingerprint::of(b"report-v1");
        let b = Fingerprint::of(b"report-v1");
        assert_eq!(a, b);

        let c = Fingerprint::of(b"report-v2");
        assert_ne!(a, c);
    }

    #[test]
    fn reader_matches_slice() {
        let data = vec![0xabu8; 20_000];
        let from_slice = Fingerprint::of(&data);
        let (from_reader, n) = Fingerprint::from_reader(&data[..]).unwrap();
        assert_eq!(from_slice, from_reader);
        assert_eq!(n, 20_000);
    }

    #[test]
    fn hex_roundtrip() {
        let original = Fingerprint::of(b"some content");
        let parsed = Fingerprint::from_hex(&original.to_hex()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn rejects_short_hex() {
        let err = Fingerprint::from_hex("abcd").unwrap_err();
        assert!(matches!(err, FingerprintError::InvalidLength { .. }));
    }

    #[test]
    fn zero_marker() {
        assert!(Fingerprint::zero().is_zero());
        assert!(!Fingerprint::of(b"x").is_zero());
    }
}
