//! Key derivation: collapses the shared group secret into a symmetric key.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of the derived symmetric key in bytes (SHA-256 output).
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// The usable output of a completed exchange: 32 bytes of keying material.
///
/// Zeroized on drop; `Debug` prints a fingerprint rather than the key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }

    /// Lowercase hex rendering, for display and logging at the caller's
    /// discretion.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey({}..)", hex::encode(&self.0[..4]))
    }
}

/// Derives the symmetric key as SHA-256 over the final key's big-endian
/// byte encoding.
///
/// Deterministic and total for any non-negative integer input. The
/// canonical encoding is `BigUint::to_bytes_be`, which yields the single
/// byte `0x00` for zero (never exercised by the protocol, whose final keys
/// are always at least 1).
pub fn derive_symmetric_key(final_key: &BigUint) -> SymmetricKey {
    let digest = Sha256::digest(final_key.to_bytes_be());
    SymmetricKey(digest.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_32_bytes() {
        let key = derive_symmetric_key(&BigUint::from(42u32));
        assert_eq!(key.as_bytes().len(), SYMMETRIC_KEY_LEN);
        assert_eq!(key.to_hex().len(), 2 * SYMMETRIC_KEY_LEN);
    }

    #[test]
    fn matches_reference_sha256_of_canonical_encoding() {
        for value in [1u64, 255, 256, 0xDEADBEEF, u64::MAX] {
            let final_key = BigUint::from(value);
            let expected: [u8; 32] = Sha256::digest(final_key.to_bytes_be()).into();
            assert_eq!(derive_symmetric_key(&final_key).as_bytes(), &expected);
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let final_key = BigUint::from(9876543210u64);
        assert_eq!(
            derive_symmetric_key(&final_key),
            derive_symmetric_key(&final_key)
        );
    }

    #[test]
    fn distinct_inputs_yield_distinct_keys() {
        assert_ne!(
            derive_symmetric_key(&BigUint::from(1u32)),
            derive_symmetric_key(&BigUint::from(2u32))
        );
    }

    #[test]
    fn debug_output_is_truncated() {
        let key = derive_symmetric_key(&BigUint::from(7u32));
        let shown = format!("{:?}", key);
        assert!(shown.len() < 2 * SYMMETRIC_KEY_LEN);
    }
}
