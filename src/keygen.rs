//! Private/public key generation for one participant.

use crate::error::ExchangeError;
use crate::params::DomainParameters;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::TryRngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Recommended entropy size for [`generate_private_key`], in bytes.
pub const RECOMMENDED_PRIVATE_KEY_BYTES: usize = 32;

/// A participant's public key, `g^x mod p`. Safe to broadcast.
pub type PublicKey = BigUint;

/// A participant's private exponent, kept in `[1, p-2]`.
///
/// The wrapper overwrites the value with zero when dropped and redacts it
/// from `Debug` output. Overwriting with zero is the strongest scrub
/// available here: `BigUint` does not expose its limb buffer, so the old
/// allocation cannot be wiped in place.
#[derive(Clone)]
pub struct PrivateKey {
    value: BigUint,
}

impl PrivateKey {
    /// Wraps an externally chosen exponent.
    ///
    /// Useful for deterministic test vectors and for callers that manage
    /// their own key material.
    ///
    /// # Errors
    /// Returns [`ExchangeError::InvalidDomainParameters`] if `value` is not
    /// in `[1, p-2]`.
    pub fn from_value(value: BigUint, params: &DomainParameters) -> Result<Self, ExchangeError> {
        if value.is_zero() || value >= params.p_minus_one() {
            return Err(ExchangeError::InvalidDomainParameters(
                "private key must lie in [1, p-2]".to_string(),
            ));
        }
        Ok(PrivateKey { value })
    }

    /// The raw exponent.
    ///
    /// The caller must not let the reference outlive its use; copies made
    /// from it are outside the wrapper's zeroization.
    pub fn expose_secret(&self) -> &BigUint {
        &self.value
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.value.set_zero();
    }
}

impl ZeroizeOnDrop for PrivateKey {}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// One participant's key material.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generates a fresh pair from the supplied secure random source.
    ///
    /// # Errors
    /// Returns [`ExchangeError::InsufficientRandomness`] if the source
    /// fails.
    pub fn generate<R: TryRngCore + ?Sized>(
        rng: &mut R,
        byte_length: usize,
        params: &DomainParameters,
    ) -> Result<Self, ExchangeError> {
        let private = generate_private_key(rng, byte_length, params)?;
        let public = derive_public_key(&private, params);
        Ok(KeyPair { private, public })
    }

    /// Derives the pair deterministically from an existing exponent.
    pub fn from_private(private: PrivateKey, params: &DomainParameters) -> Self {
        let public = derive_public_key(&private, params);
        KeyPair { private, public }
    }
}

/// Draws a private exponent uniformly from `[1, p-2]`.
///
/// `byte_length` random bytes are read from `rng`, the top bit of the
/// most-significant byte is cleared, and the big-endian value is reduced
/// mod `p-1`. A zero residue maps to 1 so the result stays in range.
///
/// # Arguments
/// * `rng` - A cryptographically secure random source (must not be pseudo
///   random in production)
/// * `byte_length` - Entropy to draw, in bytes; see
///   [`RECOMMENDED_PRIVATE_KEY_BYTES`]
/// * `params` - The domain parameters supplying `p`
///
/// # Errors
/// Returns [`ExchangeError::InsufficientRandomness`] if the source fails.
/// A failed source is fatal to the run, never replaced by a weaker one.
///
/// # Panics
/// Panics in debug mode if `byte_length` is zero.
pub fn generate_private_key<R: TryRngCore + ?Sized>(
    rng: &mut R,
    byte_length: usize,
    params: &DomainParameters,
) -> Result<PrivateKey, ExchangeError> {
    debug_assert!(byte_length > 0);

    let mut buf = vec![0u8; byte_length];
    rng.try_fill_bytes(&mut buf)
        .map_err(|_| ExchangeError::InsufficientRandomness)?;
    // Clearing the top bit mirrors a signed big-endian interpretation that
    // must stay non-negative.
    buf[0] &= 0x7f;

    let mut value = BigUint::from_bytes_be(&buf) % params.p_minus_one();
    buf.zeroize();
    if value.is_zero() {
        value = BigUint::one();
    }
    Ok(PrivateKey { value })
}

/// Derives the public key `g^x mod p`. Pure and deterministic.
pub fn derive_public_key(private: &PrivateKey, params: &DomainParameters) -> PublicKey {
    params.g().modpow(private.expose_secret(), params.p())
}
