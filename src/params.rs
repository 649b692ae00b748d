//! Domain parameters for the multiplicative group used by the exchange.

use crate::error::ExchangeError;
use num_bigint::BigUint;
use num_traits::One;

/// Minimum modulus size accepted by [`DomainParameters::new`].
///
/// 2048 bits matches current guidance for finite-field Diffie-Hellman.
/// Smaller demonstration moduli must go through
/// [`DomainParameters::new_insecure`] so the choice is visible at the call
/// site.
pub const MIN_PRODUCTION_MODULUS_BITS: u64 = 2048;

/// The 2048-bit MODP prime from RFC 3526, group 14.
const RFC3526_GROUP14_P: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74",
    "020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437",
    "4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05",
    "98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB",
    "9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718",
    "3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

/// Fixed modulus and generator shared by every participant of one protocol
/// run.
///
/// Always passed explicitly into the functions that need it, never held as
/// ambient state, so concurrent runs (and tests) cannot interfere with each
/// other. The modulus is presumed prime; primality is the caller's
/// responsibility when supplying custom parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainParameters {
    p: BigUint,
    g: BigUint,
}

impl DomainParameters {
    /// Creates production-grade domain parameters.
    ///
    /// # Errors
    /// Returns [`ExchangeError::InvalidDomainParameters`] if `g` is not in
    /// `(1, p)`, if `p` is even, or if `p` is shorter than
    /// [`MIN_PRODUCTION_MODULUS_BITS`].
    pub fn new(p: BigUint, g: BigUint) -> Result<Self, ExchangeError> {
        if p.bits() < MIN_PRODUCTION_MODULUS_BITS {
            return Err(ExchangeError::InvalidDomainParameters(format!(
                "modulus is {} bits, minimum is {}",
                p.bits(),
                MIN_PRODUCTION_MODULUS_BITS
            )));
        }
        Self::new_insecure(p, g)
    }

    /// Creates domain parameters without the minimum-size check.
    ///
    /// Intended for demonstrations and tests that use small primes for
    /// speed. Structural validity is still enforced.
    ///
    /// # Errors
    /// Returns [`ExchangeError::InvalidDomainParameters`] if `g` is not in
    /// `(1, p)` or if `p` is even.
    pub fn new_insecure(p: BigUint, g: BigUint) -> Result<Self, ExchangeError> {
        if p.bits() < 3 {
            return Err(ExchangeError::InvalidDomainParameters(
                "modulus too small to contain a private-key range".to_string(),
            ));
        }
        if !p.bit(0) {
            return Err(ExchangeError::InvalidDomainParameters(
                "modulus must be odd".to_string(),
            ));
        }
        if g <= BigUint::one() || g >= p {
            return Err(ExchangeError::InvalidDomainParameters(format!(
                "generator must lie in (1, p), got {}",
                g
            )));
        }
        Ok(DomainParameters { p, g })
    }

    /// The well-known 2048-bit MODP group 14 from RFC 3526, with `g = 2`.
    pub fn rfc3526_group14() -> Self {
        let p = BigUint::parse_bytes(RFC3526_GROUP14_P.as_bytes(), 16)
            .expect("RFC 3526 group 14 constant parses as hex");
        DomainParameters::new(p, BigUint::from(2u32))
            .expect("RFC 3526 group 14 constant is valid")
    }

    /// Prime modulus `p`.
    pub fn p(&self) -> &BigUint {
        &self.p
    }

    /// Generator `g`.
    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// `p - 1`, the modulus for private-key reduction.
    pub fn p_minus_one(&self) -> BigUint {
        &self.p - 1u32
    }
}
