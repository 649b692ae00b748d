//! Tree-Based Group Key Exchange
//!
//! This library implements a coordinator-mediated (star-topology) N-party
//! Diffie-Hellman key agreement: N >= 3 parties derive one shared secret
//! using exactly `2N - 1` point-to-point messages instead of the
//! `N(N-1)/2` a naive pairwise extension would need.
//!
//! ## Overview
//!
//! - **Key Generation**: each party draws a private exponent uniformly from
//!   `[1, p-2]` and derives its public key `g^x mod p`
//! - **Broadcast**: every party broadcasts its public key (N messages)
//! - **Distribution**: the coordinator (party 0) computes the intermediate
//!   keys `g^(x0*xi) mod p` and sends each party every intermediate except
//!   its own (N - 1 messages)
//! - **Combination**: every party independently computes the same final
//!   key, from which a 32-byte symmetric key is derived via SHA-256
//!
//! The scheme claims security against passive eavesdroppers only.
//! Compromise of the coordinator or of any single private key compromises
//! the group key; this is inherent to the construction.
//!
//! ## Example
//!
//! ```rust
//! use num_bigint::BigUint;
//! use rand::{rngs::StdRng, SeedableRng};
//! use tree_dh::{DomainParameters, GroupExchange};
//!
//! // 2^61 - 1, a Mersenne prime small enough for a quick demonstration.
//! // Production runs should use DomainParameters::new (>= 2048 bits) or
//! // DomainParameters::rfc3526_group14().
//! let params = DomainParameters::new_insecure(
//!     BigUint::from(2305843009213693951u64),
//!     BigUint::from(5u32),
//! ).unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let exchange = GroupExchange::new(params, 4).unwrap();
//! let outcome = exchange.run(&mut rng).unwrap();
//!
//! // All four parties computed the same final key in 2*4 - 1 messages.
//! assert!(outcome.final_keys.iter().all(|k| k == &outcome.shared_key));
//! assert_eq!(outcome.tally.total(), 7);
//! assert_eq!(outcome.symmetric_key.as_bytes().len(), 32);
//! ```

pub mod accounting;
pub mod error;
pub mod exchange;
pub mod kdf;
pub mod keygen;
pub mod params;
pub mod simulation;

pub use accounting::{naive_pairwise_count, tree_message_count, CommunicationTally};
pub use error::ExchangeError;
pub use exchange::{ExchangeOutcome, GroupExchange, Participant, Role};
pub use kdf::{derive_symmetric_key, SymmetricKey, SYMMETRIC_KEY_LEN};
pub use keygen::{
    derive_public_key, generate_private_key, KeyPair, PrivateKey, PublicKey,
    RECOMMENDED_PRIVATE_KEY_BYTES,
};
pub use params::DomainParameters;
pub use simulation::{run_threaded, ThreadedOutcome};
