//! Error types for the tree-based group key exchange.

use thiserror::Error;

/// Errors surfaced by the key exchange engine and its supporting pieces.
///
/// All of these are synchronous failures of a single protocol run; none are
/// recoverable through retry without changing the inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The tree-based protocol needs at least three parties.
    #[error("at least 3 participants required, got {n}")]
    InsufficientParties { n: usize },

    /// The secure random source failed during private-key generation.
    /// Never degraded to a weaker source.
    #[error("secure randomness source unavailable")]
    InsufficientRandomness,

    /// A participant's independently computed final key disagrees with the
    /// coordinator's. Indicates inconsistent domain parameters or a bug;
    /// always surfaced.
    #[error("final key mismatch at participant {index}")]
    KeyMismatch { index: usize },

    /// The modulus/generator pair failed validation.
    #[error("invalid domain parameters: {0}")]
    InvalidDomainParameters(String),

    /// A participant in the threaded simulation did not deliver a message
    /// within the timeout. The run is aborted, not the process.
    #[error("participant {index} did not respond in time")]
    Unresponsive { index: usize },
}
