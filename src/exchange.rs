//! Tree-based (star-topology) N-party Diffie-Hellman key agreement.
//!
//! One distinguished party, the coordinator, mediates the exchange so that
//! N parties agree on a group secret in `2N - 1` messages instead of the
//! `N(N-1)/2` a pairwise scheme needs:
//!
//! 1. Every party broadcasts its public key (`N` events).
//! 2. The coordinator raises each other party's public key to its own
//!    private exponent, producing `IntermediateKey[i] = g^(x0*xi)`, and
//!    sends each party `j` every intermediate except its own (`N - 1`
//!    events).
//! 3. Every party combines what it holds into the same final key.
//!
//! The scheme is only secure against passive eavesdroppers; compromise of
//! the coordinator or of any single private key compromises the group key.
//! The two combination formulas are deliberately kept distinct rather than
//! collapsed into a common closed form: the coordinator multiplies its own
//! `PublicKey[i]^x0` terms while a non-coordinator multiplies its
//! `PublicKey[0]^xj` term with the received intermediates, and the two are
//! verified to agree numerically rather than assumed equal algebraically.

use crate::accounting::{tree_message_count, CommunicationTally};
use crate::error::ExchangeError;
use crate::kdf::{derive_symmetric_key, SymmetricKey};
use crate::keygen::{KeyPair, PublicKey, RECOMMENDED_PRIVATE_KEY_BYTES};
use crate::params::DomainParameters;
use num_bigint::BigUint;
use num_traits::One;
use rand::TryRngCore;
use tracing::{debug, info};

/// Minimum group size for the tree-based protocol.
pub const MIN_PARTICIPANTS: usize = 3;

/// The asymmetric role a party plays in one run.
///
/// Index 0 is the coordinator by convention; the tagged variant keeps any
/// other index from assuming coordinator duties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Coordinator,
    Participant(usize),
}

impl Role {
    /// The role of the party at `index`.
    pub fn of(index: usize) -> Self {
        if index == 0 {
            Role::Coordinator
        } else {
            Role::Participant(index)
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Role::Coordinator => 0,
            Role::Participant(index) => *index,
        }
    }
}

/// A party in the group: a stable index plus a display label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub index: usize,
    pub label: String,
}

impl Participant {
    pub fn new(index: usize) -> Self {
        Participant {
            index,
            label: format!("party-{index}"),
        }
    }

    pub fn role(&self) -> Role {
        Role::of(self.index)
    }
}

/// The intermediates the coordinator sends to one non-coordinator party.
///
/// Each entry carries the source index `i` alongside `g^(x0*xi)`; the
/// recipient's own intermediate is never included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceivedIntermediateSet {
    pub recipient: usize,
    pub intermediates: Vec<(usize, BigUint)>,
}

/// Everything one completed run produces, for callers (CLI, logging) to
/// display or verify.
#[derive(Clone, Debug)]
pub struct ExchangeOutcome {
    pub participants: Vec<Participant>,
    pub public_keys: Vec<PublicKey>,
    pub distribution: Vec<ReceivedIntermediateSet>,
    pub final_keys: Vec<BigUint>,
    pub shared_key: BigUint,
    pub symmetric_key: SymmetricKey,
    pub tally: CommunicationTally,
}

/// One configured protocol run: fixed domain parameters and group size.
#[derive(Clone, Debug)]
pub struct GroupExchange {
    params: DomainParameters,
    n: usize,
}

impl GroupExchange {
    /// Configures a run for `n` parties.
    ///
    /// # Errors
    /// Returns [`ExchangeError::InsufficientParties`] if `n` is below
    /// [`MIN_PARTICIPANTS`]. Rejected before any key material exists.
    pub fn new(params: DomainParameters, n: usize) -> Result<Self, ExchangeError> {
        if n < MIN_PARTICIPANTS {
            return Err(ExchangeError::InsufficientParties { n });
        }
        Ok(GroupExchange { params, n })
    }

    pub fn params(&self) -> &DomainParameters {
        &self.params
    }

    pub fn participant_count(&self) -> usize {
        self.n
    }

    /// Runs the full protocol with freshly generated keys.
    ///
    /// # Errors
    /// Propagates [`ExchangeError::InsufficientRandomness`] from key
    /// generation and reports [`ExchangeError::KeyMismatch`] if any
    /// participant's final key disagrees with the coordinator's.
    pub fn run<R: TryRngCore + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<ExchangeOutcome, ExchangeError> {
        debug!(n = self.n, "generating key pairs for all parties");
        let key_pairs = (0..self.n)
            .map(|_| KeyPair::generate(rng, RECOMMENDED_PRIVATE_KEY_BYTES, &self.params))
            .collect::<Result<Vec<_>, _>>()?;
        self.run_with_keys(&key_pairs)
    }

    /// Runs the protocol phases over pre-generated key material.
    ///
    /// Broadcast, coordinator computation, distribution, and combination
    /// happen in order; the communication tally is recorded as the phases
    /// execute and always lands on `2n - 1`.
    ///
    /// # Errors
    /// Returns [`ExchangeError::KeyMismatch`] if the per-party final keys
    /// disagree.
    ///
    /// # Panics
    /// Panics if `key_pairs.len()` differs from the configured party count.
    pub fn run_with_keys(&self, key_pairs: &[KeyPair]) -> Result<ExchangeOutcome, ExchangeError> {
        assert_eq!(
            key_pairs.len(),
            self.n,
            "key pair count must match participant count"
        );
        let mut tally = CommunicationTally::new();

        // Phase 1: every party broadcasts its public key. One event per
        // party, not per recipient.
        debug!(n = self.n, "phase 1: public key broadcast");
        let public_keys: Vec<PublicKey> =
            key_pairs.iter().map(|pair| pair.public.clone()).collect();
        for _ in 0..self.n {
            tally.record_broadcast();
        }

        // Phase 2: coordinator computes intermediates and sends each party
        // everything except its own.
        debug!("phase 2: coordinator computes and distributes intermediates");
        let intermediates = compute_intermediates(&key_pairs[0], &public_keys, &self.params);
        let distribution = distribute(&intermediates, self.n);
        for _ in 0..distribution.len() {
            tally.record_directed();
        }

        debug!("combining final keys");
        let mut final_keys = Vec::with_capacity(self.n);
        final_keys.push(combine_coordinator(&key_pairs[0], &public_keys, &self.params));
        for set in &distribution {
            final_keys.push(combine_participant(
                &key_pairs[set.recipient],
                &public_keys[0],
                set,
                &self.params,
            ));
        }
        verify_agreement(&final_keys)?;

        debug_assert_eq!(tally.total(), tree_message_count(self.n));
        let shared_key = final_keys[0].clone();
        let symmetric_key = derive_symmetric_key(&shared_key);
        info!(
            n = self.n,
            messages = tally.total(),
            "exchange complete; all final keys agree"
        );

        Ok(ExchangeOutcome {
            participants: (0..self.n).map(Participant::new).collect(),
            public_keys,
            distribution,
            final_keys,
            shared_key,
            symmetric_key,
            tally,
        })
    }
}

/// Coordinator-only step: `IntermediateKey[i] = PublicKey[i]^x0 mod p` for
/// `i = 1..N-1`, tagged with the source index.
pub fn compute_intermediates(
    coordinator: &KeyPair,
    public_keys: &[PublicKey],
    params: &DomainParameters,
) -> Vec<(usize, BigUint)> {
    let x0 = coordinator.private.expose_secret();
    public_keys
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, public)| (i, public.modpow(x0, params.p())))
        .collect()
}

/// Builds the per-recipient distribution: party `j` receives every
/// intermediate except its own.
pub fn distribute(intermediates: &[(usize, BigUint)], n: usize) -> Vec<ReceivedIntermediateSet> {
    (1..n)
        .map(|recipient| ReceivedIntermediateSet {
            recipient,
            intermediates: intermediates
                .iter()
                .filter(|(source, _)| *source != recipient)
                .cloned()
                .collect(),
        })
        .collect()
}

/// The coordinator's combination: the product of `PublicKey[i]^x0` over
/// all other parties, mod p.
pub fn combine_coordinator(
    coordinator: &KeyPair,
    public_keys: &[PublicKey],
    params: &DomainParameters,
) -> BigUint {
    let x0 = coordinator.private.expose_secret();
    let mut result = BigUint::one();
    for public in public_keys.iter().skip(1) {
        result = (result * public.modpow(x0, params.p())) % params.p();
    }
    result
}

/// A non-coordinator's combination: its own `PublicKey[0]^xj` term times
/// every received intermediate, mod p.
pub fn combine_participant(
    own: &KeyPair,
    coordinator_public: &PublicKey,
    received: &ReceivedIntermediateSet,
    params: &DomainParameters,
) -> BigUint {
    let mut result = coordinator_public.modpow(own.private.expose_secret(), params.p());
    for (_, intermediate) in &received.intermediates {
        result = (result * intermediate) % params.p();
    }
    result
}

/// Checks that every party's final key equals the coordinator's.
///
/// # Errors
/// Returns [`ExchangeError::KeyMismatch`] naming the first disagreeing
/// participant.
pub fn verify_agreement(final_keys: &[BigUint]) -> Result<(), ExchangeError> {
    for (index, key) in final_keys.iter().enumerate().skip(1) {
        if key != &final_keys[0] {
            return Err(ExchangeError::KeyMismatch { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::naive_pairwise_count;
    use crate::keygen::PrivateKey;
    use rand::{rngs::StdRng, SeedableRng};
    use sha2::{Digest, Sha256};

    fn test_params() -> DomainParameters {
        DomainParameters::new_insecure(BigUint::from(1000000007u64), BigUint::from(2u32))
            .unwrap()
    }

    fn fixed_key_pairs(values: &[u64], params: &DomainParameters) -> Vec<KeyPair> {
        values
            .iter()
            .map(|&x| {
                KeyPair::from_private(
                    PrivateKey::from_value(BigUint::from(x), params).unwrap(),
                    params,
                )
            })
            .collect()
    }

    #[test]
    fn rejects_fewer_than_three_parties() {
        for n in 0..3 {
            let err = GroupExchange::new(test_params(), n).unwrap_err();
            assert_eq!(err, ExchangeError::InsufficientParties { n });
        }
        GroupExchange::new(test_params(), 3).unwrap();
    }

    #[test]
    fn all_parties_agree_for_various_group_sizes() {
        let params = test_params();
        let mut rng = StdRng::seed_from_u64(21);
        for n in [3usize, 4, 5, 8] {
            let outcome = GroupExchange::new(params.clone(), n)
                .unwrap()
                .run(&mut rng)
                .unwrap();
            assert_eq!(outcome.final_keys.len(), n);
            for key in &outcome.final_keys {
                assert_eq!(key, &outcome.shared_key);
            }
            assert_eq!(outcome.tally.total(), tree_message_count(n));
        }
    }

    #[test]
    fn agreement_holds_for_boundary_private_keys() {
        // p = 1000000007, so p-2 = 1000000005 is the upper boundary.
        let params = test_params();
        let boundary = [
            vec![1u64, 1, 1],
            vec![1, 1000000005, 2],
            vec![1000000005, 1000000005, 1000000005, 1000000005],
            vec![1, 2, 3, 4, 1000000005],
            vec![1000000005, 1, 999999999, 37, 123456789, 2, 3, 4],
        ];
        for keys in &boundary {
            let exchange = GroupExchange::new(params.clone(), keys.len()).unwrap();
            let outcome = exchange
                .run_with_keys(&fixed_key_pairs(keys, &params))
                .unwrap();
            for key in &outcome.final_keys {
                assert_eq!(key, &outcome.shared_key);
            }
        }
    }

    #[test]
    fn end_to_end_four_party_scenario() {
        let params = test_params();
        let key_pairs = fixed_key_pairs(&[123, 456, 789, 987], &params);
        for (pair, x) in key_pairs.iter().zip([123u64, 456, 789, 987]) {
            assert_eq!(
                pair.public,
                BigUint::from(2u32).modpow(&BigUint::from(x), params.p())
            );
        }

        let exchange = GroupExchange::new(params.clone(), 4).unwrap();
        let outcome = exchange.run_with_keys(&key_pairs).unwrap();

        assert_eq!(outcome.final_keys.len(), 4);
        for key in &outcome.final_keys {
            assert_eq!(key, &outcome.final_keys[0]);
        }
        assert_eq!(outcome.tally.total(), 7);
        assert_eq!(outcome.tally.broadcasts(), 4);
        assert_eq!(outcome.tally.directed(), 3);
        assert_eq!(
            outcome.symmetric_key.as_bytes(),
            &<[u8; 32]>::from(Sha256::digest(outcome.shared_key.to_bytes_be()))
        );
    }

    #[test]
    fn three_party_result_matches_closed_form() {
        // Cross-check against the direct 3-party formula
        // g^(x0*x1) * g^(x0*x2) mod p.
        let params = test_params();
        let key_pairs = fixed_key_pairs(&[1111, 2222, 3333], &params);
        let outcome = GroupExchange::new(params.clone(), 3)
            .unwrap()
            .run_with_keys(&key_pairs)
            .unwrap();

        let x0 = BigUint::from(1111u64);
        let closed_form = (key_pairs[1].public.modpow(&x0, params.p())
            * key_pairs[2].public.modpow(&x0, params.p()))
            % params.p();
        assert_eq!(outcome.shared_key, closed_form);
    }

    #[test]
    fn no_party_receives_its_own_intermediate() {
        let params = test_params();
        let mut rng = StdRng::seed_from_u64(33);
        for n in 3..10 {
            let outcome = GroupExchange::new(params.clone(), n)
                .unwrap()
                .run(&mut rng)
                .unwrap();
            assert_eq!(outcome.distribution.len(), n - 1);
            for set in &outcome.distribution {
                assert_eq!(set.intermediates.len(), n - 2);
                assert!(set
                    .intermediates
                    .iter()
                    .all(|(source, _)| *source != set.recipient));
            }
        }
    }

    #[test]
    fn communication_count_and_crossover() {
        let params = test_params();
        let mut rng = StdRng::seed_from_u64(44);
        for n in [3usize, 4, 5, 8, 13] {
            let outcome = GroupExchange::new(params.clone(), n)
                .unwrap()
                .run(&mut rng)
                .unwrap();
            assert_eq!(outcome.tally.total(), 2 * n - 1);
            if n <= 4 {
                assert!(outcome.tally.total() >= naive_pairwise_count(n));
            } else {
                assert!(outcome.tally.total() < naive_pairwise_count(n));
            }
        }
    }

    #[test]
    fn mutated_key_after_distribution_reports_mismatch() {
        let params = test_params();
        let key_pairs = fixed_key_pairs(&[123, 456, 789, 987], &params);
        let public_keys: Vec<PublicKey> =
            key_pairs.iter().map(|pair| pair.public.clone()).collect();
        let intermediates = compute_intermediates(&key_pairs[0], &public_keys, &params);
        let distribution = distribute(&intermediates, 4);

        // Party 1 silently swaps its private key after the coordinator has
        // already distributed, as a stand-in for a bug or tampering.
        let mutated = KeyPair::from_private(
            PrivateKey::from_value(BigUint::from(457u64), &params).unwrap(),
            &params,
        );

        let mut final_keys = vec![combine_coordinator(&key_pairs[0], &public_keys, &params)];
        final_keys.push(combine_participant(
            &mutated,
            &public_keys[0],
            &distribution[0],
            &params,
        ));
        for set in &distribution[1..] {
            final_keys.push(combine_participant(
                &key_pairs[set.recipient],
                &public_keys[0],
                set,
                &params,
            ));
        }

        let err = verify_agreement(&final_keys).unwrap_err();
        assert_eq!(err, ExchangeError::KeyMismatch { index: 1 });
    }

    #[test]
    fn roles_are_fixed_by_index() {
        assert_eq!(Role::of(0), Role::Coordinator);
        assert_eq!(Role::of(3), Role::Participant(3));
        assert_eq!(Role::of(3).index(), 3);
        assert_eq!(Participant::new(0).role(), Role::Coordinator);
        assert_eq!(Participant::new(2).label, "party-2");
    }

    #[test]
    fn runs_with_production_parameters() {
        let params = DomainParameters::rfc3526_group14();
        let mut rng = StdRng::seed_from_u64(55);
        let outcome = GroupExchange::new(params, 3).unwrap().run(&mut rng).unwrap();
        assert_eq!(outcome.tally.total(), 5);
        for key in &outcome.final_keys {
            assert_eq!(key, &outcome.shared_key);
        }
    }
}
