//! Threaded simulation: one OS thread per non-coordinator participant.
//!
//! The sequential engine in [`crate::exchange`] runs every party's steps in
//! one call stack. This module models the protocol the way a deployment
//! would: each participant is an independent unit of execution holding its
//! own private key, and all key material that crosses a party boundary
//! travels over a channel. The coordinator runs on the calling thread,
//! suspends only on per-recipient sends and receives, and treats a silent
//! participant as a recoverable fault that aborts the run.
//!
//! Message plumbing for reporting final keys back to the coordinator exists
//! for verification only and is not counted toward the protocol's `2N - 1`
//! communication bound.

use crate::accounting::{tree_message_count, CommunicationTally};
use crate::error::ExchangeError;
use crate::exchange::{
    combine_coordinator, combine_participant, compute_intermediates, distribute,
    verify_agreement, ReceivedIntermediateSet, MIN_PARTICIPANTS,
};
use crate::kdf::{derive_symmetric_key, SymmetricKey};
use crate::keygen::{KeyPair, PublicKey, RECOMMENDED_PRIVATE_KEY_BYTES};
use crate::params::DomainParameters;
use num_bigint::BigUint;
use rand::rngs::OsRng;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the coordinator waits for any single participant message
/// before aborting the run.
pub const PARTICIPANT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one threaded run.
#[derive(Clone, Debug)]
pub struct ThreadedOutcome {
    pub shared_key: BigUint,
    pub symmetric_key: SymmetricKey,
    pub tally: CommunicationTally,
}

/// What the coordinator sends each participant in phase 2.
struct DistributeMsg {
    coordinator_public: PublicKey,
    received: ReceivedIntermediateSet,
}

/// Everything a participant thread reports back to the coordinator.
enum ParticipantReport {
    Public { index: usize, public_key: PublicKey },
    Final { index: usize, final_key: BigUint },
    Failed { index: usize, error: ExchangeError },
}

/// Runs the full exchange with each non-coordinator participant on its own
/// thread, drawing keys from the operating system's secure source.
///
/// # Errors
/// - [`ExchangeError::InsufficientParties`] if `n < 3`, before any thread
///   is spawned.
/// - [`ExchangeError::Unresponsive`] if a participant misses
///   [`PARTICIPANT_TIMEOUT`].
/// - Any error a participant reports (randomness failure), and
///   [`ExchangeError::KeyMismatch`] if the independently computed final
///   keys disagree.
pub fn run_threaded(params: &DomainParameters, n: usize) -> Result<ThreadedOutcome, ExchangeError> {
    if n < MIN_PARTICIPANTS {
        return Err(ExchangeError::InsufficientParties { n });
    }

    thread::scope(|scope| {
        let (report_tx, report_rx) = channel::<ParticipantReport>();
        let mut inboxes: Vec<Sender<DistributeMsg>> = Vec::with_capacity(n - 1);

        for index in 1..n {
            let (inbox_tx, inbox_rx) = channel::<DistributeMsg>();
            inboxes.push(inbox_tx);
            let report_tx = report_tx.clone();
            scope.spawn(move || participant_task(index, params, inbox_rx, report_tx));
        }
        drop(report_tx);

        // `inboxes` moves in so an early error drops them, unblocking any
        // participant still waiting on `recv` before the scope joins.
        coordinate(params, n, inboxes, &report_rx)
    })
}

/// One non-coordinator participant: generate keys, announce the public
/// key, wait for the intermediates, combine, report.
fn participant_task(
    index: usize,
    params: &DomainParameters,
    inbox: Receiver<DistributeMsg>,
    report: Sender<ParticipantReport>,
) {
    let pair = match KeyPair::generate(&mut OsRng, RECOMMENDED_PRIVATE_KEY_BYTES, params) {
        Ok(pair) => pair,
        Err(error) => {
            let _ = report.send(ParticipantReport::Failed { index, error });
            return;
        }
    };
    if report
        .send(ParticipantReport::Public {
            index,
            public_key: pair.public.clone(),
        })
        .is_err()
    {
        return; // coordinator already gone, run aborted
    }

    // The full intermediate set arrives in one message, so the final key
    // cannot be combined from partial inputs.
    let msg = match inbox.recv() {
        Ok(msg) => msg,
        Err(_) => return,
    };
    debug_assert_eq!(msg.received.recipient, index);

    let final_key = combine_participant(&pair, &msg.coordinator_public, &msg.received, params);
    let _ = report.send(ParticipantReport::Final { index, final_key });
}

/// The coordinator's side of the threaded run.
fn coordinate(
    params: &DomainParameters,
    n: usize,
    inboxes: Vec<Sender<DistributeMsg>>,
    reports: &Receiver<ParticipantReport>,
) -> Result<ThreadedOutcome, ExchangeError> {
    let mut tally = CommunicationTally::new();

    let coordinator = KeyPair::generate(&mut OsRng, RECOMMENDED_PRIVATE_KEY_BYTES, params)?;
    tally.record_broadcast();

    // Phase 1: collect every participant's broadcast, in whatever order
    // the threads produce them.
    debug!(n, "collecting public key broadcasts");
    let mut public_keys: Vec<Option<PublicKey>> = vec![None; n];
    public_keys[0] = Some(coordinator.public.clone());
    let mut received = 1;
    while received < n {
        match recv_report(reports, &public_keys)? {
            ParticipantReport::Public { index, public_key } => {
                public_keys[index] = Some(public_key);
                tally.record_broadcast();
                received += 1;
            }
            ParticipantReport::Failed { index, error } => {
                warn!(index, %error, "participant failed during key generation");
                return Err(error);
            }
            ParticipantReport::Final { index, .. } => {
                // A final key before distribution means the plumbing is
                // broken, not the protocol inputs.
                unreachable!("participant {index} combined before distribution");
            }
        }
    }
    let public_keys: Vec<PublicKey> = public_keys
        .into_iter()
        .map(|key| key.expect("all broadcasts received"))
        .collect();

    // Phase 2: compute and send each participant its intermediate set.
    debug!("distributing intermediate keys");
    let intermediates = compute_intermediates(&coordinator, &public_keys, params);
    for set in distribute(&intermediates, n) {
        let recipient = set.recipient;
        let msg = DistributeMsg {
            coordinator_public: coordinator.public.clone(),
            received: set,
        };
        if inboxes[recipient - 1].send(msg).is_err() {
            return Err(ExchangeError::Unresponsive { index: recipient });
        }
        tally.record_directed();
    }

    // Combine: the coordinator's own view plus every reported view.
    let mut final_keys: Vec<Option<BigUint>> = vec![None; n];
    final_keys[0] = Some(combine_coordinator(&coordinator, &public_keys, params));
    let mut reported = 1;
    while reported < n {
        match recv_report(reports, &final_keys)? {
            ParticipantReport::Final { index, final_key } => {
                final_keys[index] = Some(final_key);
                reported += 1;
            }
            ParticipantReport::Failed { index, error } => {
                warn!(index, %error, "participant failed during combination");
                return Err(error);
            }
            ParticipantReport::Public { index, .. } => {
                unreachable!("participant {index} broadcast twice");
            }
        }
    }
    let final_keys: Vec<BigUint> = final_keys
        .into_iter()
        .map(|key| key.expect("all final keys reported"))
        .collect();
    verify_agreement(&final_keys)?;

    debug_assert_eq!(tally.total(), tree_message_count(n));
    let shared_key = final_keys[0].clone();
    let symmetric_key = derive_symmetric_key(&shared_key);
    info!(
        n,
        messages = tally.total(),
        "threaded exchange complete; all final keys agree"
    );
    Ok(ThreadedOutcome {
        shared_key,
        symmetric_key,
        tally,
    })
}

/// Receives one report, mapping a timeout or hangup to the first
/// participant that has not delivered yet.
fn recv_report<T>(
    reports: &Receiver<ParticipantReport>,
    pending: &[Option<T>],
) -> Result<ParticipantReport, ExchangeError> {
    reports
        .recv_timeout(PARTICIPANT_TIMEOUT)
        .map_err(|_| ExchangeError::Unresponsive {
            index: first_missing(pending),
        })
}

fn first_missing<T>(slots: &[Option<T>]) -> usize {
    slots
        .iter()
        .position(Option::is_none)
        .unwrap_or(slots.len())
}
