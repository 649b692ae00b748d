//! Counting of logical communication events.
//!
//! The headline guarantee of the tree-based scheme is that one run costs
//! exactly `2N - 1` messages: N broadcasts in the public-key phase plus
//! N - 1 directed sends in the distribution phase. A broadcast counts as a
//! single event regardless of fan-out.

/// Tally of logical communication events observed during one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommunicationTally {
    broadcasts: usize,
    directed: usize,
}

impl CommunicationTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one broadcast-to-all event.
    pub fn record_broadcast(&mut self) {
        self.broadcasts += 1;
    }

    /// Records one directed point-to-point send.
    pub fn record_directed(&mut self) {
        self.directed += 1;
    }

    pub fn broadcasts(&self) -> usize {
        self.broadcasts
    }

    pub fn directed(&self) -> usize {
        self.directed
    }

    /// Total events counted so far.
    pub fn total(&self) -> usize {
        self.broadcasts + self.directed
    }
}

/// Message cost of one tree-based run with `n` parties: `2n - 1`.
pub fn tree_message_count(n: usize) -> usize {
    2 * n - 1
}

/// Message cost of naive pairwise agreement among `n` parties:
/// `n(n-1)/2`.
pub fn naive_pairwise_count(n: usize) -> usize {
    n * (n - 1) / 2
}

/// Whether the tree-based scheme is strictly cheaper than pairwise
/// agreement for `n` parties. Holds for every `n >= 5`; for `n <= 4` the
/// tree scheme costs the same or more.
pub fn tree_beats_pairwise(n: usize) -> bool {
    tree_message_count(n) < naive_pairwise_count(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_sums_phases() {
        let mut tally = CommunicationTally::new();
        for _ in 0..4 {
            tally.record_broadcast();
        }
        for _ in 0..3 {
            tally.record_directed();
        }
        assert_eq!(tally.broadcasts(), 4);
        assert_eq!(tally.directed(), 3);
        assert_eq!(tally.total(), 7);
    }

    #[test]
    fn tree_cost_is_2n_minus_1() {
        for n in 3..=64 {
            assert_eq!(tree_message_count(n), 2 * n - 1);
        }
    }

    #[test]
    fn crossover_at_five_parties() {
        for n in 3..=4 {
            assert!(
                tree_message_count(n) >= naive_pairwise_count(n),
                "tree should not win at n = {n}"
            );
            assert!(!tree_beats_pairwise(n));
        }
        for n in 5..=64 {
            assert!(
                tree_message_count(n) < naive_pairwise_count(n),
                "tree should win at n = {n}"
            );
            assert!(tree_beats_pairwise(n));
        }
    }
}
