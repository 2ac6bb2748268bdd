use crate::types::{Amount, DerivedStatus, Proposal};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// A proposal selected for payment at a superblock
#[derive(Debug, Clone)]
pub struct Allotment {
    pub proposal: Proposal,
    /// Status with `allotted` filled in
    pub status: DerivedStatus,
    pub allotted: Amount,
    /// Sum of allotments up to and including this one
    pub running_total: Amount,
}

/// Why the maintenance sweep drops a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Expired,
    Invalid,
}

impl RemovalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalReason::Expired => "expired",
            RemovalReason::Invalid => "invalid",
        }
    }
}

/// Ranks candidates and fills the superblock budget
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    removal_grace_blocks: u64,
}

impl AllocationEngine {
    pub fn new(removal_grace_blocks: u64) -> Self {
        Self {
            removal_grace_blocks,
        }
    }

    /// Ranking order for funding.
    ///
    /// 1. Higher net approval
    /// 2. Lexicographically smaller proposal hash
    pub fn compare(a: (&Proposal, &DerivedStatus), b: (&Proposal, &DerivedStatus)) -> Ordering {
        b.1.tally
            .net_approval()
            .cmp(&a.1.tally.net_approval())
            .then_with(|| a.0.hash.cmp(&b.0.hash))
    }

    /// Select the proposals paid from `budget`.
    ///
    /// Only established, valid candidates are considered. A candidate that
    /// does not fit the remaining budget is skipped and lower-ranked ones are
    /// still tried. The result is in selection order and does not depend on
    /// the order of `candidates`.
    pub fn select_funded(
        &self,
        candidates: Vec<(Proposal, DerivedStatus)>,
        budget: Amount,
    ) -> Vec<Allotment> {
        let mut ranked: Vec<(Proposal, DerivedStatus)> = candidates
            .into_iter()
            .filter(|(_, status)| status.is_fundable())
            .collect();
        ranked.sort_by(|a, b| Self::compare((&a.0, &a.1), (&b.0, &b.1)));

        let mut running = Amount::ZERO;
        let mut selected = Vec::new();

        for (proposal, mut status) in ranked {
            let fits = running
                .checked_add(proposal.amount)
                .filter(|total| *total <= budget);

            let Some(total) = fits else {
                debug!(
                    proposal = proposal.short_id(),
                    amount = %proposal.amount,
                    remaining = %budget.saturating_sub(running),
                    "Proposal does not fit remaining budget"
                );
                continue;
            };

            running = total;
            status.allotted = proposal.amount;
            selected.push(Allotment {
                allotted: proposal.amount,
                running_total: running,
                proposal,
                status,
            });
        }

        selected
    }

    /// Removal decision for the maintenance sweep.
    ///
    /// A valid, unexpired proposal is always kept. Invalid proposals get
    /// `removal_grace_blocks` to collect enough votes before they go.
    pub fn removal_reason(
        &self,
        proposal: &Proposal,
        status: &DerivedStatus,
        current_height: u64,
    ) -> Option<RemovalReason> {
        if proposal.is_expired(current_height) {
            return Some(RemovalReason::Expired);
        }

        if !status.is_valid() && proposal.age(current_height) > self.removal_grace_blocks {
            return Some(RemovalReason::Invalid);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InvalidReason, PayoutAddress, Tally, Validity};

    fn proposal(name: &str, amount: u64) -> Proposal {
        let address = PayoutAddress::from_bytes(vec![3; 20]);
        let amount = Amount::from_coins(amount);
        Proposal {
            name: name.to_string(),
            url: "https://budget.example".to_string(),
            hash: Proposal::compute_hash(name, "https://budget.example", 100, 200, amount, &address),
            fee_tx_hash: [9; 32],
            payout_address: address,
            amount,
            payment_count: 1,
            start_height: 100,
            end_height: 200,
            creation_height: 10,
        }
    }

    fn status(yeas: u32, nays: u32) -> DerivedStatus {
        let tally = Tally {
            yeas,
            nays,
            abstains: 0,
        };
        DerivedStatus {
            tally,
            ratio: tally.ratio(),
            is_established: true,
            validity: Validity::Valid,
            remaining_payment_count: 1,
            allotted: Amount::ZERO,
        }
    }

    #[test]
    fn test_higher_approval_funded_first() {
        let engine = AllocationEngine::new(0);
        let p1 = proposal("p1", 100);
        let p2 = proposal("p2", 60);

        let selected = engine.select_funded(
            vec![(p2, status(10, 5)), (p1.clone(), status(20, 0))],
            Amount::from_coins(150),
        );

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].proposal.name, p1.name);
        assert_eq!(selected[0].allotted, Amount::from_coins(100));
        assert_eq!(selected[0].status.allotted, Amount::from_coins(100));
        assert_eq!(selected[0].running_total, Amount::from_coins(100));
    }

    #[test]
    fn test_second_proposal_overflows_budget() {
        let engine = AllocationEngine::new(0);
        let p1 = proposal("p1", 100);
        let p2 = proposal("p2", 950);

        let selected = engine.select_funded(
            vec![(p2, status(8, 1)), (p1.clone(), status(10, 2))],
            Amount::from_coins(1_000),
        );

        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].proposal.hash, p1.hash);
        assert_eq!(selected[0].allotted, Amount::from_coins(100));
        assert_eq!(selected[0].running_total, Amount::from_coins(100));
    }

    #[test]
    fn test_skips_and_continues() {
        let engine = AllocationEngine::new(0);
        let selected = engine.select_funded(
            vec![
                (proposal("big", 120), status(30, 0)),
                (proposal("top", 50), status(40, 0)),
                (proposal("small", 40), status(10, 0)),
            ],
            Amount::from_coins(100),
        );

        let names: Vec<&str> = selected.iter().map(|a| a.proposal.name.as_str()).collect();
        assert_eq!(names, vec!["top", "small"]);
        assert_eq!(selected[1].running_total, Amount::from_coins(90));
    }

    #[test]
    fn test_exact_fit_is_included() {
        let engine = AllocationEngine::new(0);
        let selected = engine.select_funded(
            vec![(proposal("a", 60), status(5, 0)), (proposal("b", 40), status(4, 0))],
            Amount::from_coins(100),
        );
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[1].running_total, Amount::from_coins(100));
    }

    #[test]
    fn test_tie_broken_by_hash() {
        let engine = AllocationEngine::new(0);
        let a = proposal("a", 80);
        let b = proposal("b", 80);
        let expected = if a.hash < b.hash { &a.name } else { &b.name };

        for candidates in [
            vec![(a.clone(), status(5, 1)), (b.clone(), status(6, 2))],
            vec![(b.clone(), status(6, 2)), (a.clone(), status(5, 1))],
        ] {
            let selected = engine.select_funded(candidates, Amount::from_coins(100));
            assert_eq!(selected.len(), 1);
            assert_eq!(&selected[0].proposal.name, expected);
        }
    }

    #[test]
    fn test_unfundable_filtered() {
        let engine = AllocationEngine::new(0);
        let mut young = status(50, 0);
        young.is_established = false;
        let mut rejected = status(50, 0);
        rejected.validity = Validity::Invalid(InvalidReason::RejectedByVote);

        let selected = engine.select_funded(
            vec![(proposal("young", 10), young), (proposal("rejected", 10), rejected)],
            Amount::from_coins(100),
        );
        assert!(selected.is_empty());
    }

    #[test]
    fn test_removal_reason() {
        let engine = AllocationEngine::new(50);
        let p = proposal("p", 10);
        let mut invalid = status(0, 3);
        invalid.validity = Validity::Invalid(InvalidReason::RejectedByVote);

        assert_eq!(engine.removal_reason(&p, &status(3, 0), 201), Some(RemovalReason::Expired));
        assert_eq!(engine.removal_reason(&p, &status(3, 0), 200), None);

        // creation 10, grace 50
        assert_eq!(engine.removal_reason(&p, &invalid, 60), None);
        assert_eq!(engine.removal_reason(&p, &invalid, 61), Some(RemovalReason::Invalid));
        assert_eq!(engine.removal_reason(&p, &status(3, 0), 150), None);
    }
}
