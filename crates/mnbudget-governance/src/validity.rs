use crate::config::GovernanceConfig;
use crate::cycle::CycleScheduler;
use crate::types::{Amount, DerivedStatus, InvalidReason, Proposal, Tally, Validity};

/// Derives a proposal's status from its data, its tally and the chain height
#[derive(Debug, Clone)]
pub struct ValidityEvaluator {
    scheduler: CycleScheduler,
    establishment_blocks: u64,
    min_approval_ratio: f64,
}

impl ValidityEvaluator {
    pub fn new(scheduler: CycleScheduler, establishment_blocks: u64, min_approval_ratio: f64) -> Self {
        Self {
            scheduler,
            establishment_blocks,
            min_approval_ratio,
        }
    }

    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self::new(
            CycleScheduler::from_config(config),
            config.establishment_blocks,
            config.min_approval_ratio,
        )
    }

    /// Old enough to be funded
    pub fn is_established(&self, proposal: &Proposal, current_height: u64) -> bool {
        proposal.age(current_height) > self.establishment_blocks
    }

    pub fn evaluate(&self, proposal: &Proposal, tally: Tally, current_height: u64) -> DerivedStatus {
        let ratio = tally.ratio();
        let validity = self.validity(proposal, &tally, ratio, current_height);

        DerivedStatus {
            tally,
            ratio,
            is_established: self.is_established(proposal, current_height),
            validity,
            remaining_payment_count: self.scheduler.remaining_payments(
                proposal.end_height,
                current_height,
                proposal.payment_count,
            ),
            allotted: Amount::ZERO,
        }
    }

    fn validity(&self, proposal: &Proposal, tally: &Tally, ratio: f64, current_height: u64) -> Validity {
        if proposal.is_expired(current_height) {
            return Validity::Invalid(InvalidReason::Expired);
        }

        if tally.directional() == 0 || ratio < self.min_approval_ratio {
            return Validity::Invalid(InvalidReason::RejectedByVote);
        }

        if proposal.amount > self.scheduler.total_cycle_budget(proposal.start_height) {
            return Validity::Invalid(InvalidReason::AmountOutOfBounds);
        }

        Validity::Valid
    }
}
