//! Admission rules for new proposals
//!
//! Everything here runs before a proposal touches the store, so a rejected
//! submission leaves no trace. The same structural checks are reused when a
//! snapshot is imported.

use crate::config::GovernanceConfig;
use crate::cycle::CycleScheduler;
use crate::oracles::AddressCodec;
use crate::types::{Amount, Proposal, ProposalSubmission};
use crate::{GovernanceError, Result};

const SAFE_PUNCTUATION: &str = " .,;-_/:?@()";

/// Drop every character outside letters, digits and a small punctuation set
pub fn sanitize_string(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || SAFE_PUNCTUATION.contains(*c))
        .collect()
}

/// Check an already sanitized URL against the length limit and scheme list
pub fn validate_url(url: &str, max_length: usize, schemes: &[String]) -> Result<()> {
    if url.len() > max_length {
        return Err(GovernanceError::InvalidUrl(format!(
            "URL too long ({} > {})",
            url.len(),
            max_length
        )));
    }

    if !schemes.iter().any(|scheme| url.starts_with(scheme.as_str())) {
        return Err(GovernanceError::InvalidUrl(format!(
            "URL must start with one of {}",
            schemes.join(", ")
        )));
    }

    Ok(())
}

/// Applies the admission rules and builds the proposal record
#[derive(Debug, Clone)]
pub struct SubmissionValidator {
    scheduler: CycleScheduler,
    max_payments: u32,
    min_amount: Amount,
    max_name_length: usize,
    max_url_length: usize,
    url_schemes: Vec<String>,
}

impl SubmissionValidator {
    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self {
            scheduler: CycleScheduler::from_config(config),
            max_payments: config.max_payments_per_proposal,
            min_amount: config.min_proposal_amount,
            max_name_length: config.max_name_length,
            max_url_length: config.max_url_length,
            url_schemes: config.allowed_url_schemes.clone(),
        }
    }

    /// Validate a submission at `current_height` and build the proposal.
    ///
    /// Name and URL are stored in sanitized form; the content hash covers
    /// the sanitized values.
    pub fn validate(
        &self,
        submission: &ProposalSubmission,
        current_height: u64,
        codec: &dyn AddressCodec,
    ) -> Result<Proposal> {
        let name = sanitize_string(&submission.name);
        self.check_name(&name)?;

        let url = sanitize_string(&submission.url);
        validate_url(&url, self.max_url_length, &self.url_schemes)?;

        self.check_payment_count(submission.payment_count)?;
        self.scheduler
            .validate_start(submission.start_height, current_height)?;

        let payout_address = codec.decode(&submission.payment_address)?;

        self.check_amount(submission.amount, submission.start_height)?;

        let end_height = self
            .scheduler
            .end_height(submission.start_height, submission.payment_count);
        let hash = Proposal::compute_hash(
            &name,
            &url,
            submission.start_height,
            end_height,
            submission.amount,
            &payout_address,
        );

        Ok(Proposal {
            name,
            url,
            hash,
            fee_tx_hash: submission.fee_tx_hash,
            payout_address,
            amount: submission.amount,
            payment_count: submission.payment_count,
            start_height: submission.start_height,
            end_height,
            creation_height: current_height,
        })
    }

    /// Re-check a stored proposal against the rules that held when it was
    /// accepted at its recorded creation height
    pub fn check_stored(&self, proposal: &Proposal) -> Result<()> {
        if sanitize_string(&proposal.name) != proposal.name {
            return Err(GovernanceError::InvalidName(
                "name contains disallowed characters".to_string(),
            ));
        }
        self.check_name(&proposal.name)?;

        if sanitize_string(&proposal.url) != proposal.url {
            return Err(GovernanceError::InvalidUrl(
                "URL contains disallowed characters".to_string(),
            ));
        }
        validate_url(&proposal.url, self.max_url_length, &self.url_schemes)?;

        self.check_payment_count(proposal.payment_count)?;
        self.scheduler
            .validate_start(proposal.start_height, proposal.creation_height)?;

        if proposal.end_height
            != self
                .scheduler
                .end_height(proposal.start_height, proposal.payment_count)
        {
            return Err(GovernanceError::InvalidStartHeight {
                start: proposal.start_height,
                next_valid: self.scheduler.next_cycle_start(proposal.creation_height),
            });
        }

        if proposal.amount < self.min_amount {
            return Err(GovernanceError::AmountTooSmall {
                amount: proposal.amount,
                min: self.min_amount,
            });
        }

        if !proposal.hash_matches() {
            return Err(GovernanceError::HashMismatch(proposal.name.clone()));
        }

        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(GovernanceError::InvalidName("name is empty".to_string()));
        }
        if name.chars().count() > self.max_name_length {
            return Err(GovernanceError::InvalidName(format!(
                "'{}' is longer than {} characters",
                name, self.max_name_length
            )));
        }
        Ok(())
    }

    fn check_payment_count(&self, count: u32) -> Result<()> {
        if count == 0 || count > self.max_payments {
            return Err(GovernanceError::InvalidPaymentCount {
                count,
                max: self.max_payments,
            });
        }
        Ok(())
    }

    fn check_amount(&self, amount: Amount, start_height: u64) -> Result<()> {
        if amount < self.min_amount {
            return Err(GovernanceError::AmountTooSmall {
                amount,
                min: self.min_amount,
            });
        }

        let budget = self.scheduler.total_cycle_budget(start_height);
        if amount > budget {
            return Err(GovernanceError::AmountExceedsBudget { amount, budget });
        }
        Ok(())
    }
}
