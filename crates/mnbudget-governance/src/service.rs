use crate::allocation::{AllocationEngine, Allotment, RemovalReason};
use crate::config::GovernanceConfig;
use crate::cycle::CycleScheduler;
use crate::metrics;
use crate::oracles::{AddressCodec, Bech32AddressCodec, ChainOracle, FeeVerifier, MembershipOracle};
use crate::proposals::ProposalStore;
use crate::snapshot::{BudgetSnapshot, ImportReport, SkippedRecord};
use crate::submission::{sanitize_string, SubmissionValidator};
use crate::types::{
    Amount, DerivedStatus, Hash, InfoFilter, ProjectionEntry, Proposal, ProposalInfo,
    ProposalSubmission, SuperblockHeight, SweepReport, Vote, VoteOutcome, VoteRecord,
};
use crate::validity::ValidityEvaluator;
use crate::votes::VoteLedger;
use crate::{GovernanceError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Budget governance facade
///
/// Owns the proposal store and vote ledger and answers every query against
/// the chain height reported by the injected [`ChainOracle`].
///
/// Lock order is always proposals, then votes. Queries hold the proposal read
/// guard for their whole computation and the sweep holds the write guard
/// while it removes, so no query observes a half-pruned set.
pub struct GovernanceService {
    config: GovernanceConfig,
    scheduler: CycleScheduler,
    evaluator: ValidityEvaluator,
    allocation: AllocationEngine,
    validator: SubmissionValidator,
    chain: Arc<dyn ChainOracle>,
    membership: Arc<dyn MembershipOracle>,
    fee_verifier: Arc<dyn FeeVerifier>,
    address_codec: Arc<dyn AddressCodec>,
    proposals: RwLock<ProposalStore>,
    ledger: VoteLedger,
}

impl GovernanceService {
    /// Create a service with an empty store.
    ///
    /// Payout addresses are decoded as bech32 with the configured prefix
    /// unless another codec is set with [`Self::with_address_codec`].
    pub fn new(
        config: GovernanceConfig,
        chain: Arc<dyn ChainOracle>,
        membership: Arc<dyn MembershipOracle>,
        fee_verifier: Arc<dyn FeeVerifier>,
    ) -> Result<Self> {
        config.validate()?;
        let address_codec: Arc<dyn AddressCodec> =
            Arc::new(Bech32AddressCodec::new(&config.address_hrp)?);

        Ok(Self {
            scheduler: CycleScheduler::from_config(&config),
            evaluator: ValidityEvaluator::from_config(&config),
            allocation: AllocationEngine::new(config.removal_grace_blocks),
            validator: SubmissionValidator::from_config(&config),
            ledger: VoteLedger::from_config(&config, membership.clone()),
            config,
            chain,
            membership,
            fee_verifier,
            address_codec,
            proposals: RwLock::new(ProposalStore::new()),
        })
    }

    /// Set the payout address codec
    pub fn with_address_codec(mut self, codec: Arc<dyn AddressCodec>) -> Self {
        self.address_codec = codec;
        self
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn address_codec(&self) -> &Arc<dyn AddressCodec> {
        &self.address_codec
    }

    fn current_height(&self) -> Result<u64> {
        self.chain.tip_height().ok_or(GovernanceError::ChainNotReady)
    }

    /// Validate and store a new proposal; returns its content hash
    pub async fn submit_proposal(&self, submission: ProposalSubmission) -> Result<Hash> {
        match self.admit(&submission).await {
            Ok(proposal_hash) => {
                metrics::PROPOSALS_SUBMITTED.inc();
                Ok(proposal_hash)
            }
            Err(e) => {
                metrics::PROPOSALS_REJECTED
                    .with_label_values(&[e.label()])
                    .inc();
                warn!(
                    name = %submission.name,
                    error = %e,
                    "Proposal submission rejected"
                );
                Err(e)
            }
        }
    }

    async fn admit(&self, submission: &ProposalSubmission) -> Result<Hash> {
        let height = self.current_height()?;
        let proposal = self
            .validator
            .validate(submission, height, self.address_codec.as_ref())?;

        if !self
            .fee_verifier
            .is_fee_confirmed(&proposal.fee_tx_hash, &proposal.hash, height)
        {
            return Err(GovernanceError::FeeNotConfirmed(hex::encode(
                proposal.fee_tx_hash,
            )));
        }

        let proposal_hash = proposal.hash;
        let name = proposal.name.clone();
        let start = proposal.start_height;
        let end = proposal.end_height;
        let amount = proposal.amount;

        let mut proposals = self.proposals.write().await;
        proposals.insert(proposal)?;
        metrics::STORED_PROPOSALS.set(proposals.len() as i64);

        info!(
            proposal_id = hex::encode(&proposal_hash[..8]),
            name = %name,
            amount = %amount,
            block_start = start,
            block_end = end,
            height,
            "📜 Budget proposal submitted"
        );

        Ok(proposal_hash)
    }

    /// Record a masternode vote
    pub async fn cast_vote(&self, vote: Vote) -> Result<VoteOutcome> {
        match self.record_vote(vote).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                metrics::VOTES_REJECTED.with_label_values(&[e.label()]).inc();
                Err(e)
            }
        }
    }

    async fn record_vote(&self, vote: Vote) -> Result<VoteOutcome> {
        let height = self.current_height()?;

        // Held across the ledger update so a sweep cannot drop the proposal
        // between the existence check and the insert.
        let proposals = self.proposals.read().await;
        if !proposals.contains(&vote.proposal_hash) {
            return Err(GovernanceError::UnknownProposal(hex::encode(
                vote.proposal_hash,
            )));
        }

        if !self.membership.is_eligible_voter(&vote.voter, height) {
            return Err(GovernanceError::IneligibleVoter(vote.voter.to_string()));
        }

        let proposal_hash = vote.proposal_hash;
        let voter = vote.voter;
        let direction = vote.direction;
        let outcome = self.ledger.cast_vote(vote, Utc::now()).await?;
        drop(proposals);

        if outcome != VoteOutcome::Unchanged {
            metrics::VOTES_CAST
                .with_label_values(&[direction.as_str()])
                .inc();
            info!(
                proposal_id = hex::encode(&proposal_hash[..8]),
                voter = voter.short(),
                direction = %direction,
                outcome = ?outcome,
                "🗳️ Budget vote recorded"
            );
        }

        Ok(outcome)
    }

    /// Votes on the named proposal; the name is sanitized like a submission
    pub async fn get_votes(&self, name: &str) -> Result<Vec<VoteRecord>> {
        let height = self.current_height()?;
        let proposals = self.proposals.read().await;
        let proposal = proposals
            .find_by_name(&sanitize_string(name))
            .ok_or_else(|| GovernanceError::UnknownProposal(name.to_string()))?;

        Ok(self.ledger.votes_for_display(&proposal.hash, height).await)
    }

    pub fn next_superblock_height(&self) -> SuperblockHeight {
        match self.chain.tip_height() {
            Some(height) => SuperblockHeight::Height(self.scheduler.next_cycle_start(height)),
            None => SuperblockHeight::Unknown,
        }
    }

    /// Proposals that would be paid at the next superblock, in payment order
    pub async fn get_projection(&self) -> Result<Vec<ProjectionEntry>> {
        let height = self.current_height()?;
        let proposals = self.proposals.read().await;
        let selected = self.project(&proposals, height).await;

        let total = selected
            .last()
            .map(|a| a.running_total)
            .unwrap_or(Amount::ZERO);
        metrics::PROJECTION_FUNDED.set(selected.len() as i64);
        metrics::PROJECTION_ALLOTTED.set(total.to_base_units() as i64);

        debug!(
            height,
            funded = selected.len(),
            allotted = %total,
            "Budget projection computed"
        );

        selected
            .into_iter()
            .map(|allotment| -> Result<ProjectionEntry> {
                Ok(ProjectionEntry {
                    info: self.info_for(&allotment.proposal, &allotment.status)?,
                    total_budget_allotted: allotment.running_total,
                })
            })
            .collect()
    }

    /// Proposal details with derived status.
    ///
    /// `allotted` is filled from the projection for the next superblock.
    pub async fn get_info(&self, filter: InfoFilter) -> Result<Vec<ProposalInfo>> {
        let height = self.current_height()?;
        let proposals = self.proposals.read().await;

        let chosen: Vec<&Proposal> = match &filter {
            InfoFilter::Named(name) => {
                let proposal = proposals
                    .find_by_name(&sanitize_string(name))
                    .ok_or_else(|| GovernanceError::UnknownProposal(name.clone()))?;
                vec![proposal]
            }
            InfoFilter::Valid | InfoFilter::All => {
                let mut all: Vec<&Proposal> = proposals.iter().collect();
                all.sort_by(|a, b| a.name.cmp(&b.name));
                all
            }
        };

        let allotted: HashMap<Hash, Amount> = self
            .project(&proposals, height)
            .await
            .into_iter()
            .map(|a| (a.proposal.hash, a.allotted))
            .collect();

        let mut infos = Vec::with_capacity(chosen.len());
        for proposal in chosen {
            let mut status = self.status_of(proposal, height).await;
            if filter == InfoFilter::Valid && !status.is_valid() {
                continue;
            }
            if let Some(amount) = allotted.get(&proposal.hash) {
                status.allotted = *amount;
            }
            infos.push(self.info_for(proposal, &status)?);
        }

        Ok(infos)
    }

    /// Prune expired proposals and invalid ones past the grace period
    pub async fn check_and_remove(&self) -> Result<SweepReport> {
        if !self.chain.is_synced() {
            return Err(GovernanceError::NotSynced);
        }
        let height = self.current_height()?;
        Ok(self.sweep(height).await)
    }

    async fn sweep(&self, height: u64) -> SweepReport {
        let timer = metrics::SWEEP_DURATION.start_timer();
        let mut proposals = self.proposals.write().await;
        let mut report = SweepReport::default();

        let mut doomed = Vec::new();
        for proposal in proposals.iter() {
            let status = self.status_of(proposal, height).await;
            if let Some(reason) = self.allocation.removal_reason(proposal, &status, height) {
                debug!(
                    proposal_id = proposal.short_id(),
                    name = %proposal.name,
                    reason = reason.as_str(),
                    detail = %status.invalid_reason().unwrap_or_default(),
                    "Proposal marked for removal"
                );
                doomed.push((proposal.hash, reason));
            }
        }

        for (proposal_hash, reason) in doomed {
            if proposals.remove(&proposal_hash).is_none() {
                continue;
            }
            report.votes_removed += self.ledger.remove_proposal(&proposal_hash).await;
            match reason {
                RemovalReason::Expired => report.expired += 1,
                RemovalReason::Invalid => report.invalid += 1,
            }
            metrics::SWEEP_REMOVALS
                .with_label_values(&[reason.as_str()])
                .inc();
        }

        report.remaining = proposals.len();
        metrics::STORED_PROPOSALS.set(report.remaining as i64);
        drop(proposals);
        timer.observe_duration();

        if report.removed() > 0 {
            info!(
                height,
                expired = report.expired,
                invalid = report.invalid,
                votes_removed = report.votes_removed,
                remaining = report.remaining,
                "🧹 Budget sweep removed proposals"
            );
        } else {
            debug!(height, remaining = report.remaining, "Budget sweep found nothing to remove");
        }

        report
    }

    /// Every stored proposal and recorded vote
    pub async fn export_snapshot(&self) -> BudgetSnapshot {
        let proposals = self.proposals.read().await;
        BudgetSnapshot {
            proposals: proposals.all(),
            votes: self.ledger.all_votes().await,
        }
    }

    /// Load proposals and votes from a snapshot.
    ///
    /// Each proposal is re-checked against the admission rules at its
    /// recorded creation height. Records that fail, duplicates, and votes for
    /// proposals not in the store are skipped and reported.
    pub async fn import_snapshot(&self, snapshot: BudgetSnapshot) -> Result<ImportReport> {
        let mut proposals = self.proposals.write().await;
        let mut report = ImportReport::default();

        for proposal in snapshot.proposals {
            let checked = self
                .validator
                .check_stored(&proposal)
                .and_then(|_| proposals.insert(proposal.clone()));
            match checked {
                Ok(()) => report.proposals_imported += 1,
                Err(e) => {
                    warn!(name = %proposal.name, error = %e, "Skipping snapshot proposal");
                    report.skipped_proposals.push(SkippedRecord {
                        id: proposal.name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for vote in snapshot.votes {
            let id = hex::encode(vote.hash());
            if !proposals.contains(&vote.proposal_hash) {
                report.skipped_votes.push(SkippedRecord {
                    id,
                    reason: GovernanceError::UnknownProposal(hex::encode(vote.proposal_hash))
                        .to_string(),
                });
                continue;
            }
            if self.ledger.restore(vote).await {
                report.votes_imported += 1;
            } else {
                report.skipped_votes.push(SkippedRecord {
                    id,
                    reason: "superseded by a newer vote".to_string(),
                });
            }
        }

        metrics::STORED_PROPOSALS.set(proposals.len() as i64);
        info!(
            proposals = report.proposals_imported,
            votes = report.votes_imported,
            skipped_proposals = report.skipped_proposals.len(),
            skipped_votes = report.skipped_votes.len(),
            "📥 Budget snapshot imported"
        );

        Ok(report)
    }

    pub async fn proposal_count(&self) -> usize {
        self.proposals.read().await.len()
    }

    fn info_for(&self, proposal: &Proposal, status: &DerivedStatus) -> Result<ProposalInfo> {
        let payment_address = self.address_codec.encode(&proposal.payout_address)?;
        Ok(ProposalInfo::new(proposal, status, payment_address))
    }

    async fn status_of(&self, proposal: &Proposal, height: u64) -> DerivedStatus {
        let tally = self.ledger.tally(&proposal.hash, height).await;
        self.evaluator.evaluate(proposal, tally, height)
    }

    /// Selection for the superblock after `height`. Caller holds the store.
    async fn project(&self, proposals: &ProposalStore, height: u64) -> Vec<Allotment> {
        let superblock = self.scheduler.next_cycle_start(height);
        let budget = self.scheduler.total_cycle_budget(superblock);

        let mut candidates = Vec::new();
        for proposal in proposals.iter().filter(|p| p.pays_at(superblock)) {
            let status = self.status_of(proposal, height).await;
            candidates.push((proposal.clone(), status));
        }

        self.allocation.select_funded(candidates, budget)
    }
}
