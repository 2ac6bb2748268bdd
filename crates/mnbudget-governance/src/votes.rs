use crate::config::GovernanceConfig;
use crate::oracles::MembershipOracle;
use crate::types::{Hash, Tally, Vote, VoteOutcome, VoteRecord, VoterId};
use crate::{GovernanceError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

type VoteSet = Arc<RwLock<HashMap<VoterId, Vote>>>;

/// Current votes per proposal per voter.
///
/// Each proposal's vote set has its own lock, so votes on different
/// proposals are recorded in parallel while updates to one proposal are
/// serialized.
pub struct VoteLedger {
    membership: Arc<dyn MembershipOracle>,
    update_min: Duration,
    max_future_drift: Duration,
    votes: RwLock<HashMap<Hash, VoteSet>>,
}

impl VoteLedger {
    pub fn new(
        membership: Arc<dyn MembershipOracle>,
        update_min_secs: i64,
        max_future_drift_secs: i64,
    ) -> Self {
        Self {
            membership,
            update_min: Duration::seconds(update_min_secs),
            max_future_drift: Duration::seconds(max_future_drift_secs),
            votes: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &GovernanceConfig, membership: Arc<dyn MembershipOracle>) -> Self {
        Self::new(
            membership,
            config.vote_update_min_secs,
            config.max_vote_future_drift_secs,
        )
    }

    async fn vote_set(&self, proposal_hash: &Hash) -> Option<VoteSet> {
        self.votes.read().await.get(proposal_hash).cloned()
    }

    async fn vote_set_or_insert(&self, proposal_hash: Hash) -> VoteSet {
        if let Some(set) = self.vote_set(&proposal_hash).await {
            return set;
        }
        let mut votes = self.votes.write().await;
        votes.entry(proposal_hash).or_default().clone()
    }

    /// Record a vote; the latest vote of a voter replaces any earlier one.
    ///
    /// Rejects votes dated too far ahead of `now`, votes older than the one
    /// on record, and updates arriving within the minimum update interval.
    pub async fn cast_vote(&self, vote: Vote, now: DateTime<Utc>) -> Result<VoteOutcome> {
        if vote.time > now + self.max_future_drift {
            return Err(GovernanceError::VoteFromFuture(vote.voter.to_string()));
        }

        let set = self.vote_set_or_insert(vote.proposal_hash).await;
        let mut voters = set.write().await;

        let outcome = match voters.get(&vote.voter) {
            Some(existing) if *existing == vote => VoteOutcome::Unchanged,
            Some(existing) => {
                if vote.time < existing.time {
                    return Err(GovernanceError::StaleVote(vote.voter.to_string()));
                }
                let elapsed = vote.time - existing.time;
                if elapsed < self.update_min {
                    return Err(GovernanceError::VoteTooSoon {
                        voter: vote.voter.to_string(),
                        elapsed_secs: elapsed.num_seconds(),
                        min_secs: self.update_min.num_seconds(),
                    });
                }
                VoteOutcome::Replaced
            }
            None => VoteOutcome::Recorded,
        };

        debug!(
            proposal_id = hex::encode(&vote.proposal_hash[..8]),
            voter = vote.voter.short(),
            direction = %vote.direction,
            outcome = ?outcome,
            "Vote processed"
        );

        if outcome != VoteOutcome::Unchanged {
            voters.insert(vote.voter, vote);
        }

        Ok(outcome)
    }

    /// Put back a persisted vote, keeping whichever vote is newer
    pub(crate) async fn restore(&self, vote: Vote) -> bool {
        let set = self.vote_set_or_insert(vote.proposal_hash).await;
        let mut voters = set.write().await;
        match voters.get(&vote.voter) {
            Some(existing) if existing.time >= vote.time => false,
            _ => {
                voters.insert(vote.voter, vote);
                true
            }
        }
    }

    /// Count votes from voters eligible at `as_of_height`
    pub async fn tally(&self, proposal_hash: &Hash, as_of_height: u64) -> Tally {
        let mut tally = Tally::default();
        let Some(set) = self.vote_set(proposal_hash).await else {
            return tally;
        };

        let voters = set.read().await;
        for vote in voters.values() {
            if self.membership.is_eligible_voter(&vote.voter, as_of_height) {
                tally.add(vote.direction);
            }
        }
        tally
    }

    /// Votes on a proposal for listing, ordered by voter
    pub async fn votes_for_display(&self, proposal_hash: &Hash, as_of_height: u64) -> Vec<VoteRecord> {
        let Some(set) = self.vote_set(proposal_hash).await else {
            return Vec::new();
        };

        let voters = set.read().await;
        let mut records: Vec<VoteRecord> = voters
            .values()
            .map(|vote| VoteRecord {
                voter: vote.voter,
                vote_hash: vote.hash(),
                direction: vote.direction,
                time: vote.time,
                is_valid: self.membership.is_eligible_voter(&vote.voter, as_of_height),
            })
            .collect();
        records.sort_by(|a, b| a.voter.cmp(&b.voter));
        records
    }

    pub async fn vote_count(&self, proposal_hash: &Hash) -> usize {
        match self.vote_set(proposal_hash).await {
            Some(set) => set.read().await.len(),
            None => 0,
        }
    }

    /// Drop every vote on a proposal; returns how many were removed
    pub async fn remove_proposal(&self, proposal_hash: &Hash) -> usize {
        let removed = self.votes.write().await.remove(proposal_hash);
        let count = match removed {
            Some(set) => set.read().await.len(),
            None => 0,
        };
        if count > 0 {
            info!(
                proposal_id = hex::encode(&proposal_hash[..8]),
                votes = count,
                "🗑️ Votes removed with proposal"
            );
        }
        count
    }

    /// Every recorded vote, ordered by proposal then voter
    pub async fn all_votes(&self) -> Vec<Vote> {
        let sets: Vec<VoteSet> = self.votes.read().await.values().cloned().collect();
        let mut all = Vec::new();
        for set in sets {
            all.extend(set.read().await.values().cloned());
        }
        all.sort_by(|a, b| {
            a.proposal_hash
                .cmp(&b.proposal_hash)
                .then_with(|| a.voter.cmp(&b.voter))
        });
        all
    }
}
