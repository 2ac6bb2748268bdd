//! Persistent form of the budget state
//!
//! A snapshot holds every stored proposal and every recorded vote. Derived
//! status is never persisted; it is recomputed after import.

use crate::types::{Proposal, Vote};
use serde::{Deserialize, Serialize};

/// Proposals and votes as written to disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl BudgetSnapshot {
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty() && self.votes.is_empty()
    }
}

/// A record left out of an import, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    /// Proposal name, or hex vote hash
    pub id: String,
    pub reason: String,
}

/// Outcome of importing a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub proposals_imported: usize,
    pub votes_imported: usize,
    pub skipped_proposals: Vec<SkippedRecord>,
    pub skipped_votes: Vec<SkippedRecord>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_proposals.is_empty() && self.skipped_votes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, PayoutAddress, VoteDirection, VoterId};
    use chrono::{TimeZone, Utc};

    fn snapshot() -> BudgetSnapshot {
        let address = PayoutAddress::from_bytes(vec![5; 20]);
        let amount = Amount::from_coins(25);
        let hash = Proposal::compute_hash("p", "https://p.org", 144, 288, amount, &address);
        BudgetSnapshot {
            proposals: vec![Proposal {
                name: "p".to_string(),
                url: "https://p.org".to_string(),
                hash,
                fee_tx_hash: [1; 32],
                payout_address: address,
                amount,
                payment_count: 1,
                start_height: 144,
                end_height: 288,
                creation_height: 100,
            }],
            votes: vec![Vote::new(
                hash,
                VoterId::from_bytes([4; 32]),
                VoteDirection::Yes,
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            )],
        }
    }

    #[test]
    fn test_json_round_trip() {
        let original = snapshot();
        let json = serde_json::to_string_pretty(&original).unwrap();
        let loaded: BudgetSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_hashes_written_as_hex() {
        let value = serde_json::to_value(snapshot()).unwrap();
        let hash = value["proposals"][0]["hash"].as_str().unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(value["votes"][0]["direction"], "YES");
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let snapshot: BudgetSnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.is_empty());
        assert!(serde_json::from_str::<BudgetSnapshot>("{not json").is_err());
    }
}
