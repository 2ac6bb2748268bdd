//! Offline node state
//!
//! The inspection commands run against a JSON file holding what the live
//! node would otherwise get from its other subsystems: the chain tip, the
//! eligible masternodes, the confirmed fee transactions, and the stored
//! budget proposals and votes.

use anyhow::{Context, Result};
use mnbudget_governance::{
    BudgetSnapshot, ConfirmedFees, GovernanceConfig, GovernanceService, Hash, ImportReport,
    TipTracker, VoterId, VoterSet,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// `None` while the chain is not loaded
    pub height: Option<u64>,
    #[serde(default)]
    pub synced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    #[serde(default)]
    pub chain: ChainState,
    #[serde(default)]
    pub voters: Vec<VoterId>,
    /// Hex transaction hashes
    #[serde(default)]
    pub confirmed_fees: Vec<String>,
    #[serde(default)]
    pub budget: BudgetSnapshot,
}

/// Service loaded from a state file
pub struct LoadedState {
    pub service: GovernanceService,
    pub import: ImportReport,
}

impl NodeState {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize state")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;
        info!(path = %path.display(), "💾 State file written");
        Ok(())
    }

    pub fn fee_hashes(&self) -> Result<Vec<Hash>> {
        self.confirmed_fees
            .iter()
            .map(|fee| {
                let bytes = hex::decode(fee)
                    .with_context(|| format!("Invalid fee transaction hash: {}", fee))?;
                Hash::try_from(bytes.as_slice())
                    .map_err(|_| anyhow::anyhow!("Fee transaction hash must be 32 bytes: {}", fee))
            })
            .collect()
    }

    /// Build a service seeded with this state
    pub async fn build_service(&self, config: GovernanceConfig) -> Result<LoadedState> {
        let chain = Arc::new(match self.chain.height {
            Some(height) => TipTracker::at_height(height, self.chain.synced),
            None => TipTracker::new(),
        });
        let voters = Arc::new(VoterSet::new(self.voters.iter().copied()));
        let fees = Arc::new(ConfirmedFees::new(self.fee_hashes()?));

        info!(
            height = ?self.chain.height,
            synced = self.chain.synced,
            voters = voters.len(),
            empty_budget = self.budget.is_empty(),
            "📥 Loading node state"
        );

        let service = GovernanceService::new(config, chain, voters, fees)
            .context("Failed to create governance service")?;
        let import = service
            .import_snapshot(self.budget.clone())
            .await
            .context("Failed to import budget snapshot")?;

        if !import.is_clean() {
            warn!(
                skipped_proposals = import.skipped_proposals.len(),
                skipped_votes = import.skipped_votes.len(),
                "State file contained records that were skipped"
            );
        }

        Ok(LoadedState { service, import })
    }
}
