//! Governance configuration and network presets
//!
//! Every protocol constant the engine depends on lives here so nodes on the
//! same network agree on them. Presets mirror the main, test and regression
//! networks; files may override any field.

use crate::types::Amount;
use crate::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Protocol schedule for the amount available per budget cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetSchedule {
    /// Same budget for every cycle
    Fixed { per_cycle: Amount },
    /// A share of the block subsidy accumulated over one cycle
    Subsidy {
        /// `(from_height, block_subsidy)` pairs, sorted by height
        eras: Vec<SubsidyEra>,
        treasury_percent: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidyEra {
    pub from_height: u64,
    pub block_subsidy: Amount,
}

/// Configuration for the budget engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Blocks per budget cycle
    pub cycle_length: u64,
    /// Upper bound on a proposal's payment count
    pub max_payments_per_proposal: u32,
    /// Age in blocks a proposal must exceed before it can be funded
    pub establishment_blocks: u64,
    /// Minimum `(yeas - nays) / (yeas + nays)` for a proposal to stay valid
    pub min_approval_ratio: f64,
    /// Age in blocks after which an invalid proposal is pruned
    pub removal_grace_blocks: u64,
    /// Smallest payment a proposal may request
    pub min_proposal_amount: Amount,
    pub max_name_length: usize,
    pub max_url_length: usize,
    pub allowed_url_schemes: Vec<String>,
    /// Minimum spacing between two votes of one voter on one proposal.
    /// Zero accepts every newer vote.
    pub vote_update_min_secs: i64,
    /// How far in the future a vote time may lie
    pub max_vote_future_drift_secs: i64,
    /// Human-readable prefix for payout addresses
    pub address_hrp: String,
    pub budget: BudgetSchedule,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl GovernanceConfig {
    pub fn mainnet() -> Self {
        Self {
            cycle_length: 43_200,
            max_payments_per_proposal: 6,
            establishment_blocks: 1_440, // one day of one-minute blocks
            min_approval_ratio: 0.1,
            removal_grace_blocks: 43_200,
            min_proposal_amount: Amount::from_coins(10),
            max_name_length: 20,
            max_url_length: 64,
            allowed_url_schemes: vec!["http://".to_string(), "https://".to_string()],
            vote_update_min_secs: 0,
            max_vote_future_drift_secs: 3_600,
            address_hrp: "mn".to_string(),
            budget: BudgetSchedule::Subsidy {
                eras: vec![
                    SubsidyEra {
                        from_height: 0,
                        block_subsidy: Amount::from_coins(10),
                    },
                    SubsidyEra {
                        from_height: 2_000_000,
                        block_subsidy: Amount::from_coins(5),
                    },
                ],
                treasury_percent: 10,
            },
        }
    }

    pub fn testnet() -> Self {
        Self {
            cycle_length: 144,
            max_payments_per_proposal: 20,
            establishment_blocks: 5,
            removal_grace_blocks: 144,
            address_hrp: "tmn".to_string(),
            budget: BudgetSchedule::Fixed {
                per_cycle: Amount::from_coins(7_300),
            },
            ..Self::mainnet()
        }
    }

    pub fn regtest() -> Self {
        Self {
            establishment_blocks: 1,
            address_hrp: "rmn".to_string(),
            ..Self::testnet()
        }
    }

    /// Preset by network name
    pub fn for_network(network: &str) -> Result<Self> {
        match network {
            "mainnet" | "main" => Ok(Self::mainnet()),
            "testnet" | "test" => Ok(Self::testnet()),
            "regtest" | "devnet" => Ok(Self::regtest()),
            other => Err(GovernanceError::InvalidConfig(format!(
                "unknown network '{}'",
                other
            ))),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(
            path = %path.display(),
            cycle_length = config.cycle_length,
            "Governance configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cycle_length == 0 {
            return Err(GovernanceError::InvalidConfig(
                "cycle_length must be positive".to_string(),
            ));
        }
        if self.max_payments_per_proposal == 0 {
            return Err(GovernanceError::InvalidConfig(
                "max_payments_per_proposal must be at least 1".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.min_approval_ratio) {
            return Err(GovernanceError::InvalidConfig(format!(
                "min_approval_ratio {} outside [-1, 1]",
                self.min_approval_ratio
            )));
        }
        if self.min_proposal_amount.is_zero() {
            return Err(GovernanceError::InvalidConfig(
                "min_proposal_amount must be positive".to_string(),
            ));
        }
        if self.max_name_length == 0 || self.max_url_length == 0 {
            return Err(GovernanceError::InvalidConfig(
                "name and URL limits must be positive".to_string(),
            ));
        }
        if self.allowed_url_schemes.is_empty() {
            return Err(GovernanceError::InvalidConfig(
                "at least one URL scheme must be allowed".to_string(),
            ));
        }
        if self.vote_update_min_secs < 0 || self.max_vote_future_drift_secs < 0 {
            return Err(GovernanceError::InvalidConfig(
                "vote timing limits must not be negative".to_string(),
            ));
        }
        if let BudgetSchedule::Subsidy {
            eras,
            treasury_percent,
        } = &self.budget
        {
            if eras.is_empty() {
                return Err(GovernanceError::InvalidConfig(
                    "subsidy schedule needs at least one era".to_string(),
                ));
            }
            if eras.windows(2).any(|w| w[0].from_height >= w[1].from_height) {
                return Err(GovernanceError::InvalidConfig(
                    "subsidy eras must be sorted by height".to_string(),
                ));
            }
            if *treasury_percent > 100 {
                return Err(GovernanceError::InvalidConfig(format!(
                    "treasury_percent {} exceeds 100",
                    treasury_percent
                )));
            }
        }
        Ok(())
    }
}
