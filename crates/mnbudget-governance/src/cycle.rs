use crate::config::{BudgetSchedule, GovernanceConfig};
use crate::types::Amount;
use crate::{GovernanceError, Result};

/// Converts chain heights into budget-cycle boundaries and budgets
#[derive(Debug, Clone)]
pub struct CycleScheduler {
    cycle_length: u64,
    schedule: BudgetSchedule,
}

impl CycleScheduler {
    pub fn new(cycle_length: u64, schedule: BudgetSchedule) -> Self {
        debug_assert!(cycle_length > 0);
        Self {
            cycle_length,
            schedule,
        }
    }

    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self::new(config.cycle_length, config.budget.clone())
    }

    /// First cycle boundary strictly after `height`.
    ///
    /// Earliest start for a new proposal and the height of the next
    /// superblock.
    pub fn next_cycle_start(&self, height: u64) -> u64 {
        height - (height % self.cycle_length) + self.cycle_length
    }

    pub fn is_aligned(&self, height: u64) -> bool {
        height % self.cycle_length == 0
    }

    /// Amount available for proposals paid at the superblock starting at
    /// `start_height`
    pub fn total_cycle_budget(&self, start_height: u64) -> Amount {
        match &self.schedule {
            BudgetSchedule::Fixed { per_cycle } => *per_cycle,
            BudgetSchedule::Subsidy {
                eras,
                treasury_percent,
            } => {
                let subsidy = eras
                    .iter()
                    .take_while(|era| era.from_height <= start_height)
                    .last()
                    .map(|era| era.block_subsidy)
                    .unwrap_or(Amount::ZERO);

                let per_block = Amount::from_base_units(subsidy.to_base_units() / 100)
                    .saturating_mul(*treasury_percent);
                per_block.saturating_mul(self.cycle_length)
            }
        }
    }

    /// Check a requested start height against the chain height at submission
    pub fn validate_start(&self, start_height: u64, current_height: u64) -> Result<()> {
        let next_valid = self.next_cycle_start(current_height);
        if start_height < next_valid || !self.is_aligned(start_height) {
            return Err(GovernanceError::InvalidStartHeight {
                start: start_height,
                next_valid,
            });
        }
        Ok(())
    }

    pub fn end_height(&self, start_height: u64, payment_count: u32) -> u64 {
        start_height.saturating_add((payment_count as u64).saturating_mul(self.cycle_length))
    }

    /// Payments still ahead of `current_height`, clamped to `total`
    pub fn remaining_payments(&self, end_height: u64, current_height: u64, total: u32) -> u32 {
        if current_height >= end_height {
            return 0;
        }
        let blocks_left = end_height - current_height;
        let payments = blocks_left.div_ceil(self.cycle_length);
        payments.min(total as u64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubsidyEra;

    fn mainnet() -> CycleScheduler {
        CycleScheduler::from_config(&GovernanceConfig::mainnet())
    }

    #[test]
    fn test_next_cycle_start() {
        let scheduler = mainnet();
        assert_eq!(scheduler.next_cycle_start(4_320_000), 4_363_200);
        assert_eq!(scheduler.next_cycle_start(4_320_001), 4_363_200);
        assert_eq!(scheduler.next_cycle_start(4_363_199), 4_363_200);
        assert_eq!(scheduler.next_cycle_start(0), 43_200);
    }

    #[test]
    fn test_validate_start() {
        let scheduler = mainnet();
        assert!(scheduler.validate_start(4_363_200, 4_320_000).is_ok());
        assert!(scheduler.validate_start(4_406_400, 4_320_000).is_ok());

        // Current boundary is already reached
        let err = scheduler.validate_start(4_320_000, 4_320_000).unwrap_err();
        assert!(matches!(
            err,
            GovernanceError::InvalidStartHeight {
                next_valid: 4_363_200,
                ..
            }
        ));

        // Misaligned
        assert!(scheduler.validate_start(4_363_201, 4_320_000).is_err());
    }

    #[test]
    fn test_subsidy_budget() {
        let scheduler = mainnet();
        // 10 coins per block, 10% treasury, 43200 blocks
        assert_eq!(scheduler.total_cycle_budget(43_200), Amount::from_coins(43_200));
        // 5 coins per block after the second era
        assert_eq!(
            scheduler.total_cycle_budget(2_030_400),
            Amount::from_coins(21_600)
        );
    }

    #[test]
    fn test_budget_before_first_era_is_zero() {
        let scheduler = CycleScheduler::new(
            100,
            BudgetSchedule::Subsidy {
                eras: vec![SubsidyEra {
                    from_height: 1_000,
                    block_subsidy: Amount::from_coins(50),
                }],
                treasury_percent: 10,
            },
        );
        assert_eq!(scheduler.total_cycle_budget(500), Amount::ZERO);
        assert_eq!(scheduler.total_cycle_budget(1_000), Amount::from_coins(500));
    }

    #[test]
    fn test_fixed_budget() {
        let scheduler = CycleScheduler::from_config(&GovernanceConfig::testnet());
        assert_eq!(scheduler.total_cycle_budget(144), Amount::from_coins(7_300));
        assert_eq!(scheduler.total_cycle_budget(1_000_000), Amount::from_coins(7_300));
    }

    #[test]
    fn test_remaining_payments() {
        let scheduler = CycleScheduler::new(100, BudgetSchedule::Fixed { per_cycle: Amount::ZERO });
        // start 200, 3 payments, end 500
        assert_eq!(scheduler.end_height(200, 3), 500);
        assert_eq!(scheduler.remaining_payments(500, 150, 3), 3);
        assert_eq!(scheduler.remaining_payments(500, 0, 3), 3);
        assert_eq!(scheduler.remaining_payments(500, 250, 3), 3);
        assert_eq!(scheduler.remaining_payments(500, 300, 3), 2);
        assert_eq!(scheduler.remaining_payments(500, 499, 3), 1);
        assert_eq!(scheduler.remaining_payments(500, 500, 3), 0);
        assert_eq!(scheduler.remaining_payments(500, 900, 3), 0);
    }
}
