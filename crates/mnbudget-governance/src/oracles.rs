//! Collaborators the engine consumes but does not own
//!
//! Chain height, masternode membership, fee confirmation and address
//! encoding all come from other subsystems. They are injected as trait
//! objects; the in-memory implementations here back the node tooling and
//! tests.

use crate::types::{Hash, PayoutAddress, VoterId};
use crate::{GovernanceError, Result};
use bech32::{Bech32, Hrp};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::debug;

/// Chain tip and sync state
pub trait ChainOracle: Send + Sync {
    /// Current chain height, `None` while the chain is not loaded
    fn tip_height(&self) -> Option<u64>;

    /// Whether masternode and budget data finished syncing
    fn is_synced(&self) -> bool;
}

/// Masternode membership as seen at a height
pub trait MembershipOracle: Send + Sync {
    fn is_eligible_voter(&self, voter: &VoterId, height: u64) -> bool;
}

/// Confirms that a proposal's fee transaction is mined and commits to the
/// proposal hash
pub trait FeeVerifier: Send + Sync {
    fn is_fee_confirmed(&self, fee_tx_hash: &Hash, proposal_hash: &Hash, height: u64) -> bool;
}

/// Converts payout addresses between text and the opaque decoded form
pub trait AddressCodec: Send + Sync {
    fn decode(&self, address: &str) -> Result<PayoutAddress>;
    fn encode(&self, address: &PayoutAddress) -> Result<String>;
}

const NO_HEIGHT: u64 = u64::MAX;

/// Chain oracle fed by block-tip notifications
#[derive(Debug)]
pub struct TipTracker {
    height: AtomicU64,
    synced: AtomicBool,
}

impl Default for TipTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TipTracker {
    /// Tracker with no chain loaded yet
    pub fn new() -> Self {
        Self {
            height: AtomicU64::new(NO_HEIGHT),
            synced: AtomicBool::new(false),
        }
    }

    pub fn at_height(height: u64, synced: bool) -> Self {
        let tracker = Self::new();
        tracker.height.store(height, Ordering::SeqCst);
        tracker.synced.store(synced, Ordering::SeqCst);
        tracker
    }

    /// Record a new chain tip
    pub fn updated_block_tip(&self, height: u64, initial_download: bool) {
        self.height.store(height, Ordering::SeqCst);
        if initial_download {
            self.synced.store(false, Ordering::SeqCst);
        }
        debug!(height, initial_download, "Block tip updated");
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }
}

impl ChainOracle for TipTracker {
    fn tip_height(&self) -> Option<u64> {
        match self.height.load(Ordering::SeqCst) {
            NO_HEIGHT => None,
            height => Some(height),
        }
    }

    fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst) && self.tip_height().is_some()
    }
}

/// Fixed set of eligible voters, independent of height
#[derive(Debug, Default)]
pub struct VoterSet {
    voters: RwLock<HashSet<VoterId>>,
}

impl VoterSet {
    pub fn new(voters: impl IntoIterator<Item = VoterId>) -> Self {
        Self {
            voters: RwLock::new(voters.into_iter().collect()),
        }
    }

    pub fn insert(&self, voter: VoterId) {
        if let Ok(mut voters) = self.voters.write() {
            voters.insert(voter);
        }
    }

    pub fn remove(&self, voter: &VoterId) {
        if let Ok(mut voters) = self.voters.write() {
            voters.remove(voter);
        }
    }

    pub fn len(&self) -> usize {
        self.voters.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MembershipOracle for VoterSet {
    fn is_eligible_voter(&self, voter: &VoterId, _height: u64) -> bool {
        self.voters
            .read()
            .map(|voters| voters.contains(voter))
            .unwrap_or(false)
    }
}

/// Fee transactions known to be confirmed
#[derive(Debug, Default)]
pub struct ConfirmedFees {
    fees: RwLock<HashSet<Hash>>,
}

impl ConfirmedFees {
    pub fn new(fees: impl IntoIterator<Item = Hash>) -> Self {
        Self {
            fees: RwLock::new(fees.into_iter().collect()),
        }
    }

    pub fn confirm(&self, fee_tx_hash: Hash) {
        if let Ok(mut fees) = self.fees.write() {
            fees.insert(fee_tx_hash);
        }
    }
}

impl FeeVerifier for ConfirmedFees {
    fn is_fee_confirmed(&self, fee_tx_hash: &Hash, _proposal_hash: &Hash, _height: u64) -> bool {
        self.fees
            .read()
            .map(|fees| fees.contains(fee_tx_hash))
            .unwrap_or(false)
    }
}

/// Bech32 payout addresses with a network prefix
#[derive(Debug, Clone)]
pub struct Bech32AddressCodec {
    hrp: Hrp,
}

impl Bech32AddressCodec {
    pub fn new(prefix: &str) -> Result<Self> {
        let hrp = Hrp::parse(prefix).map_err(|e| {
            GovernanceError::InvalidConfig(format!("invalid address prefix '{}': {}", prefix, e))
        })?;
        Ok(Self { hrp })
    }
}

impl AddressCodec for Bech32AddressCodec {
    fn decode(&self, address: &str) -> Result<PayoutAddress> {
        let (hrp, data) = bech32::decode(address)
            .map_err(|e| GovernanceError::InvalidAddress(format!("{}: {}", address, e)))?;

        if hrp != self.hrp {
            return Err(GovernanceError::InvalidAddress(format!(
                "expected prefix '{}', got '{}'",
                self.hrp.as_str(),
                hrp.as_str()
            )));
        }

        if data.is_empty() {
            return Err(GovernanceError::InvalidAddress(
                "address carries no payload".to_string(),
            ));
        }

        Ok(PayoutAddress::from_bytes(data))
    }

    fn encode(&self, address: &PayoutAddress) -> Result<String> {
        bech32::encode::<Bech32>(self.hrp, address.as_bytes())
            .map_err(|e| GovernanceError::InvalidAddress(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tip_tracker_starts_unknown() {
        let tracker = TipTracker::new();
        assert_eq!(tracker.tip_height(), None);
        assert!(!tracker.is_synced());

        tracker.set_synced(true);
        // Sync is meaningless without a chain
        assert!(!tracker.is_synced());

        tracker.updated_block_tip(1_000, false);
        assert_eq!(tracker.tip_height(), Some(1_000));
        assert!(tracker.is_synced());

        tracker.updated_block_tip(1_001, true);
        assert!(!tracker.is_synced());
    }

    #[test]
    fn test_voter_set_membership() {
        let a = VoterId::from_bytes([1; 32]);
        let b = VoterId::from_bytes([2; 32]);
        let set = VoterSet::new([a]);
        assert!(set.is_eligible_voter(&a, 10));
        assert!(!set.is_eligible_voter(&b, 10));

        set.insert(b);
        set.remove(&a);
        assert!(!set.is_eligible_voter(&a, 10));
        assert!(set.is_eligible_voter(&b, 10));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_confirmed_fees() {
        let fees = ConfirmedFees::new([[1; 32]]);
        assert!(fees.is_fee_confirmed(&[1; 32], &[0; 32], 0));
        assert!(!fees.is_fee_confirmed(&[2; 32], &[0; 32], 0));
        fees.confirm([2; 32]);
        assert!(fees.is_fee_confirmed(&[2; 32], &[0; 32], 0));
    }

    #[test]
    fn test_bech32_roundtrip_and_prefix_check() {
        let codec = Bech32AddressCodec::new("mn").unwrap();
        let address = PayoutAddress::from_bytes(vec![0x42; 20]);
        let encoded = codec.encode(&address).unwrap();
        assert!(encoded.starts_with("mn1"));
        assert_eq!(codec.decode(&encoded).unwrap(), address);

        let other = Bech32AddressCodec::new("tmn").unwrap();
        let foreign = other.encode(&address).unwrap();
        assert!(matches!(
            codec.decode(&foreign),
            Err(GovernanceError::InvalidAddress(_))
        ));
        assert!(codec.decode("not-an-address").is_err());
    }
}
