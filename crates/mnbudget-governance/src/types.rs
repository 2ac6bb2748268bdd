use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash type for governance artifacts
pub type Hash = [u8; 32];

/// Domain separation tag for proposal content hashes
pub const DST_PROPOSAL_HASH: &[u8] = b"MNBUDGET-PROPOSAL-v1";

/// Domain separation tag for vote hashes
pub const DST_VOTE_HASH: &[u8] = b"MNBUDGET-VOTE-v1";

/// Base units per coin
pub const COIN: u64 = 100_000_000;

/// Serde helper rendering 32-byte hashes as lowercase hex
pub mod hex_hash {
    use super::Hash;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("expected 32 bytes of hex"))
    }
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(D::Error::custom)
    }
}

/// Amount in base units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn from_coins(coins: u64) -> Self {
        Self(coins.saturating_mul(COIN))
    }

    pub fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    pub fn to_base_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn saturating_mul(&self, factor: u64) -> Self {
        Self(self.0.saturating_mul(factor))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / COIN, self.0 % COIN)
    }
}

/// Masternode identifier (hash of the collateral outpoint)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoterId(#[serde(with = "hex_hash")] Hash);

impl VoterId {
    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        bytes.try_into().ok().map(Self)
    }

    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Decoded payout destination. Opaque to the engine; produced and rendered
/// by an [`AddressCodec`](crate::oracles::AddressCodec).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayoutAddress(#[serde(with = "hex_bytes")] Vec<u8>);

impl PayoutAddress {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Vote choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteDirection {
    Yes,
    No,
    Abstain,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteDirection::Yes => "YES",
            VoteDirection::No => "NO",
            VoteDirection::Abstain => "ABSTAIN",
        }
    }

    fn as_byte(&self) -> u8 {
        match self {
            VoteDirection::Yes => 1,
            VoteDirection::No => 2,
            VoteDirection::Abstain => 0,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Budget proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub name: String,
    pub url: String,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
    #[serde(with = "hex_hash")]
    pub fee_tx_hash: Hash,
    pub payout_address: PayoutAddress,
    /// Amount paid at each superblock
    pub amount: Amount,
    pub payment_count: u32,
    pub start_height: u64,
    /// `start_height + payment_count * cycle_length`
    pub end_height: u64,
    /// Chain height when the proposal was accepted
    pub creation_height: u64,
}

impl Proposal {
    /// Compute the content hash the fee transaction commits to.
    ///
    /// Fields are length-prefixed so adjacent strings cannot be shifted into
    /// each other.
    pub fn compute_hash(
        name: &str,
        url: &str,
        start_height: u64,
        end_height: u64,
        amount: Amount,
        payout_address: &PayoutAddress,
    ) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DST_PROPOSAL_HASH);
        for field in [name.as_bytes(), url.as_bytes()] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        hasher.update(&start_height.to_le_bytes());
        hasher.update(&end_height.to_le_bytes());
        hasher.update(&amount.to_base_units().to_le_bytes());
        let address = payout_address.as_bytes();
        hasher.update(&(address.len() as u64).to_le_bytes());
        hasher.update(address);
        *hasher.finalize().as_bytes()
    }

    /// Whether the stored hash matches the proposal content
    pub fn hash_matches(&self) -> bool {
        self.hash
            == Self::compute_hash(
                &self.name,
                &self.url,
                self.start_height,
                self.end_height,
                self.amount,
                &self.payout_address,
            )
    }

    /// Sum of all payments over the proposal's lifetime
    pub fn total_payment(&self) -> Amount {
        self.amount.saturating_mul(self.payment_count as u64)
    }

    /// Whether the payment window covers the superblock at `height`
    pub fn pays_at(&self, height: u64) -> bool {
        self.start_height <= height && height < self.end_height
    }

    pub fn is_expired(&self, current_height: u64) -> bool {
        current_height > self.end_height
    }

    /// Blocks elapsed since acceptance
    pub fn age(&self, current_height: u64) -> u64 {
        current_height.saturating_sub(self.creation_height)
    }

    pub fn short_id(&self) -> String {
        hex::encode(&self.hash[..8])
    }
}

/// Raw proposal fields as handed over by the submission boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalSubmission {
    pub name: String,
    pub url: String,
    pub payment_count: u32,
    pub start_height: u64,
    pub payment_address: String,
    pub amount: Amount,
    #[serde(with = "hex_hash")]
    pub fee_tx_hash: Hash,
}

/// Masternode vote on a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(with = "hex_hash")]
    pub proposal_hash: Hash,
    pub voter: VoterId,
    pub direction: VoteDirection,
    pub time: DateTime<Utc>,
}

impl Vote {
    pub fn new(
        proposal_hash: Hash,
        voter: VoterId,
        direction: VoteDirection,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            proposal_hash,
            voter,
            direction,
            time,
        }
    }

    pub fn hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(DST_VOTE_HASH);
        hasher.update(&self.proposal_hash);
        hasher.update(self.voter.as_bytes());
        hasher.update(&[self.direction.as_byte()]);
        hasher.update(&self.time.timestamp().to_le_bytes());
        *hasher.finalize().as_bytes()
    }
}

/// What happened to a cast vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// First vote from this voter on the proposal
    Recorded,
    /// Replaced an earlier vote from the same voter
    Replaced,
    /// Identical to the recorded vote
    Unchanged,
}

/// Vote counts for one proposal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yeas: u32,
    pub nays: u32,
    pub abstains: u32,
}

impl Tally {
    pub fn add(&mut self, direction: VoteDirection) {
        match direction {
            VoteDirection::Yes => self.yeas += 1,
            VoteDirection::No => self.nays += 1,
            VoteDirection::Abstain => self.abstains += 1,
        }
    }

    /// Yes plus no votes; abstains are excluded
    pub fn directional(&self) -> u32 {
        self.yeas + self.nays
    }

    /// Yes minus no votes, used for ranking
    pub fn net_approval(&self) -> i64 {
        self.yeas as i64 - self.nays as i64
    }

    /// Signed net-approval fraction in `[-1, 1]`
    pub fn ratio(&self) -> f64 {
        self.net_approval() as f64 / self.directional().max(1) as f64
    }
}

/// Why a proposal is currently invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Expired,
    RejectedByVote,
    AmountOutOfBounds,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InvalidReason::Expired => "Proposal expired.",
            InvalidReason::RejectedByVote => "Proposal rejected by vote.",
            InvalidReason::AmountOutOfBounds => "Payment amount out of bounds.",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Validity {
    Valid,
    Invalid(InvalidReason),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Validity::Valid => None,
            Validity::Invalid(reason) => Some(*reason),
        }
    }
}

/// Status computed on demand for a proposal at a given height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedStatus {
    pub tally: Tally,
    pub ratio: f64,
    pub is_established: bool,
    pub validity: Validity,
    pub remaining_payment_count: u32,
    /// Amount assigned for the next superblock; zero unless selected
    pub allotted: Amount,
}

impl DerivedStatus {
    pub fn is_valid(&self) -> bool {
        self.validity.is_valid()
    }

    /// Candidate for funding
    pub fn is_fundable(&self) -> bool {
        self.is_established && self.is_valid()
    }

    pub fn invalid_reason(&self) -> Option<String> {
        self.validity.reason().map(|r| r.to_string())
    }
}

/// Vote listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter: VoterId,
    #[serde(with = "hex_hash")]
    pub vote_hash: Hash,
    pub direction: VoteDirection,
    pub time: DateTime<Utc>,
    pub is_valid: bool,
}

/// Proposal together with its derived status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalInfo {
    pub name: String,
    pub url: String,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
    #[serde(with = "hex_hash")]
    pub fee_hash: Hash,
    pub block_start: u64,
    pub block_end: u64,
    pub total_payment_count: u32,
    pub remaining_payment_count: u32,
    /// Encoded with the service's address codec
    pub payment_address: String,
    pub ratio: f64,
    pub yeas: u32,
    pub nays: u32,
    pub abstains: u32,
    pub total_payment: Amount,
    pub payment_amount: Amount,
    pub is_established: bool,
    pub validity: Validity,
    pub allotted: Amount,
}

impl ProposalInfo {
    pub fn new(proposal: &Proposal, status: &DerivedStatus, payment_address: String) -> Self {
        Self {
            name: proposal.name.clone(),
            url: proposal.url.clone(),
            hash: proposal.hash,
            fee_hash: proposal.fee_tx_hash,
            block_start: proposal.start_height,
            block_end: proposal.end_height,
            total_payment_count: proposal.payment_count,
            remaining_payment_count: status.remaining_payment_count,
            payment_address,
            ratio: status.ratio,
            yeas: status.tally.yeas,
            nays: status.tally.nays,
            abstains: status.tally.abstains,
            total_payment: proposal.total_payment(),
            payment_amount: proposal.amount,
            is_established: status.is_established,
            validity: status.validity,
            allotted: status.allotted,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validity.is_valid()
    }
}

/// Budget projection entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionEntry {
    #[serde(flatten)]
    pub info: ProposalInfo,
    /// Cumulative allotment up to and including this entry
    pub total_budget_allotted: Amount,
}

/// Next superblock height, or unknown while the chain is still loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperblockHeight {
    Height(u64),
    Unknown,
}

impl fmt::Display for SuperblockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuperblockHeight::Height(h) => write!(f, "{}", h),
            SuperblockHeight::Unknown => f.write_str("unknown"),
        }
    }
}

/// Selection for proposal info queries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InfoFilter {
    /// Every proposal currently valid (established or not)
    #[default]
    Valid,
    /// Every stored proposal
    All,
    /// One proposal by name, regardless of validity
    Named(String),
}

/// Outcome of a maintenance sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub expired: usize,
    pub invalid: usize,
    pub votes_removed: usize,
    pub remaining: usize,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired + self.invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_address() -> PayoutAddress {
        PayoutAddress::from_bytes(vec![7; 20])
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::from_coins(10).to_string(), "10.00000000");
        assert_eq!(Amount::from_base_units(150_000_001).to_string(), "1.50000001");
        assert_eq!(Amount::ZERO.to_string(), "0.00000000");
    }

    #[test]
    fn test_amount_arithmetic() {
        let a = Amount::from_coins(5);
        assert_eq!(a.checked_add(Amount::from_coins(5)), Some(Amount::from_coins(10)));
        assert_eq!(Amount::from_base_units(u64::MAX).checked_add(a), None);
        assert_eq!(a.saturating_mul(3), Amount::from_coins(15));
    }

    #[test]
    fn test_tally_ratio_excludes_abstains() {
        let tally = Tally {
            yeas: 10,
            nays: 2,
            abstains: 50,
        };
        assert_eq!(tally.net_approval(), 8);
        assert!((tally.ratio() - 8.0 / 12.0).abs() < 1e-12);

        let empty = Tally::default();
        assert_eq!(empty.ratio(), 0.0);

        let against = Tally {
            yeas: 1,
            nays: 3,
            abstains: 0,
        };
        assert!((against.ratio() + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_proposal_hash_is_content_addressed() {
        let address = sample_address();
        let h1 = Proposal::compute_hash("dev-fund", "https://a.org", 144, 432, Amount::from_coins(10), &address);
        let h2 = Proposal::compute_hash("dev-fund", "https://a.org", 144, 432, Amount::from_coins(10), &address);
        let h3 = Proposal::compute_hash("dev-fund", "https://a.org", 144, 432, Amount::from_coins(11), &address);
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);

        // Shifting bytes between adjacent strings must change the hash
        let h4 = Proposal::compute_hash("dev-fun", "dhttps://a.org", 144, 432, Amount::from_coins(10), &address);
        assert_ne!(h1, h4);
    }

    #[test]
    fn test_payment_window() {
        let address = sample_address();
        let proposal = Proposal {
            name: "p".into(),
            url: "https://p.org".into(),
            hash: Proposal::compute_hash("p", "https://p.org", 288, 720, Amount::from_coins(10), &address),
            fee_tx_hash: [1; 32],
            payout_address: address,
            amount: Amount::from_coins(10),
            payment_count: 3,
            start_height: 288,
            end_height: 720,
            creation_height: 200,
        };
        assert!(proposal.hash_matches());
        assert!(!proposal.pays_at(144));
        assert!(proposal.pays_at(288));
        assert!(proposal.pays_at(576));
        assert!(!proposal.pays_at(720));
        assert!(!proposal.is_expired(720));
        assert!(proposal.is_expired(721));
        assert_eq!(proposal.total_payment(), Amount::from_coins(30));
        assert_eq!(proposal.age(250), 50);
        assert_eq!(proposal.age(100), 0);
    }

    #[test]
    fn test_vote_hash_covers_direction_and_time() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let voter = VoterId::from_bytes([3; 32]);
        let yes = Vote::new([9; 32], voter, VoteDirection::Yes, time);
        let no = Vote::new([9; 32], voter, VoteDirection::No, time);
        let later = Vote::new([9; 32], voter, VoteDirection::Yes, time + chrono::Duration::seconds(1));
        assert_ne!(yes.hash(), no.hash());
        assert_ne!(yes.hash(), later.hash());
        assert_eq!(yes.hash(), yes.clone().hash());
    }

    #[test]
    fn test_records_serialize_hashes_as_hex() {
        let voter = VoterId::from_bytes([0xab; 32]);
        let json = serde_json::to_value(voter).unwrap();
        assert_eq!(json, serde_json::json!("ab".repeat(32)));

        let validity = Validity::Invalid(InvalidReason::Expired);
        let json = serde_json::to_value(validity).unwrap();
        assert_eq!(json, serde_json::json!({"status": "invalid", "reason": "expired"}));
        assert_eq!(InvalidReason::Expired.to_string(), "Proposal expired.");
    }

    #[test]
    fn test_voter_id_hex_roundtrip() {
        let voter = VoterId::from_bytes([0x5a; 32]);
        assert_eq!(VoterId::from_hex(&voter.to_string()), Some(voter));
        assert_eq!(VoterId::from_hex("zz"), None);
        assert_eq!(VoterId::from_hex("abcd"), None);
    }
}
