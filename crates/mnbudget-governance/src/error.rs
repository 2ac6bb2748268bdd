use crate::types::Amount;
use thiserror::Error;

/// Governance operation result type
pub type Result<T> = std::result::Result<T, GovernanceError>;

/// Broad error classes so callers can decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; nothing was changed
    Validation,
    /// Well-formed identity that does not exist
    NotFound,
    /// Input clashes with existing state
    Conflict,
    /// Node not ready yet; retry later
    Precondition,
    /// Bad configuration or unreadable files
    Config,
}

/// Governance errors
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("Invalid proposal name: {0}")]
    InvalidName(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid payment count {count}, must be between 1 and {max}")]
    InvalidPaymentCount { count: u32, max: u32 },

    #[error("Invalid block start {start} - must be a budget cycle block. Next valid block: {next_valid}")]
    InvalidStartHeight { start: u64, next_valid: u64 },

    #[error("Invalid payout address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount - payment of {amount} is less than minimum {min}")]
    AmountTooSmall { amount: Amount, min: Amount },

    #[error("Invalid amount - payment of {amount} more than max of {budget}")]
    AmountExceedsBudget { amount: Amount, budget: Amount },

    #[error("Proposal {0} hash does not match its content")]
    HashMismatch(String),

    #[error("Proposal already exists: {0}")]
    DuplicateProposal(String),

    #[error("Unknown proposal: {0}")]
    UnknownProposal(String),

    #[error("Proposal fee transaction not confirmed: {0}")]
    FeeNotConfirmed(String),

    #[error("Voter is not eligible: {0}")]
    IneligibleVoter(String),

    #[error("New vote is older than the recorded vote from {0}")]
    StaleVote(String),

    #[error("Vote update from {voter} too soon: {elapsed_secs}s since last vote, minimum {min_secs}s")]
    VoteTooSoon {
        voter: String,
        elapsed_secs: i64,
        min_secs: i64,
    },

    #[error("Vote from {0} is dated too far in the future")]
    VoteFromFuture(String),

    #[error("Try again after active chain is loaded")]
    ChainNotReady,

    #[error("Masternode/budget sync not finished yet")]
    NotSynced,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        use GovernanceError::*;
        match self {
            InvalidName(_)
            | InvalidUrl(_)
            | InvalidPaymentCount { .. }
            | InvalidStartHeight { .. }
            | InvalidAddress(_)
            | AmountTooSmall { .. }
            | AmountExceedsBudget { .. }
            | HashMismatch(_)
            | IneligibleVoter(_)
            | StaleVote(_)
            | VoteTooSoon { .. }
            | VoteFromFuture(_) => ErrorKind::Validation,
            UnknownProposal(_) => ErrorKind::NotFound,
            DuplicateProposal(_) | FeeNotConfirmed(_) => ErrorKind::Conflict,
            ChainNotReady | NotSynced => ErrorKind::Precondition,
            InvalidConfig(_) | ConfigParse(_) | SerializationError(_) | Io(_) => ErrorKind::Config,
        }
    }

    /// Precondition failures clear up on their own once the node catches up
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Precondition
    }

    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        use GovernanceError::*;
        match self {
            InvalidName(_) => "invalid_name",
            InvalidUrl(_) => "invalid_url",
            InvalidPaymentCount { .. } => "invalid_payment_count",
            InvalidStartHeight { .. } => "invalid_start_height",
            InvalidAddress(_) => "invalid_address",
            AmountTooSmall { .. } => "amount_too_small",
            AmountExceedsBudget { .. } => "amount_exceeds_budget",
            HashMismatch(_) => "hash_mismatch",
            DuplicateProposal(_) => "duplicate",
            UnknownProposal(_) => "unknown_proposal",
            FeeNotConfirmed(_) => "fee_not_confirmed",
            IneligibleVoter(_) => "ineligible_voter",
            StaleVote(_) => "stale",
            VoteTooSoon { .. } => "too_soon",
            VoteFromFuture(_) => "future",
            ChainNotReady => "chain_not_ready",
            NotSynced => "not_synced",
            InvalidConfig(_) | ConfigParse(_) | SerializationError(_) | Io(_) => "config",
        }
    }
}
