/*!
# Masternode Budget Governance

Budget engine for a proof-of-stake network with a masternode layer:
- Proposal admission with cycle-aligned payment windows
- Last-vote-wins masternode voting with update-interval rules
- Height-based establishment and vote-derived validity
- Superblock payment selection ranked by net approval
- Maintenance sweep of expired and rejected proposals

## Core Principles

- **Derived status**: validity, establishment and allotments are recomputed
  from stored proposals and votes on every query; nothing derived is stored.
- **Deterministic selection**: the funded set depends only on proposals,
  eligible votes, height and the budget schedule, never on insertion order.
- **Injected collaborators**: chain height, masternode membership, fee
  confirmation and address encoding come in through the traits in
  [`oracles`].

## Module Structure

- **types**: Proposal, Vote, Tally, DerivedStatus and result records
- **config**: protocol constants and network presets
- **cycle**: budget-cycle arithmetic and per-cycle budgets
- **proposals** / **votes**: the proposal store and vote ledger
- **validity**: status evaluation
- **allocation**: funding selection and removal policy
- **submission**: admission rules for new proposals
- **snapshot**: persistence of proposals and votes
- **service**: the [`GovernanceService`] facade
- **metrics**: Prometheus metrics

## Example Usage

```rust
use mnbudget_governance::{
    ConfirmedFees, GovernanceConfig, GovernanceService, SuperblockHeight, TipTracker, VoterSet,
};
use std::sync::Arc;

let chain = Arc::new(TipTracker::at_height(4_320_000, true));
let service = GovernanceService::new(
    GovernanceConfig::mainnet(),
    chain,
    Arc::new(VoterSet::default()),
    Arc::new(ConfirmedFees::default()),
)
.unwrap();

assert_eq!(
    service.next_superblock_height(),
    SuperblockHeight::Height(4_363_200)
);
```
*/

pub mod allocation;
pub mod config;
pub mod cycle;
pub mod error;
pub mod metrics;
pub mod oracles;
pub mod proposals;
pub mod service;
pub mod snapshot;
pub mod submission;
pub mod types;
pub mod validity;
pub mod votes;

pub use allocation::{AllocationEngine, Allotment, RemovalReason};
pub use config::{BudgetSchedule, GovernanceConfig, SubsidyEra};
pub use cycle::CycleScheduler;
pub use error::{ErrorKind, GovernanceError, Result};
pub use oracles::{
    AddressCodec, Bech32AddressCodec, ChainOracle, ConfirmedFees, FeeVerifier, MembershipOracle,
    TipTracker, VoterSet,
};
pub use proposals::ProposalStore;
pub use service::GovernanceService;
pub use snapshot::{BudgetSnapshot, ImportReport, SkippedRecord};
pub use submission::{sanitize_string, SubmissionValidator};
pub use types::{
    Amount, DerivedStatus, Hash, InfoFilter, InvalidReason, PayoutAddress, ProjectionEntry,
    Proposal, ProposalInfo, ProposalSubmission, SuperblockHeight, SweepReport, Tally, Validity,
    Vote, VoteDirection, VoteOutcome, VoteRecord, VoterId, COIN,
};
pub use validity::ValidityEvaluator;
pub use votes::VoteLedger;
