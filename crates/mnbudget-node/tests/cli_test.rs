//! CLI handler tests against state files on disk

use chrono::Utc;
use mnbudget_governance::{
    Amount, ConfirmedFees, GovernanceService, Hash, InvalidReason, PayoutAddress,
    ProposalSubmission, TipTracker, Validity, Vote, VoteDirection, VoterId, VoterSet,
};
use mnbudget_node::{cli, ChainState, NodeConfig, NodeState};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

fn voter(i: u8) -> VoterId {
    VoterId::from_bytes([i; 32])
}

fn fee_hash(name: &str) -> Hash {
    *blake3::hash(name.as_bytes()).as_bytes()
}

/// State with three proposals at height 140 on regtest:
/// alpha (1000, 3 yes), gamma (600 x3, 2 yes), beta (500, no votes)
async fn write_state(dir: &TempDir, config: &NodeConfig) -> PathBuf {
    let chain = Arc::new(TipTracker::at_height(100, true));
    let fees = Arc::new(ConfirmedFees::default());
    let voters = Arc::new(VoterSet::new((1..=5).map(voter)));
    let service =
        GovernanceService::new(config.governance.clone(), chain, voters, fees.clone()).unwrap();
    let address = service
        .address_codec()
        .encode(&PayoutAddress::from_bytes(vec![0x33; 20]))
        .unwrap();

    let submit = |name: &str, coins: u64, count: u32| {
        fees.confirm(fee_hash(name));
        ProposalSubmission {
            name: name.to_string(),
            url: format!("https://budget.example/{}", name),
            payment_count: count,
            start_height: 144,
            payment_address: address.clone(),
            amount: Amount::from_coins(coins),
            fee_tx_hash: fee_hash(name),
        }
    };
    let alpha = submit("alpha", 1_000, 1);
    let beta = submit("beta", 500, 1);
    let gamma = submit("gamma", 600, 3);

    let alpha = service.submit_proposal(alpha).await.unwrap();
    service.submit_proposal(beta).await.unwrap();
    let gamma = service.submit_proposal(gamma).await.unwrap();

    for i in 1..=3 {
        service
            .cast_vote(Vote::new(alpha, voter(i), VoteDirection::Yes, Utc::now()))
            .await
            .unwrap();
    }
    for i in 1..=2 {
        service
            .cast_vote(Vote::new(gamma, voter(i), VoteDirection::Yes, Utc::now()))
            .await
            .unwrap();
    }

    let state = NodeState {
        chain: ChainState {
            height: Some(140),
            synced: true,
        },
        voters: (1..=5).map(voter).collect(),
        confirmed_fees: ["alpha", "beta", "gamma"]
            .iter()
            .map(|name| hex::encode(fee_hash(name)))
            .collect(),
        budget: service.export_snapshot().await,
    };

    let path = dir.path().join("state.json");
    state.save(&path).unwrap();
    path
}

fn regtest() -> NodeConfig {
    NodeConfig::for_network("regtest").unwrap()
}

fn names(value: &serde_json::Value) -> Vec<&str> {
    value["proposals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect()
}

#[test]
fn test_next_superblock() {
    let output = cli::handle_next_superblock(&regtest(), 100);
    assert_eq!(output["next_superblock"], 144);
    assert_eq!(
        output["budget"],
        Amount::from_coins(7_300).to_base_units()
    );

    let mainnet = NodeConfig::for_network("mainnet").unwrap();
    let output = cli::handle_next_superblock(&mainnet, 4_320_000);
    assert_eq!(output["next_superblock"], 4_363_200);
}

#[test]
fn test_show_config_is_toml() {
    let rendered = cli::handle_show_config(&regtest()).unwrap();
    let reparsed = NodeConfig::from_toml_str(&rendered, "mainnet").unwrap();
    assert_eq!(reparsed, regtest());
}

#[tokio::test]
async fn test_projection_from_state() {
    let dir = TempDir::new().unwrap();
    let config = regtest();
    let path = write_state(&dir, &config).await;

    let output = cli::handle_projection(&config, &path).await.unwrap();
    assert_eq!(names(&output), vec!["alpha", "gamma"]);
    assert_eq!(
        output["proposals"][1]["total_budget_allotted"],
        Amount::from_coins(1_600).to_base_units()
    );
    assert!(output["skipped"]["proposals"].as_array().unwrap().is_empty());

    let address = output["proposals"][0]["payment_address"].as_str().unwrap();
    assert!(address.starts_with("rmn1"));
}

#[tokio::test]
async fn test_info_filters() {
    let dir = TempDir::new().unwrap();
    let config = regtest();
    let path = write_state(&dir, &config).await;

    let valid = cli::handle_info(&config, &path, None, false).await.unwrap();
    assert_eq!(names(&valid), vec!["alpha", "gamma"]);

    let all = cli::handle_info(&config, &path, None, true).await.unwrap();
    assert_eq!(names(&all), vec!["alpha", "beta", "gamma"]);

    let beta = cli::handle_info(&config, &path, Some("beta".to_string()), true)
        .await
        .unwrap();
    let validity: Validity =
        serde_json::from_value(beta["proposals"][0]["validity"].clone()).unwrap();
    assert_eq!(validity, Validity::Invalid(InvalidReason::RejectedByVote));

    assert!(cli::handle_info(&config, &path, Some("delta".to_string()), false)
        .await
        .is_err());
}

#[tokio::test]
async fn test_votes_listing() {
    let dir = TempDir::new().unwrap();
    let config = regtest();
    let path = write_state(&dir, &config).await;

    let output = cli::handle_votes(&config, &path, "alpha").await.unwrap();
    assert_eq!(output["votes"].as_array().unwrap().len(), 3);

    let output = cli::handle_votes(&config, &path, "beta").await.unwrap();
    assert!(output["votes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_check_writes_pruned_state() {
    let dir = TempDir::new().unwrap();
    let config = regtest();
    let path = write_state(&dir, &config).await;

    // alpha and beta end at 288
    let mut state = NodeState::load(&path).unwrap();
    state.chain.height = Some(300);
    state.save(&path).unwrap();

    let dry = cli::handle_check(&config, &path, false).await.unwrap();
    assert_eq!(dry["report"]["expired"], 2);
    assert_eq!(dry["report"]["votes_removed"], 3);
    assert_eq!(NodeState::load(&path).unwrap().budget.proposals.len(), 3);

    let written = cli::handle_check(&config, &path, true).await.unwrap();
    assert_eq!(written["written"], true);

    let pruned = NodeState::load(&path).unwrap();
    assert_eq!(pruned.budget.proposals.len(), 1);
    assert_eq!(pruned.budget.proposals[0].name, "gamma");
    assert_eq!(pruned.budget.votes.len(), 2);
    assert_eq!(pruned.chain.height, Some(300));
}

#[tokio::test]
async fn test_check_requires_synced_chain() {
    let dir = TempDir::new().unwrap();
    let config = regtest();
    let path = write_state(&dir, &config).await;

    let mut state = NodeState::load(&path).unwrap();
    state.chain.synced = false;
    state.save(&path).unwrap();

    assert!(cli::handle_check(&config, &path, true).await.is_err());
    assert_eq!(NodeState::load(&path).unwrap().budget.proposals.len(), 3);
}

#[tokio::test]
async fn test_missing_state_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(cli::handle_projection(&regtest(), &missing).await.is_err());
}
