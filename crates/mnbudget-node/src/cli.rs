//! CLI handlers for budget commands
//!
//! Each handler returns the JSON document the binary prints:
//! - Effective configuration
//! - Next superblock height and budget
//! - Projection, proposal info and votes from a state file
//! - Maintenance sweep, optionally written back to the state file

use crate::config_loader::NodeConfig;
use crate::state::{LoadedState, NodeState};
use anyhow::{Context, Result};
use mnbudget_governance::{CycleScheduler, ImportReport, InfoFilter};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

pub fn handle_show_config(config: &NodeConfig) -> Result<String> {
    config.to_toml_string()
}

/// Next superblock after `height` and the budget available there
pub fn handle_next_superblock(config: &NodeConfig, height: u64) -> Value {
    let scheduler = CycleScheduler::from_config(&config.governance);
    let next = scheduler.next_cycle_start(height);

    json!({
        "height": height,
        "next_superblock": next,
        "budget": scheduler.total_cycle_budget(next),
    })
}

async fn load(config: &NodeConfig, state_path: &Path) -> Result<(NodeState, LoadedState)> {
    let state = NodeState::load(state_path)?;
    let loaded = state.build_service(config.governance.clone()).await?;
    Ok((state, loaded))
}

fn skipped(import: &ImportReport) -> Value {
    json!({
        "proposals": import.skipped_proposals,
        "votes": import.skipped_votes,
    })
}

pub async fn handle_projection(config: &NodeConfig, state_path: &Path) -> Result<Value> {
    let (_, loaded) = load(config, state_path).await?;
    let projection = loaded
        .service
        .get_projection()
        .await
        .context("Failed to compute projection")?;

    Ok(json!({
        "next_superblock": loaded.service.next_superblock_height(),
        "proposals": projection,
        "skipped": skipped(&loaded.import),
    }))
}

/// Proposal details; `name` wins over `all`
pub async fn handle_info(
    config: &NodeConfig,
    state_path: &Path,
    name: Option<String>,
    all: bool,
) -> Result<Value> {
    let filter = match name {
        Some(name) => InfoFilter::Named(name),
        None if all => InfoFilter::All,
        None => InfoFilter::Valid,
    };

    let (_, loaded) = load(config, state_path).await?;
    let proposals = loaded.service.get_info(filter).await?;

    Ok(json!({
        "proposals": proposals,
        "skipped": skipped(&loaded.import),
    }))
}

pub async fn handle_votes(config: &NodeConfig, state_path: &Path, name: &str) -> Result<Value> {
    let (_, loaded) = load(config, state_path).await?;
    let votes = loaded.service.get_votes(name).await?;

    Ok(json!({
        "name": name,
        "votes": votes,
    }))
}

/// Run the maintenance sweep; with `write` the pruned budget is saved back
pub async fn handle_check(config: &NodeConfig, state_path: &Path, write: bool) -> Result<Value> {
    let (mut state, loaded) = load(config, state_path).await?;
    let report = loaded.service.check_and_remove().await?;

    if write {
        state.budget = loaded.service.export_snapshot().await;
        state.save(state_path)?;
        info!(
            removed = report.removed(),
            remaining = report.remaining,
            "🧹 Pruned budget written back"
        );
    }

    Ok(json!({
        "report": report,
        "written": write,
        "skipped": skipped(&loaded.import),
    }))
}
