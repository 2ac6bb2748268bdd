//! Prometheus metrics for the budget engine
//!
//! Tracks proposal admission, voting, superblock projections and the
//! maintenance sweep.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

// ========== Proposals ==========

/// Proposals currently stored
pub static STORED_PROPOSALS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "mnbudget_stored_proposals",
        "Number of budget proposals currently stored"
    )
    .unwrap()
});

/// Accepted submissions
pub static PROPOSALS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mnbudget_proposals_submitted_total",
        "Total budget proposals accepted"
    )
    .unwrap()
});

/// Rejected submissions
pub static PROPOSALS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mnbudget_proposals_rejected_total",
        "Total budget proposal submissions rejected",
        &["reason"]
    )
    .unwrap()
});

// ========== Votes ==========

/// Votes recorded or replaced
pub static VOTES_CAST: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mnbudget_votes_cast_total",
        "Total budget votes recorded",
        &["direction"]
    )
    .unwrap()
});

/// Votes turned away
pub static VOTES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mnbudget_votes_rejected_total",
        "Total budget votes rejected",
        &["reason"]
    )
    .unwrap()
});

// ========== Projection ==========

/// Proposals selected in the latest projection
pub static PROJECTION_FUNDED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "mnbudget_projection_funded_proposals",
        "Proposals funded in the latest superblock projection"
    )
    .unwrap()
});

/// Base units allotted in the latest projection
pub static PROJECTION_ALLOTTED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "mnbudget_projection_allotted_base_units",
        "Amount allotted in the latest superblock projection"
    )
    .unwrap()
});

// ========== Maintenance ==========

/// Proposals pruned by the sweep
pub static SWEEP_REMOVALS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "mnbudget_sweep_removals_total",
        "Total proposals removed by the maintenance sweep",
        &["reason"]
    )
    .unwrap()
});

/// Sweep duration
pub static SWEEP_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "mnbudget_sweep_duration_seconds",
        "Time to run the maintenance sweep",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
    )
    .unwrap()
});
