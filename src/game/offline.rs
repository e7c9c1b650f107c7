//! Offline reconciliation: advance the whole tree across a gap in one pass.
//!
//! Time is capped, scaled by the offline speed multiplier, then each node is
//! credited with a closed-form amount of clicks. Missing sub-workers a node
//! can afford are materialized in one go. Finally every pyramid held in the
//! tree is collected into the player's bank and every node clock is stamped
//! with the wall-clock time the pass ran at, so live ticks resume from there.

use tracing::info;

use super::params::GameConfig;
use super::state::{PlayerState, WorkerNode};
use super::workers::{advance_workers, EngineParams};

/// Stepwise parity mode starts its synthetic clock here; zero would read as
/// "never ticked".
const SYNTHETIC_EPOCH_MS: f64 = 1.0;
const SYNTHETIC_STEP_MS: f64 = 1000.0;

/// What an offline pass did, for the welcome-back message.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OfflineReport {
    pub capped_elapsed_ms: f64,
    /// Pyramids produced by the tree during the gap.
    pub pyramids_gained: f64,
    pub offline_multiplier_used: f64,
}

/// Closed-form reconciliation of `elapsed_ms` of absence ending at `now`.
pub fn reconcile(
    state: &mut PlayerState,
    cfg: &GameConfig,
    elapsed_ms: f64,
    now: f64,
) -> OfflineReport {
    let capped = elapsed_ms.clamp(0.0, cfg.max_offline_ms);
    let multiplier = cfg.offline_speed_multiplier(&state.ap_upgrades);
    let seconds = capped / 1000.0 * multiplier;
    let params = EngineParams::new(cfg, &state.ap_upgrades);

    let mut gained = 0.0;
    for root in state.workers.values_mut().filter(|w| w.unlocked) {
        gained += reconcile_node(root, 0, seconds, &params);
    }
    let collected = collect_worker_pyramids(state);
    state.restamp_clocks(now);

    info!(
        capped_elapsed_ms = capped,
        multiplier,
        pyramids_gained = gained,
        collected,
        "offline progress reconciled"
    );

    OfflineReport {
        capped_elapsed_ms: capped,
        pyramids_gained: gained,
        offline_multiplier_used: multiplier,
    }
}

fn reconcile_node(node: &mut WorkerNode, depth: u32, seconds: f64, p: &EngineParams) -> f64 {
    let (decay, cap) = p.annotate(node, depth);

    if p.is_retired(node, cap) {
        return node
            .sub_workers
            .iter_mut()
            .map(|c| reconcile_node(c, depth + 1, seconds, p))
            .sum();
    }

    let mut gained = p.produce(node, seconds * p.clicks_per_second * decay);

    if cap == 0 {
        return gained;
    }

    let target = p.hire_target(node, cap);
    if node.sub_workers.len() < target {
        let child_decay = p.decay_multiplier(depth + 1);
        while node.sub_workers.len() < target {
            let child = node.hire(child_decay, 0.0);
            node.sub_workers.push(child);
        }
    }

    for child in &mut node.sub_workers {
        gained += reconcile_node(child, depth + 1, seconds, p);
    }
    gained
}

/// Parity mode: replay the gap as one-second live ticks on a synthetic clock.
/// Slower, but hires one sub-worker per step like live play. The synthetic
/// clock never leaks: nodes end stamped at `now`.
pub fn reconcile_stepwise(
    state: &mut PlayerState,
    cfg: &GameConfig,
    elapsed_ms: f64,
    now: f64,
) -> OfflineReport {
    let capped = elapsed_ms.clamp(0.0, cfg.max_offline_ms);
    let multiplier = cfg.offline_speed_multiplier(&state.ap_upgrades);
    let span = capped * multiplier;

    state.restamp_clocks(SYNTHETIC_EPOCH_MS);
    let before = state.tree_pyramids();
    let mut t = 0.0;
    while t < span {
        t = (t + SYNTHETIC_STEP_MS).min(span);
        advance_workers(state, cfg, SYNTHETIC_EPOCH_MS + t);
    }
    let gained = state.tree_pyramids() - before;
    collect_worker_pyramids(state);
    state.restamp_clocks(now);

    info!(
        capped_elapsed_ms = capped,
        multiplier,
        pyramids_gained = gained,
        "offline progress replayed stepwise"
    );

    OfflineReport {
        capped_elapsed_ms: capped,
        pyramids_gained: gained,
        offline_multiplier_used: multiplier,
    }
}

/// Move every pyramid held in the tree into the player's bank.
pub fn collect_worker_pyramids(state: &mut PlayerState) -> f64 {
    let mut collected = 0.0;
    for root in state.workers.values_mut() {
        root.for_each_mut(&mut |node| {
            collected += node.pyramids;
            node.pyramids = 0.0;
        });
    }
    state.pyramids += collected;
    collected
}
