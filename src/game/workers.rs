//! Live worker-tree engine.
//!
//! Each unlocked root is walked depth-first. A node converts elapsed wall-clock
//! time into stone clicks (damped by its depth's decay multiplier), rolls them
//! up into pyramids it keeps for itself, hires at most one sub-worker per pass
//! when it can afford one, then recurses into its hires.

use tracing::debug;

use super::params::{decay_multiplier_for_rate, ApUpgrades, GameConfig};
use super::state::{roll_up, PlayerState, WorkerNode};

/// Per-pass constants, computed once so every node sees the same upgrades.
#[derive(Clone, Debug)]
pub(crate) struct EngineParams<'a> {
    pub cfg: &'a GameConfig,
    pub decay_rate: f64,
    pub hire_capacity: f64,
    /// Undecayed clicks per second including the speed multiplier.
    pub clicks_per_second: f64,
}

impl<'a> EngineParams<'a> {
    pub fn new(cfg: &'a GameConfig, levels: &ApUpgrades) -> Self {
        Self {
            cfg,
            decay_rate: cfg.effective_decay_rate(levels),
            hire_capacity: cfg.hire_capacity(levels),
            clicks_per_second: cfg.worker_clicks_per_second()
                * cfg.online_speed_multiplier(levels),
        }
    }

    pub fn decay_multiplier(&self, depth: u32) -> f64 {
        decay_multiplier_for_rate(self.decay_rate, depth)
    }

    /// Same value as [`GameConfig::structural_max_hires`].
    pub fn max_hires(&self, depth: u32) -> u32 {
        (self.hire_capacity * self.decay_multiplier(depth)).floor() as u32
    }

    /// Refresh a node's cached depth values; returns `(decay, cap)`.
    pub fn annotate(&self, node: &mut WorkerNode, depth: u32) -> (f64, u32) {
        let decay = self.decay_multiplier(depth);
        let cap = self.max_hires(depth);
        node.depth = depth;
        node.decay_multiplier = decay;
        node.max_hires = cap;
        (decay, cap)
    }

    /// Whether a node at its cap stops producing.
    pub fn is_retired(&self, node: &WorkerNode, cap: u32) -> bool {
        self.cfg.stops_after_max_hires && cap > 0 && node.sub_workers.len() >= cap as usize
    }

    /// Sub-workers a node could support right now.
    pub fn hire_target(&self, node: &WorkerNode, cap: u32) -> usize {
        if !self.cfg.recursive_workers_enabled || self.cfg.pyramids_per_hire <= 0.0 {
            return 0;
        }
        let affordable = (node.pyramids / self.cfg.pyramids_per_hire).floor() as usize;
        affordable.min(cap as usize)
    }

    /// Add `clicks` to a node and roll them up. Returns pyramids produced.
    pub fn produce(&self, node: &mut WorkerNode, clicks: f64) -> f64 {
        node.stone_progress += clicks.max(0.0);
        roll_up(
            self.cfg,
            &mut node.stone_progress,
            &mut node.sculpted_stones,
            &mut node.pyramids,
        )
    }
}

/// Advance every unlocked root and its subtree to `now`.
pub fn advance_workers(state: &mut PlayerState, cfg: &GameConfig, now: f64) {
    let params = EngineParams::new(cfg, &state.ap_upgrades);
    for root in state.workers.values_mut().filter(|w| w.unlocked) {
        tick_node(root, 0, now, &params);
    }
}

pub(crate) fn tick_node(node: &mut WorkerNode, depth: u32, now: f64, p: &EngineParams) {
    let (decay, cap) = p.annotate(node, depth);
    let elapsed_ms = node.take_elapsed(now);

    if p.is_retired(node, cap) {
        for child in &mut node.sub_workers {
            tick_node(child, depth + 1, now, p);
        }
        return;
    }

    let clicks = elapsed_ms / 1000.0 * p.clicks_per_second * decay;
    p.produce(node, clicks);

    if cap == 0 {
        return;
    }

    if node.sub_workers.len() < p.hire_target(node, cap) {
        let child = node.hire(p.decay_multiplier(depth + 1), now);
        debug!(
            tier = child.tier,
            depth = child.depth,
            parent_hires = node.sub_workers.len() + 1,
            "sub-worker hired"
        );
        node.sub_workers.push(child);
    }

    for child in &mut node.sub_workers {
        tick_node(child, depth + 1, now, p);
    }
}

/// Steady-state pyramids per second of a subtree, for display.
pub fn pyramids_per_second(node: &WorkerNode, cfg: &GameConfig, levels: &ApUpgrades) -> f64 {
    let params = EngineParams::new(cfg, levels);
    let clicks = subtree_clicks_per_second(node, node.depth, &params);
    let per_pyramid = cfg.clicks_per_stone * cfg.stones_per_pyramid;
    if per_pyramid > 0.0 {
        clicks / per_pyramid
    } else {
        0.0
    }
}

fn subtree_clicks_per_second(node: &WorkerNode, depth: u32, p: &EngineParams) -> f64 {
    let cap = p.max_hires(depth);
    let own = if p.is_retired(node, cap) {
        0.0
    } else {
        p.clicks_per_second * p.decay_multiplier(depth)
    };
    own + node
        .sub_workers
        .iter()
        .map(|c| subtree_clicks_per_second(c, depth + 1, p))
        .sum::<f64>()
}
