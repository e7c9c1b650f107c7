use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::params::{ApUpgrades, GameConfig, UpgradeKey};
use super::save::null_as_default;

/// One investor in the pyramid scheme. Owns its hires outright.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerNode {
    /// Root slot number for roots, parent tier + 1 below.
    #[serde(deserialize_with = "null_as_default")]
    pub tier: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub depth: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub unlocked: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub stone_progress: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub sculpted_stones: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub pyramids: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub sub_workers: Vec<WorkerNode>,
    /// Wall-clock ms of the last live update. Zero means "never ticked".
    #[serde(deserialize_with = "null_as_default")]
    pub last_tick_time: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub decay_multiplier: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_hires: u32,
}

impl Default for WorkerNode {
    fn default() -> Self {
        Self {
            tier: 1,
            depth: 0,
            unlocked: false,
            stone_progress: 0.0,
            sculpted_stones: 0.0,
            pyramids: 0.0,
            sub_workers: Vec::new(),
            last_tick_time: 0.0,
            decay_multiplier: 1.0,
            max_hires: 0,
        }
    }
}

impl WorkerNode {
    /// A locked root investor for `slot`.
    pub fn root(slot: u32) -> Self {
        Self {
            tier: slot,
            ..Self::default()
        }
    }

    /// A freshly hired sub-worker of `self`, stamped at `now`.
    pub fn hire(&self, decay_multiplier: f64, now: f64) -> Self {
        Self {
            tier: self.tier + 1,
            depth: self.depth + 1,
            unlocked: true,
            last_tick_time: now,
            decay_multiplier,
            ..Self::default()
        }
    }

    /// Milliseconds since the last live update, restamping the clock to `now`.
    /// An unset clock or a clock in the future yields zero.
    pub fn take_elapsed(&mut self, now: f64) -> f64 {
        let last = if self.last_tick_time > 0.0 {
            self.last_tick_time
        } else {
            now
        };
        self.last_tick_time = now;
        (now - last).max(0.0)
    }

    /// Descendant count (not counting `self`).
    pub fn total_hires(&self) -> usize {
        self.sub_workers
            .iter()
            .map(|w| 1 + w.total_hires())
            .sum()
    }

    /// Pyramids held by this node and every descendant.
    pub fn total_pyramids(&self) -> f64 {
        self.pyramids
            + self
                .sub_workers
                .iter()
                .map(WorkerNode::total_pyramids)
                .sum::<f64>()
    }

    /// Greatest depth present in this subtree.
    pub fn max_depth(&self) -> u32 {
        self.sub_workers
            .iter()
            .map(WorkerNode::max_depth)
            .max()
            .unwrap_or(self.depth)
            .max(self.depth)
    }

    /// Visit every node depth-first, parent before children.
    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut WorkerNode)) {
        f(self);
        for child in &mut self.sub_workers {
            child.for_each_mut(f);
        }
    }
}

/// Roll stone progress up into sculpted stones and stones up into pyramids.
/// Returns the number of pyramids produced. Negative or NaN inputs heal to 0.
pub fn roll_up(
    cfg: &GameConfig,
    stone_progress: &mut f64,
    sculpted_stones: &mut f64,
    pyramids: &mut f64,
) -> f64 {
    *stone_progress = stone_progress.max(0.0);
    *sculpted_stones = sculpted_stones.max(0.0);
    *pyramids = pyramids.max(0.0);

    if cfg.clicks_per_stone > 0.0 && *stone_progress >= cfg.clicks_per_stone {
        let stones = (*stone_progress / cfg.clicks_per_stone).floor();
        *sculpted_stones += stones;
        *stone_progress -= stones * cfg.clicks_per_stone;
    }
    if cfg.stones_per_pyramid > 0.0 && *sculpted_stones >= cfg.stones_per_pyramid {
        let made = (*sculpted_stones / cfg.stones_per_pyramid).floor();
        *pyramids += made;
        *sculpted_stones -= made * cfg.stones_per_pyramid;
        return made;
    }
    0.0
}

/// Everything that makes up one player's game.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub stone_progress: f64,
    pub sculpted_stones: f64,
    pub pyramids: f64,
    pub alien_points: u64,
    pub ap_upgrades: ApUpgrades,
    pub ap_store_unlocked: bool,
    /// Root investors keyed by slot number.
    pub workers: BTreeMap<u32, WorkerNode>,
    pub last_save_time: f64,
    /// Set by a prestige that reached the victory goal, until acknowledged.
    pub victory_pending: bool,
}

impl PlayerState {
    pub fn new(cfg: &GameConfig) -> Self {
        Self {
            stone_progress: 0.0,
            sculpted_stones: 0.0,
            pyramids: 0.0,
            alien_points: 0,
            ap_upgrades: ApUpgrades::default(),
            ap_store_unlocked: false,
            workers: default_workers(cfg),
            last_save_time: 0.0,
            victory_pending: false,
        }
    }

    /// Zero run progress and rebuild the default locked roots. Permanent
    /// progress (AP, upgrades, store flag) is untouched.
    pub fn reset_run(&mut self, cfg: &GameConfig) {
        self.stone_progress = 0.0;
        self.sculpted_stones = 0.0;
        self.pyramids = 0.0;
        self.workers = default_workers(cfg);
    }

    /// Seed a new run with the purchased starting bonuses.
    pub fn apply_starting_bonuses(&mut self, cfg: &GameConfig) {
        let stones = cfg.purchased_bonus(UpgradeKey::StartingStones, &self.ap_upgrades);
        let pyramids = cfg.purchased_bonus(UpgradeKey::StartingPyramids, &self.ap_upgrades);
        self.sculpted_stones += stones.floor().max(0.0);
        self.pyramids += pyramids.floor().max(0.0);
    }

    /// Player hand-click: one stone-progress unit, rolled up at once.
    pub fn click(&mut self, cfg: &GameConfig) {
        self.stone_progress += 1.0;
        self.roll_up(cfg);
    }

    pub fn roll_up(&mut self, cfg: &GameConfig) -> f64 {
        roll_up(
            cfg,
            &mut self.stone_progress,
            &mut self.sculpted_stones,
            &mut self.pyramids,
        )
    }

    pub fn unlocked_roots(&self) -> impl Iterator<Item = &WorkerNode> {
        self.workers.values().filter(|w| w.unlocked)
    }

    pub fn total_hires(&self) -> usize {
        self.unlocked_roots().map(WorkerNode::total_hires).sum()
    }

    /// Pyramids still held inside the worker tree.
    pub fn tree_pyramids(&self) -> f64 {
        self.unlocked_roots().map(WorkerNode::total_pyramids).sum()
    }

    /// Restamp every node's clock so the next live tick measures from `now`.
    pub fn restamp_clocks(&mut self, now: f64) {
        for root in self.workers.values_mut() {
            root.for_each_mut(&mut |node| node.last_tick_time = now);
        }
    }
}

/// Locked roots for every default slot.
pub fn default_workers(cfg: &GameConfig) -> BTreeMap<u32, WorkerNode> {
    (1..=cfg.default_root_slots)
        .map(|slot| (slot, WorkerNode::root(slot)))
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_roll_up_preserves_total_clicks(clicks in 0u32..100_000) {
            let cfg = GameConfig::default();
            let (mut progress, mut stones, mut pyramids) = (clicks as f64, 0.0, 0.0);
            roll_up(&cfg, &mut progress, &mut stones, &mut pyramids);
            prop_assert!(progress < cfg.clicks_per_stone);
            prop_assert!(stones < cfg.stones_per_pyramid);
            let total = pyramids * 100.0 + stones * 10.0 + progress;
            prop_assert_eq!(total, clicks as f64);
        }
    }
}
