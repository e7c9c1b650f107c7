//! Game core: a [`GameSession`] owns the configuration and the player's state
//! and is the only thing the front-end talks to.

pub mod offline;
pub mod params;
pub mod prestige;
pub mod save;
pub mod state;
pub mod workers;

mod simulator;

use tracing::{debug, info, warn};

pub use offline::OfflineReport;
pub use params::{ApUpgrades, GameConfig, UpgradeDefinition, UpgradeKey};
pub use prestige::PrestigeReceipt;
pub use save::{SaveError, SaveRecord};
pub use state::{PlayerState, WorkerNode};

/// A restored session plus the offline catch-up it earned, if any.
#[derive(Debug)]
pub struct Restored {
    pub session: GameSession,
    pub offline: Option<OfflineReport>,
}

#[derive(Clone, Debug)]
pub struct GameSession {
    config: GameConfig,
    pub state: PlayerState,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        let state = PlayerState::new(&config);
        Self { config, state }
    }

    /// Rebuild a session from saved JSON and credit time away since the save.
    pub fn load_json(config: GameConfig, json: &str, now: f64) -> Result<Restored, SaveError> {
        let record = save::from_json(json).inspect_err(|e| warn!(error = %e, "save refused"))?;
        let state = save::apply_save(&record, &config);
        let mut session = Self { config, state };
        let offline = session.resume(now, record.last_save_time);
        Ok(Restored { session, offline })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// One live simulation step at wall-clock `now`.
    pub fn advance_one_tick(&mut self, now: f64) {
        workers::advance_workers(&mut self.state, &self.config, now);
        self.state.roll_up(&self.config);
        if !self.state.ap_store_unlocked && prestige::ap_store_visible(&self.config, &self.state) {
            self.state.ap_store_unlocked = true;
            info!(pyramids = self.state.pyramids, "AP store revealed");
        }
    }

    pub fn register_player_click(&mut self) {
        self.state.click(&self.config);
    }

    /// Unlock root slot `slot` (1-based). Free once the player holds
    /// `slot * root_unlock_step` pyramids.
    pub fn hire_root_worker(&mut self, slot: u32) -> bool {
        let max_slots = self.config.max_investor_slots(&self.state.ap_upgrades);
        if slot == 0 || slot > max_slots {
            return false;
        }
        if self.state.pyramids < self.config.root_unlock_requirement(slot) {
            return false;
        }
        let root = self
            .state
            .workers
            .entry(slot)
            .or_insert_with(|| WorkerNode::root(slot));
        if root.unlocked {
            return false;
        }
        *root = WorkerNode {
            unlocked: true,
            ..WorkerNode::root(slot)
        };
        info!(slot, "root investor hired");
        true
    }

    /// Buy the next level of `key`. Refused for unknown keys, maxed upgrades,
    /// unmet prerequisites, or too few Alien Points.
    pub fn purchase_upgrade(&mut self, key: &str) -> bool {
        let level = self.state.ap_upgrades.level_of(key);
        let Some(cost) = self.config.upgrade_cost(key, level) else {
            return false;
        };
        if !self.config.can_purchase(key, level, &self.state.ap_upgrades) {
            return false;
        }
        if self.state.alien_points < cost {
            debug!(key, cost, ap = self.state.alien_points, "upgrade unaffordable");
            return false;
        }
        self.state.alien_points -= cost;
        self.state.ap_upgrades.set(key, level + 1);
        info!(key, level = level + 1, cost, "upgrade purchased");
        true
    }

    pub fn perform_prestige(&mut self) -> Option<PrestigeReceipt> {
        prestige::perform_prestige(&mut self.state, &self.config)
    }

    /// Take the pending victory notice, if any.
    pub fn acknowledge_victory(&mut self) -> bool {
        std::mem::take(&mut self.state.victory_pending)
    }

    /// Credit `elapsed_ms` of absence that ended at `now`. Live ticks
    /// continue from `now` afterwards.
    pub fn reconcile_offline(&mut self, elapsed_ms: f64, now: f64) -> OfflineReport {
        offline::reconcile(&mut self.state, &self.config, elapsed_ms, now)
    }

    pub fn reconcile_offline_stepwise(&mut self, elapsed_ms: f64, now: f64) -> OfflineReport {
        offline::reconcile_stepwise(&mut self.state, &self.config, elapsed_ms, now)
    }

    pub fn collect_worker_pyramids(&mut self) -> f64 {
        offline::collect_worker_pyramids(&mut self.state)
    }

    /// Credit the gap since `last_save_time`. Gaps shorter than the offline
    /// minimum are left for the live tick to pick up.
    pub fn resume(&mut self, now: f64, last_save_time: f64) -> Option<OfflineReport> {
        if last_save_time <= 0.0 {
            return None;
        }
        let gap = now - last_save_time;
        if gap < self.config.offline_min_ms {
            return None;
        }
        Some(self.reconcile_offline(gap, now))
    }

    pub fn reset_run(&mut self) {
        self.state.reset_run(&self.config);
        info!("run reset");
    }

    /// Wipe everything, permanent progress included. Needs both confirmations.
    pub fn delete_everything(&mut self, confirmed: bool, double_confirmed: bool) -> bool {
        if !(confirmed && double_confirmed) {
            return false;
        }
        self.state = PlayerState::new(&self.config);
        info!("all progress deleted");
        true
    }

    pub fn ap_gain(&self) -> u64 {
        prestige::ap_gain(&self.config, self.state.pyramids, &self.state.ap_upgrades)
    }

    pub fn can_prestige(&self) -> bool {
        prestige::can_prestige(&self.config, self.state.pyramids)
    }

    pub fn has_won(&self) -> bool {
        prestige::has_won(&self.config, self.state.pyramids)
    }

    pub fn ap_store_visible(&self) -> bool {
        prestige::ap_store_visible(&self.config, &self.state)
    }

    pub fn total_hires(&self) -> usize {
        self.state.total_hires()
    }

    /// Banked pyramids plus those still held in the tree.
    pub fn total_pyramids(&self) -> f64 {
        self.state.pyramids + self.state.tree_pyramids()
    }

    pub fn pyramids_per_second(&self) -> f64 {
        self.state
            .unlocked_roots()
            .map(|root| workers::pyramids_per_second(root, &self.config, &self.state.ap_upgrades))
            .sum()
    }

    pub fn to_save_record(&self, now: f64) -> SaveRecord {
        save::extract_save(&self.state, now)
    }

    /// Serialize for storage and remember `now` as the save time.
    pub fn save_json(&mut self, now: f64) -> Result<String, SaveError> {
        let json = save::to_json(&self.to_save_record(now))?;
        self.state.last_save_time = now;
        Ok(json)
    }

    /// Replace the state from pasted text. Leaves the session untouched on error.
    pub fn import_text(&mut self, text: &str, now: f64) -> Result<(), SaveError> {
        let record = save::import_text(text).inspect_err(|e| warn!(error = %e, "import refused"))?;
        self.state = save::apply_save(&record, &self.config);
        self.state.last_save_time = now;
        self.state.restamp_clocks(now);
        info!(pyramids = self.state.pyramids, ap = self.state.alien_points, "save imported");
        Ok(())
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
