//! Parameter table: tunable constants, permanent upgrade definitions, and the
//! pure derived-value functions the engine reads every tick.
//!
//! Nothing here mutates. Every function takes the current upgrade levels (or a
//! specific level) and returns a number. Unknown keys never fail: costs report
//! `None` (unavailable), effects report zero, purchases are refused.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Keys of the permanent Alien-Point upgrades.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpgradeKey {
    StartingStones,
    StartingPyramids,
    HireCapacity,
    WorkerSpeedOnline,
    WorkerSpeedOffline,
    ApGainBonus,
    InvestorDecayRate,
}

impl UpgradeKey {
    /// All upgrade keys in store display order.
    pub fn all() -> &'static [UpgradeKey] {
        &[
            UpgradeKey::StartingStones,
            UpgradeKey::StartingPyramids,
            UpgradeKey::HireCapacity,
            UpgradeKey::WorkerSpeedOnline,
            UpgradeKey::WorkerSpeedOffline,
            UpgradeKey::ApGainBonus,
            UpgradeKey::InvestorDecayRate,
        ]
    }

    /// Persisted key string (the save format uses these verbatim).
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeKey::StartingStones => "startingStones",
            UpgradeKey::StartingPyramids => "startingPyramids",
            UpgradeKey::HireCapacity => "hireCapacity",
            UpgradeKey::WorkerSpeedOnline => "workerSpeedOnline",
            UpgradeKey::WorkerSpeedOffline => "workerSpeedOffline",
            UpgradeKey::ApGainBonus => "apGainBonus",
            UpgradeKey::InvestorDecayRate => "investorDecayRate",
        }
    }

    pub fn from_key(key: &str) -> Option<UpgradeKey> {
        UpgradeKey::all().iter().copied().find(|k| k.as_str() == key)
    }
}

/// Static definition of one permanent upgrade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDefinition {
    pub name: String,
    pub description: String,
    pub base_cost: f64,
    pub cost_scaling: f64,
    pub base_effect: f64,
    pub effect_scaling: f64,
    pub max_level: u32,
    /// Prerequisites: other upgrade key -> minimum level.
    #[serde(default)]
    pub requires: BTreeMap<String, u32>,
}

impl UpgradeDefinition {
    fn new(
        name: &str,
        description: &str,
        base_cost: f64,
        cost_scaling: f64,
        base_effect: f64,
        effect_scaling: f64,
        max_level: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            base_cost,
            cost_scaling,
            base_effect,
            effect_scaling,
            max_level,
            requires: BTreeMap::new(),
        }
    }
}

fn default_upgrades() -> BTreeMap<String, UpgradeDefinition> {
    let defs = [
        (
            UpgradeKey::StartingStones,
            UpgradeDefinition::new(
                "Starting Sculpted Stones",
                "Start each run with bonus Sculpted Stones",
                1.0,
                1.0,
                0.0,
                1.0,
                9,
            ),
        ),
        (
            UpgradeKey::StartingPyramids,
            UpgradeDefinition::new(
                "Legacy Pyramids",
                "Start each run with bonus Pyramids",
                50.0,
                1.2,
                0.0,
                1.0,
                999_999,
            ),
        ),
        (
            UpgradeKey::HireCapacity,
            UpgradeDefinition::new(
                "Increased Hire Capacity",
                "Increases the number of investors you can hire",
                15.0,
                1.8,
                1.0,
                1.0,
                10,
            ),
        ),
        (
            UpgradeKey::WorkerSpeedOnline,
            UpgradeDefinition::new(
                "Investor Speed Training",
                "Investors sculpt stones faster while online",
                12.0,
                1.6,
                0.01,
                0.01,
                50,
            ),
        ),
        (
            UpgradeKey::WorkerSpeedOffline,
            UpgradeDefinition::new(
                "Offline Efficiency",
                "Improve investor speed while offline",
                18.0,
                1.7,
                0.05,
                0.05,
                30,
            ),
        ),
        (
            UpgradeKey::ApGainBonus,
            UpgradeDefinition::new(
                "Alien Bargaining",
                "Gain more AP when selling pyramids",
                100.0,
                2.2,
                0.1,
                0.1,
                20,
            ),
        ),
        (
            UpgradeKey::InvestorDecayRate,
            UpgradeDefinition::new(
                "Investor Decay Reduction",
                "Reduce the decay rate for sub-investors",
                30.0,
                2.5,
                -0.02,
                -0.02,
                8,
            ),
        ),
    ];
    defs.into_iter()
        .map(|(key, def)| (key.as_str().to_string(), def))
        .collect()
}

/// Permanent upgrade levels, keyed by upgrade key string.
///
/// Keys the game does not know are kept as-is so an older or newer save
/// round-trips without losing data. Levels load leniently: `null`, negative
/// or non-numeric levels read as 0 and fractions are floored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApUpgrades(BTreeMap<String, u32>);

impl<'de> Deserialize<'de> for ApUpgrades {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .map(|(key, value)| (key, level_from_value(&value)))
                .collect(),
        ))
    }
}

fn level_from_value(value: &serde_json::Value) -> u32 {
    match value.as_f64() {
        Some(v) if v.is_finite() && v > 0.0 => v.floor().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

impl Default for ApUpgrades {
    /// Every known upgrade at level 0.
    fn default() -> Self {
        Self(
            UpgradeKey::all()
                .iter()
                .map(|k| (k.as_str().to_string(), 0))
                .collect(),
        )
    }
}

impl ApUpgrades {
    pub fn level(&self, key: UpgradeKey) -> u32 {
        self.level_of(key.as_str())
    }

    /// Level for an arbitrary key; absent keys are level 0.
    pub fn level_of(&self, key: &str) -> u32 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: &str, level: u32) {
        self.0.insert(key.to_string(), level);
    }

    /// Overlay persisted levels on top of `self` (missing keys keep their value).
    pub fn merged_with(mut self, other: &ApUpgrades) -> Self {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), *v);
        }
        self
    }

}

/// `(1 - rate)^(depth + 1)`: depth 0 already suffers one decay step.
pub fn decay_multiplier_for_rate(rate: f64, depth: u32) -> f64 {
    (1.0 - rate).powi(depth as i32 + 1)
}

/// Immutable game configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub clicks_per_stone: f64,
    pub stones_per_pyramid: f64,
    /// Pyramids a worker must hold per sub-worker it hires.
    pub pyramids_per_hire: f64,
    pub base_hire_capacity: f64,
    pub default_root_slots: u32,
    /// Root slot `n` unlocks once the player holds `n * root_unlock_step` pyramids.
    pub root_unlock_step: f64,
    pub worker_click_interval_ms: f64,
    pub worker_decay_rate: f64,
    pub min_decay_rate: f64,
    pub decay_reduction_per_level: f64,
    pub tick_rate_ms: f64,
    pub autosave_interval_ms: f64,
    pub max_offline_ms: f64,
    pub offline_min_ms: f64,
    pub offline_speed_base: f64,
    pub ap_base_pyramid_cost: f64,
    pub pyramid_victory_goal: f64,
    pub ap_store_reveal_pyramids: f64,
    /// Rows the investor list always shows on narrow screens. Display only.
    pub narrow_min_visible_rows: u32,
    pub recursive_workers_enabled: bool,
    pub stops_after_max_hires: bool,
    pub upgrades: BTreeMap<String, UpgradeDefinition>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            clicks_per_stone: 10.0,
            stones_per_pyramid: 10.0,
            pyramids_per_hire: 10.0,
            base_hire_capacity: 5.0,
            default_root_slots: 5,
            root_unlock_step: 10.0,
            worker_click_interval_ms: 1000.0,
            worker_decay_rate: 0.20,
            min_decay_rate: 0.04,
            decay_reduction_per_level: 0.02,
            tick_rate_ms: 100.0,
            autosave_interval_ms: 60_000.0,
            max_offline_ms: 86_400_000.0,
            offline_min_ms: 60_000.0,
            offline_speed_base: 0.5,
            ap_base_pyramid_cost: 1_000_000.0,
            pyramid_victory_goal: 1_000_000_000.0,
            ap_store_reveal_pyramids: 100_000.0,
            narrow_min_visible_rows: 5,
            recursive_workers_enabled: true,
            stops_after_max_hires: true,
            upgrades: default_upgrades(),
        }
    }
}

impl GameConfig {
    /// Parse a JSON override; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn upgrade(&self, key: &str) -> Option<&UpgradeDefinition> {
        self.upgrades.get(key)
    }

    /// `floor(base_cost * cost_scaling^level)`, or `None` when the key is
    /// unknown or the upgrade is already at max level.
    pub fn upgrade_cost(&self, key: &str, level: u32) -> Option<u64> {
        let def = self.upgrade(key)?;
        if level >= def.max_level {
            return None;
        }
        Some((def.base_cost * def.cost_scaling.powi(level as i32)).floor() as u64)
    }

    /// `base_effect + effect_scaling * level`; zero for unknown keys.
    pub fn upgrade_effect(&self, key: &str, level: u32) -> f64 {
        match self.upgrade(key) {
            Some(def) => def.base_effect + def.effect_scaling * level as f64,
            None => 0.0,
        }
    }

    pub fn can_purchase(&self, key: &str, current_level: u32, owned: &ApUpgrades) -> bool {
        let Some(def) = self.upgrade(key) else {
            return false;
        };
        if current_level >= def.max_level {
            return false;
        }
        def.requires
            .iter()
            .all(|(req, min_level)| owned.level_of(req) >= *min_level)
    }

    /// Effect that only applies once the first level is bought. Used for
    /// starting bonuses and the AP gain bonus.
    pub fn purchased_bonus(&self, key: UpgradeKey, levels: &ApUpgrades) -> f64 {
        match levels.level(key) {
            0 => 0.0,
            level => self.upgrade_effect(key.as_str(), level),
        }
    }

    /// Base decay reduced per purchased level, never below the floor and
    /// never above the base rate.
    pub fn effective_decay_rate(&self, levels: &ApUpgrades) -> f64 {
        let base = self.worker_decay_rate;
        let reduction =
            levels.level(UpgradeKey::InvestorDecayRate) as f64 * self.decay_reduction_per_level;
        (base - reduction).min(base).max(self.min_decay_rate)
    }

    pub fn decay_multiplier(&self, depth: u32, levels: &ApUpgrades) -> f64 {
        decay_multiplier_for_rate(self.effective_decay_rate(levels), depth)
    }

    fn effect(&self, key: UpgradeKey, levels: &ApUpgrades) -> f64 {
        self.upgrade_effect(key.as_str(), levels.level(key))
    }

    /// Undamped hire capacity: base plus the capacity upgrade effect.
    pub fn hire_capacity(&self, levels: &ApUpgrades) -> f64 {
        self.base_hire_capacity + self.effect(UpgradeKey::HireCapacity, levels)
    }

    /// `floor(capacity * (1 - decay))`: how many sub-workers a root may hire.
    pub fn max_hires_for_depth_zero(&self, levels: &ApUpgrades) -> u32 {
        let rate = self.effective_decay_rate(levels);
        (self.hire_capacity(levels) * (1.0 - rate)).floor() as u32
    }

    /// The hiring cap the engine enforces at `depth`.
    pub fn structural_max_hires(&self, depth: u32, levels: &ApUpgrades) -> u32 {
        (self.hire_capacity(levels) * self.decay_multiplier(depth, levels)).floor() as u32
    }

    /// Capacity label shown next to an investor of the given tier. Tier 1 is
    /// decay-adjusted; deeper tiers show the undamped capacity.
    pub fn max_hires_for_tier(&self, tier: u32, levels: &ApUpgrades) -> u32 {
        if tier == 1 {
            self.max_hires_for_depth_zero(levels)
        } else {
            self.hire_capacity(levels).floor() as u32
        }
    }

    /// Row floor for the investor list. Display only.
    pub fn min_visible_rows(&self, narrow: bool) -> u32 {
        if narrow {
            self.narrow_min_visible_rows
        } else {
            0
        }
    }

    /// Number of investor rows to draw.
    pub fn visible_hire_rows(&self, levels: &ApUpgrades, narrow: bool) -> u32 {
        self.max_hires_for_depth_zero(levels)
            .max(self.min_visible_rows(narrow))
    }

    pub fn max_investor_slots(&self, levels: &ApUpgrades) -> u32 {
        self.default_root_slots
            + self.effect(UpgradeKey::HireCapacity, levels).floor().max(0.0) as u32
    }

    pub fn root_unlock_requirement(&self, slot: u32) -> f64 {
        slot as f64 * self.root_unlock_step
    }

    /// Clicks per second of an undecayed worker.
    pub fn worker_clicks_per_second(&self) -> f64 {
        if self.worker_click_interval_ms > 0.0 {
            1000.0 / self.worker_click_interval_ms
        } else {
            0.0
        }
    }

    pub fn online_speed_multiplier(&self, levels: &ApUpgrades) -> f64 {
        1.0 + self.effect(UpgradeKey::WorkerSpeedOnline, levels)
    }

    pub fn offline_speed_multiplier(&self, levels: &ApUpgrades) -> f64 {
        self.offline_speed_base + self.effect(UpgradeKey::WorkerSpeedOffline, levels)
    }

    pub fn ap_gain_multiplier(&self, levels: &ApUpgrades) -> f64 {
        1.0 + self.purchased_bonus(UpgradeKey::ApGainBonus, levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_level(key: UpgradeKey, level: u32) -> ApUpgrades {
        let mut ups = ApUpgrades::default();
        ups.set(key.as_str(), level);
        ups
    }

    #[test]
    fn upgrade_key_round_trips_through_str() {
        for key in UpgradeKey::all() {
            assert_eq!(UpgradeKey::from_key(key.as_str()), Some(*key));
        }
        assert_eq!(UpgradeKey::from_key("doubleClicks"), None);
    }

    #[test]
    fn cost_follows_geometric_curve() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.upgrade_cost("hireCapacity", 0), Some(15));
        // 15 * 1.8 = 27, 15 * 3.24 = 48.6
        assert_eq!(cfg.upgrade_cost("hireCapacity", 1), Some(27));
        assert_eq!(cfg.upgrade_cost("hireCapacity", 2), Some(48));
        assert_eq!(cfg.upgrade_cost("startingStones", 5), Some(1));
    }

    #[test]
    fn cost_unavailable_at_max_level_or_unknown_key() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.upgrade_cost("hireCapacity", 10), None);
        assert_eq!(cfg.upgrade_cost("hireCapacity", 11), None);
        assert_eq!(cfg.upgrade_cost("noSuchUpgrade", 0), None);
    }

    #[test]
    fn effect_is_linear_in_level() {
        let cfg = GameConfig::default();
        assert!((cfg.upgrade_effect("apGainBonus", 3) - 0.4).abs() < 1e-9);
        assert!((cfg.upgrade_effect("investorDecayRate", 2) + 0.06).abs() < 1e-9);
        assert_eq!(cfg.upgrade_effect("noSuchUpgrade", 3), 0.0);
    }

    #[test]
    fn purchased_bonus_is_zero_before_first_level() {
        let cfg = GameConfig::default();
        let none = ApUpgrades::default();
        assert_eq!(cfg.purchased_bonus(UpgradeKey::ApGainBonus, &none), 0.0);
        let one = with_level(UpgradeKey::ApGainBonus, 1);
        assert!((cfg.purchased_bonus(UpgradeKey::ApGainBonus, &one) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn capacity_effect_applies_at_level_zero() {
        let cfg = GameConfig::default();
        let none = ApUpgrades::default();
        assert_eq!(cfg.hire_capacity(&none), 6.0);
        let one = with_level(UpgradeKey::HireCapacity, 1);
        assert_eq!(cfg.hire_capacity(&one), 7.0);
    }

    #[test]
    fn can_purchase_checks_max_level_and_prerequisites() {
        let mut cfg = GameConfig::default();
        let owned = ApUpgrades::default();
        assert!(cfg.can_purchase("hireCapacity", 0, &owned));
        assert!(!cfg.can_purchase("hireCapacity", 10, &owned));
        assert!(!cfg.can_purchase("noSuchUpgrade", 0, &owned));

        if let Some(def) = cfg.upgrades.get_mut("apGainBonus") {
            def.requires.insert("hireCapacity".to_string(), 2);
        }
        assert!(!cfg.can_purchase("apGainBonus", 0, &owned));
        let owned = with_level(UpgradeKey::HireCapacity, 2);
        assert!(cfg.can_purchase("apGainBonus", 0, &owned));
    }

    #[test]
    fn decay_rate_defaults_to_base() {
        let cfg = GameConfig::default();
        assert!((cfg.effective_decay_rate(&ApUpgrades::default()) - 0.20).abs() < 1e-12);
    }

    #[test]
    fn decay_rate_reaches_floor_at_max_level() {
        let cfg = GameConfig::default();
        let ups = with_level(UpgradeKey::InvestorDecayRate, 8);
        assert!((cfg.effective_decay_rate(&ups) - 0.04).abs() < 1e-9);
        let ups = with_level(UpgradeKey::InvestorDecayRate, 40);
        assert!((cfg.effective_decay_rate(&ups) - 0.04).abs() < 1e-12);
    }

    #[test]
    fn depth_zero_already_decays_once() {
        let cfg = GameConfig::default();
        let ups = ApUpgrades::default();
        assert!((cfg.decay_multiplier(0, &ups) - 0.8).abs() < 1e-12);
        assert!((cfg.decay_multiplier(1, &ups) - 0.64).abs() < 1e-12);
    }

    #[test]
    fn depth_zero_capacity_matches_structural_cap() {
        let cfg = GameConfig::default();
        for level in 0..=10 {
            let ups = with_level(UpgradeKey::HireCapacity, level);
            assert_eq!(
                cfg.max_hires_for_depth_zero(&ups),
                cfg.structural_max_hires(0, &ups)
            );
        }
        // floor(6 * 0.8) = 4
        assert_eq!(cfg.max_hires_for_depth_zero(&ApUpgrades::default()), 4);
    }

    #[test]
    fn decay_upgrade_raises_depth_zero_cap() {
        let cfg = GameConfig::default();
        // floor(6 * 0.96) = 5
        let ups = with_level(UpgradeKey::InvestorDecayRate, 8);
        assert_eq!(cfg.max_hires_for_depth_zero(&ups), 5);
        assert_eq!(cfg.structural_max_hires(0, &ups), 5);
    }

    #[test]
    fn structural_cap_shrinks_with_depth_until_zero() {
        let cfg = GameConfig::default();
        let ups = ApUpgrades::default();
        let caps: Vec<u32> = (0..10).map(|d| cfg.structural_max_hires(d, &ups)).collect();
        // 6 * [0.8, 0.64, 0.512, 0.4096]
        assert_eq!(&caps[..4], &[4, 3, 3, 2]);
        assert!(caps.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*caps.last().unwrap(), 0);
    }

    #[test]
    fn tier_display_capacity_is_undamped_beyond_tier_one() {
        let cfg = GameConfig::default();
        let ups = ApUpgrades::default();
        assert_eq!(cfg.max_hires_for_tier(1, &ups), 4);
        assert_eq!(cfg.max_hires_for_tier(2, &ups), 6);
        assert_eq!(cfg.max_hires_for_tier(7, &ups), 6);
    }

    #[test]
    fn narrow_layout_floor_never_touches_engine_cap() {
        let cfg = GameConfig::default();
        let ups = ApUpgrades::default();
        assert_eq!(cfg.visible_hire_rows(&ups, true), 5);
        assert_eq!(cfg.visible_hire_rows(&ups, false), 4);
        assert_eq!(cfg.structural_max_hires(0, &ups), 4);
    }

    #[test]
    fn speed_and_ap_multipliers() {
        let cfg = GameConfig::default();
        let none = ApUpgrades::default();
        assert!((cfg.online_speed_multiplier(&none) - 1.01).abs() < 1e-12);
        assert!((cfg.offline_speed_multiplier(&none) - 0.55).abs() < 1e-12);
        assert_eq!(cfg.ap_gain_multiplier(&none), 1.0);

        let mut ups = ApUpgrades::default();
        ups.set("workerSpeedOnline", 2);
        ups.set("workerSpeedOffline", 1);
        ups.set("apGainBonus", 1);
        assert!((cfg.online_speed_multiplier(&ups) - 1.03).abs() < 1e-12);
        assert!((cfg.offline_speed_multiplier(&ups) - 0.6).abs() < 1e-12);
        assert!((cfg.ap_gain_multiplier(&ups) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn investor_slots_grow_with_capacity_upgrade() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.max_investor_slots(&ApUpgrades::default()), 6);
        let ups = with_level(UpgradeKey::HireCapacity, 3);
        assert_eq!(cfg.max_investor_slots(&ups), 9);
        let ups = with_level(UpgradeKey::HireCapacity, 10);
        assert_eq!(cfg.max_investor_slots(&ups), 16);
        assert_eq!(cfg.root_unlock_requirement(3), 30.0);
    }

    #[test]
    fn config_json_override_keeps_defaults() {
        let cfg = GameConfig::from_json(r#"{ "offlineSpeedBase": 1.0, "clicksPerStone": 5 }"#)
            .unwrap();
        assert_eq!(cfg.offline_speed_base, 1.0);
        assert_eq!(cfg.clicks_per_stone, 5.0);
        assert_eq!(cfg.stones_per_pyramid, 10.0);
        assert_eq!(cfg.upgrades.len(), 7);
    }

    #[test]
    fn ap_upgrade_levels_load_leniently() {
        let ups: ApUpgrades = serde_json::from_str(
            r#"{"hireCapacity": null, "apGainBonus": 2.7, "startingStones": -4,
                "investorDecayRate": "3", "startingPyramids": 5}"#,
        )
        .unwrap();
        assert_eq!(ups.level(UpgradeKey::HireCapacity), 0);
        assert_eq!(ups.level(UpgradeKey::ApGainBonus), 2);
        assert_eq!(ups.level(UpgradeKey::StartingStones), 0);
        assert_eq!(ups.level(UpgradeKey::InvestorDecayRate), 0);
        assert_eq!(ups.level(UpgradeKey::StartingPyramids), 5);
    }

    #[test]
    fn ap_upgrades_merge_keeps_unknown_keys() {
        let mut persisted = ApUpgrades(BTreeMap::new());
        persisted.set("hireCapacity", 3);
        persisted.set("legacyBonus", 2);
        let merged = ApUpgrades::default().merged_with(&persisted);
        assert_eq!(merged.level(UpgradeKey::HireCapacity), 3);
        assert_eq!(merged.level(UpgradeKey::ApGainBonus), 0);
        assert_eq!(merged.level_of("legacyBonus"), 2);
    }
}
