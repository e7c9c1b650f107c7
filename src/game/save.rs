//! Persisted save record and tolerant loading.
//!
//! Unknown fields are ignored, missing or `null` fields fall back to their
//! defaults, and a save without a worker map gets fresh locked roots.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use super::params::{ApUpgrades, GameConfig};
use super::state::{default_workers, PlayerState, WorkerNode};

pub const SAVE_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not parse save data: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("could not serialize save data: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("no save data found in the imported text")]
    NoJsonFound,
}

/// Deserialize `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alien_points: f64,
    pub ap_upgrades: Option<ApUpgrades>,
    #[serde(deserialize_with = "null_as_default")]
    pub stone_progress: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub sculpted_stones: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub pyramids: f64,
    pub workers: Option<BTreeMap<u32, WorkerNode>>,
    #[serde(deserialize_with = "null_as_default")]
    pub last_save_time: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub ap_store_unlocked: bool,
}

/// Snapshot `state` into a record stamped at `now`.
pub fn extract_save(state: &PlayerState, now: f64) -> SaveRecord {
    SaveRecord {
        version: SAVE_VERSION.to_string(),
        alien_points: state.alien_points as f64,
        ap_upgrades: Some(state.ap_upgrades.clone()),
        stone_progress: state.stone_progress,
        sculpted_stones: state.sculpted_stones,
        pyramids: state.pyramids,
        workers: Some(state.workers.clone()),
        last_save_time: now,
        ap_store_unlocked: state.ap_store_unlocked,
    }
}

/// Build a player state from a record, healing anything out of range.
pub fn apply_save(record: &SaveRecord, cfg: &GameConfig) -> PlayerState {
    let mut state = PlayerState::new(cfg);
    state.alien_points = non_negative(record.alien_points).floor() as u64;
    if let Some(levels) = &record.ap_upgrades {
        state.ap_upgrades = ApUpgrades::default().merged_with(levels);
    }
    state.stone_progress = non_negative(record.stone_progress);
    state.sculpted_stones = non_negative(record.sculpted_stones);
    state.pyramids = non_negative(record.pyramids);
    state.ap_store_unlocked = record.ap_store_unlocked;
    state.last_save_time = non_negative(record.last_save_time);

    match &record.workers {
        Some(workers) => {
            state.workers = workers.clone();
            for (slot, root) in state.workers.iter_mut() {
                root.tier = *slot;
                root.depth = 0;
                root.for_each_mut(&mut heal_node);
            }
        }
        None => state.workers = default_workers(cfg),
    }
    state
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

fn heal_node(node: &mut WorkerNode) {
    node.stone_progress = non_negative(node.stone_progress);
    node.sculpted_stones = non_negative(node.sculpted_stones);
    node.pyramids = non_negative(node.pyramids);
    node.last_tick_time = non_negative(node.last_tick_time);
}

pub fn to_json(record: &SaveRecord) -> Result<String, SaveError> {
    serde_json::to_string(record).map_err(SaveError::Serialize)
}

pub fn from_json(json: &str) -> Result<SaveRecord, SaveError> {
    let record: SaveRecord = serde_json::from_str(json).map_err(SaveError::Parse)?;
    debug!(version = %record.version, "save record parsed");
    Ok(record)
}

/// Parse pasted text: either a bare save object or one embedded in
/// surrounding text (from the first `{` to the last `}`).
pub fn import_text(text: &str) -> Result<SaveRecord, SaveError> {
    let start = text.find('{').ok_or(SaveError::NoJsonFound)?;
    let end = text.rfind('}').ok_or(SaveError::NoJsonFound)?;
    if end < start {
        return Err(SaveError::NoJsonFound);
    }
    from_json(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_roundtrip() {
        let cfg = GameConfig::default();
        let mut state = PlayerState::new(&cfg);
        state.pyramids = 1234.0;
        state.alien_points = 9;
        state.ap_upgrades.set("hireCapacity", 2);
        if let Some(root) = state.workers.get_mut(&1) {
            root.unlocked = true;
            root.last_tick_time = 500.0;
            let child = root.hire(0.64, 500.0);
            root.sub_workers.push(child);
        }

        let json = to_json(&extract_save(&state, 9_000.0)).unwrap();
        let restored = apply_save(&from_json(&json).unwrap(), &cfg);

        assert_eq!(restored.pyramids, 1234.0);
        assert_eq!(restored.alien_points, 9);
        assert_eq!(restored.ap_upgrades.level_of("hireCapacity"), 2);
        assert_eq!(restored.last_save_time, 9_000.0);
        assert_eq!(restored.workers, state.workers);
    }

    #[test]
    fn json_uses_camel_case_and_string_tier_keys() {
        let cfg = GameConfig::default();
        let state = PlayerState::new(&cfg);
        let json = to_json(&extract_save(&state, 1.0)).unwrap();
        assert!(json.contains("\"alienPoints\""));
        assert!(json.contains("\"apStoreUnlocked\""));
        assert!(json.contains("\"subWorkers\""));
        assert!(json.contains("\"1\":{"));
    }

    #[test]
    fn empty_object_loads_defaults() {
        let cfg = GameConfig::default();
        let state = apply_save(&from_json("{}").unwrap(), &cfg);
        assert_eq!(state, PlayerState::new(&cfg));
    }

    #[test]
    fn nulls_load_as_defaults() {
        let cfg = GameConfig::default();
        let json = r#"{
            "alienPoints": null, "pyramids": null, "apUpgrades": null,
            "workers": null, "apStoreUnlocked": null, "version": null
        }"#;
        let state = apply_save(&from_json(json).unwrap(), &cfg);
        assert_eq!(state.alien_points, 0);
        assert_eq!(state.pyramids, 0.0);
        assert_eq!(state.workers.len(), 5);
        assert!(!state.ap_store_unlocked);
    }

    #[test]
    fn unknown_fields_ignored() {
        let json = r#"{"pyramids": 12, "futureField": [1, 2, 3], "workers": {"1": {"unlocked": true, "mood": "happy"}}}"#;
        let record = from_json(json).unwrap();
        assert_eq!(record.pyramids, 12.0);
        let workers = record.workers.unwrap();
        assert!(workers[&1].unlocked);
        assert_eq!(workers[&1].decay_multiplier, 1.0);
    }

    #[test]
    fn partial_upgrades_merge_with_zeroes() {
        let cfg = GameConfig::default();
        let json = r#"{"apUpgrades": {"apGainBonus": 3}}"#;
        let state = apply_save(&from_json(json).unwrap(), &cfg);
        assert_eq!(state.ap_upgrades.level_of("apGainBonus"), 3);
        assert_eq!(state.ap_upgrades.level_of("startingStones"), 0);
    }

    #[test]
    fn negative_values_are_healed() {
        let cfg = GameConfig::default();
        let json = r#"{"pyramids": -50, "alienPoints": -2,
            "workers": {"1": {"unlocked": true, "pyramids": -3}}}"#;
        let state = apply_save(&from_json(json).unwrap(), &cfg);
        assert_eq!(state.pyramids, 0.0);
        assert_eq!(state.alien_points, 0);
        assert_eq!(state.workers[&1].pyramids, 0.0);
    }

    #[test]
    fn null_upgrade_level_does_not_fail_the_load() {
        let cfg = GameConfig::default();
        let json = r#"{"pyramids": 500, "alienPoints": 40,
            "apUpgrades": {"hireCapacity": null, "apGainBonus": 2}}"#;
        let state = apply_save(&from_json(json).unwrap(), &cfg);
        assert_eq!(state.alien_points, 40);
        assert_eq!(state.ap_upgrades.level_of("hireCapacity"), 0);
        assert_eq!(state.ap_upgrades.level_of("apGainBonus"), 2);
    }

    #[test]
    fn root_tier_comes_from_slot_key() {
        let cfg = GameConfig::default();
        let json = r#"{"workers": {"3": {"unlocked": true,
            "subWorkers": [{"unlocked": true, "tier": 4, "depth": 1}]}}}"#;
        let state = apply_save(&from_json(json).unwrap(), &cfg);
        let root = &state.workers[&3];
        assert_eq!(root.tier, 3);
        assert_eq!(root.depth, 0);
        assert_eq!(root.hire(0.64, 0.0).tier, 4);
    }

    #[test]
    fn corrupt_json_is_an_error() {
        assert!(matches!(from_json("{not json"), Err(SaveError::Parse(_))));
    }

    #[test]
    fn import_extracts_embedded_object() {
        let text = "here is my save: {\"pyramids\": 77} thanks";
        assert_eq!(import_text(text).unwrap().pyramids, 77.0);
    }

    #[test]
    fn import_without_object_fails() {
        assert!(matches!(import_text("no save here"), Err(SaveError::NoJsonFound)));
        assert!(matches!(import_text("} backwards {"), Err(SaveError::NoJsonFound)));
    }
}
