//! Prestige ledger: sell the run's pyramids to the aliens for permanent
//! Alien Points.

use tracing::info;

use super::params::{ApUpgrades, GameConfig};
use super::state::PlayerState;

/// Result of a successful prestige.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrestigeReceipt {
    pub ap_gained: u64,
    /// The sold run had reached the victory goal.
    pub victory: bool,
}

/// `floor(floor(pyramids / cost) * ap_gain_multiplier)`.
pub fn ap_gain(cfg: &GameConfig, pyramids: f64, levels: &ApUpgrades) -> u64 {
    if cfg.ap_base_pyramid_cost <= 0.0 || pyramids <= 0.0 {
        return 0;
    }
    let base = (pyramids / cfg.ap_base_pyramid_cost).floor();
    (base * cfg.ap_gain_multiplier(levels)).floor() as u64
}

pub fn can_prestige(cfg: &GameConfig, pyramids: f64) -> bool {
    pyramids >= cfg.ap_base_pyramid_cost
}

pub fn has_won(cfg: &GameConfig, pyramids: f64) -> bool {
    pyramids >= cfg.pyramid_victory_goal
}

/// Whether the AP store should be shown at all.
pub fn ap_store_visible(cfg: &GameConfig, state: &PlayerState) -> bool {
    state.ap_store_unlocked
        || state.pyramids >= cfg.ap_store_reveal_pyramids
        || state.alien_points > 0
}

/// Convert the run into AP and start a fresh run. Refused (state untouched)
/// below the threshold or when the sale would be worth nothing.
pub fn perform_prestige(state: &mut PlayerState, cfg: &GameConfig) -> Option<PrestigeReceipt> {
    if !can_prestige(cfg, state.pyramids) {
        return None;
    }
    let gained = ap_gain(cfg, state.pyramids, &state.ap_upgrades);
    if gained == 0 {
        return None;
    }

    let victory = has_won(cfg, state.pyramids);
    let sold = state.pyramids;

    state.alien_points += gained;
    state.ap_store_unlocked = true;
    state.reset_run(cfg);
    state.apply_starting_bonuses(cfg);
    if victory {
        state.victory_pending = true;
    }

    info!(sold, ap_gained = gained, total_ap = state.alien_points, victory, "prestige");
    Some(PrestigeReceipt {
        ap_gained: gained,
        victory,
    })
}
