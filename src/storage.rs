//! localStorage persistence for the browser build.
//!
//! Failures never interrupt play: they are reported on the browser console
//! and the game carries on. An unreadable save is copied aside under a
//! backup key and a fresh session starts.

#[cfg(target_arch = "wasm32")]
use pyramid_scheme::game::Restored;
use pyramid_scheme::{GameConfig, GameSession};

#[cfg(target_arch = "wasm32")]
const STORAGE_KEY: &str = "pyramidScheme_save";
/// Unreadable saves are copied here before autosave can overwrite them.
#[cfg(target_arch = "wasm32")]
const BACKUP_KEY: &str = "pyramidScheme_save_unreadable";

#[cfg(target_arch = "wasm32")]
fn get_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

/// Write the session to localStorage, stamping `now` as the save time.
#[cfg(target_arch = "wasm32")]
pub fn save_session(session: &mut GameSession, now: f64) {
    let json = match session.save_json(now) {
        Ok(j) => j,
        Err(e) => {
            web_sys::console::warn_1(&format!("Pyramid Scheme: save failed: {e}").into());
            return;
        }
    };

    if let Some(storage) = get_storage() {
        if let Err(e) = storage.set_item(STORAGE_KEY, &json) {
            web_sys::console::warn_1(
                &format!("Pyramid Scheme: could not write localStorage: {e:?}").into(),
            );
        }
    }
}

/// Restore the saved session, crediting offline time. Falls back to a fresh
/// session when nothing is stored or the save is unreadable.
#[cfg(target_arch = "wasm32")]
pub fn load_session(config: GameConfig, now: f64) -> Restored {
    let fresh = |config| Restored {
        session: GameSession::new(config),
        offline: None,
    };

    let Some(storage) = get_storage() else {
        return fresh(config);
    };
    let json = match storage.get_item(STORAGE_KEY) {
        Ok(Some(j)) => j,
        _ => return fresh(config),
    };

    match GameSession::load_json(config.clone(), &json, now) {
        Ok(restored) => {
            if let Some(report) = &restored.offline {
                web_sys::console::log_1(
                    &format!(
                        "Pyramid Scheme: offline {:.0}s, +{} pyramids",
                        report.capped_elapsed_ms / 1000.0,
                        report.pyramids_gained
                    )
                    .into(),
                );
            }
            restored
        }
        Err(e) => {
            web_sys::console::warn_1(
                &format!("Pyramid Scheme: could not read save, starting fresh: {e}").into(),
            );
            let _ = storage.set_item(BACKUP_KEY, &json);
            fresh(config)
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub fn delete_save() {
    if let Some(storage) = get_storage() {
        let _ = storage.remove_item(STORAGE_KEY);
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn save_session(_session: &mut GameSession, _now: f64) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_session(config: GameConfig, _now: f64) -> pyramid_scheme::game::Restored {
    pyramid_scheme::game::Restored {
        session: GameSession::new(config),
        offline: None,
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn delete_save() {}
