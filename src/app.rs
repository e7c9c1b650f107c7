//! Front-end state shared by the key handler and the draw loop.
//!
//! Everything here is browser-agnostic so it can be unit tested; the binary
//! only forwards key presses and frame timestamps and carries out the
//! returned [`Command`]s against storage.

use tracing::info;

use crate::game::{GameSession, OfflineReport, UpgradeKey};
use crate::time::Scheduler;

const MAX_LOG: usize = 50;

/// Upgrade store hotkeys, in [`UpgradeKey::all`] order.
pub const UPGRADE_HOTKEYS: [char; 7] = ['a', 'b', 'c', 'd', 'e', 'f', 'g'];

/// Root slots reachable with the digit keys at once.
pub const SLOTS_PER_PAGE: u32 = 9;

/// Storage work the host must perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Save,
    WipeSave,
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub text: String,
    pub is_important: bool,
}

/// Which panel the upgrade hotkeys currently drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Play,
    Store,
}

pub struct App {
    pub session: GameSession,
    pub scheduler: Scheduler,
    pub input_mode: InputMode,
    pub log: Vec<LogEntry>,
    /// Which nine root slots the digit keys address.
    pub slot_page: u32,
    delete_armed: bool,
}

impl App {
    pub fn new(session: GameSession, offline: Option<OfflineReport>) -> Self {
        let scheduler = Scheduler::from_config(session.config());
        let mut app = Self {
            session,
            scheduler,
            input_mode: InputMode::Play,
            log: Vec::new(),
            slot_page: 0,
            delete_armed: false,
        };
        app.add_log("The aliens want pyramids. Start sculpting.", false);
        if let Some(report) = offline {
            app.add_log(&offline_message(&report), true);
        }
        app
    }

    pub fn add_log(&mut self, text: &str, is_important: bool) {
        self.log.push(LogEntry {
            text: text.to_string(),
            is_important,
        });
        if self.log.len() > MAX_LOG {
            self.log.remove(0);
        }
    }

    /// Run the ticks due at frame time `now`.
    pub fn frame(&mut self, now: f64) -> Option<Command> {
        let schedule = self.scheduler.update(now);
        for t in self.scheduler.tick_times(now, schedule.ticks) {
            self.session.advance_one_tick(t);
        }
        schedule.autosave.then_some(Command::Save)
    }

    pub fn handle_key(&mut self, key: char) -> Option<Command> {
        if key != 'x' {
            self.delete_armed = false;
        }
        match self.input_mode {
            InputMode::Play => self.handle_play_key(key),
            InputMode::Store => self.handle_store_key(key),
        }
    }

    fn handle_play_key(&mut self, key: char) -> Option<Command> {
        match key {
            'c' => self.session.register_player_click(),
            '1'..='9' => {
                let digit = key.to_digit(10).unwrap_or(0);
                self.hire_root(self.slot_page * SLOTS_PER_PAGE + digit);
            }
            'n' => self.next_slot_page(),
            'p' => self.prestige(),
            'u' => {
                if self.session.ap_store_visible() {
                    self.input_mode = InputMode::Store;
                } else {
                    self.add_log("The aliens are not trading upgrades yet.", false);
                }
            }
            'v' => {
                if self.session.acknowledge_victory() {
                    self.add_log("Victory noted. The aliens want more.", false);
                }
            }
            's' => {
                self.add_log("Game saved.", false);
                return Some(Command::Save);
            }
            'x' => return self.delete_key(),
            _ => {}
        }
        None
    }

    fn handle_store_key(&mut self, key: char) -> Option<Command> {
        match key {
            'u' | 'q' => self.input_mode = InputMode::Play,
            'x' => return self.delete_key(),
            _ => {
                if let Some(idx) = UPGRADE_HOTKEYS.iter().position(|k| *k == key) {
                    if let Some(upgrade) = UpgradeKey::all().get(idx) {
                        self.buy(*upgrade);
                    }
                }
            }
        }
        None
    }

    fn hire_root(&mut self, slot: u32) {
        if self.session.hire_root_worker(slot) {
            self.add_log(&format!("Investor #{} joined the scheme!", slot), true);
            return;
        }
        let unlocked = self
            .session
            .state
            .workers
            .get(&slot)
            .is_some_and(|w| w.unlocked);
        let max_slots = self
            .session
            .config()
            .max_investor_slots(&self.session.state.ap_upgrades);
        if !unlocked && slot <= max_slots {
            let need = self.session.config().root_unlock_requirement(slot);
            self.add_log(
                &format!("Investor #{} needs {} pyramids.", slot, format_number(need)),
                false,
            );
        }
    }

    fn slot_pages(&self) -> u32 {
        let slots = self
            .session
            .config()
            .max_investor_slots(&self.session.state.ap_upgrades);
        slots.div_ceil(SLOTS_PER_PAGE).max(1)
    }

    fn next_slot_page(&mut self) {
        let pages = self.slot_pages();
        if pages == 1 {
            self.slot_page = 0;
            return;
        }
        self.slot_page = (self.slot_page + 1) % pages;
        let first = self.slot_page * SLOTS_PER_PAGE + 1;
        self.add_log(
            &format!("Digits now hire investors #{}-#{}.", first, first + SLOTS_PER_PAGE - 1),
            false,
        );
    }

    /// Digit key that hires `slot` on the current page, if any.
    pub fn slot_hotkey(&self, slot: u32) -> Option<char> {
        if slot == 0 || (slot - 1) / SLOTS_PER_PAGE != self.slot_page {
            return None;
        }
        char::from_digit(slot - self.slot_page * SLOTS_PER_PAGE, 10)
    }

    pub fn has_more_slot_pages(&self) -> bool {
        self.slot_pages() > 1
    }

    fn prestige(&mut self) {
        match self.session.perform_prestige() {
            Some(receipt) => {
                self.add_log(
                    &format!("Sold to the aliens for {} AP.", receipt.ap_gained),
                    true,
                );
                if receipt.victory {
                    self.add_log("A BILLION PYRAMIDS! You won. [V] to continue.", true);
                }
            }
            None => {
                let need = self.session.config().ap_base_pyramid_cost;
                self.add_log(
                    &format!("The aliens only buy {}+ pyramids.", format_number(need)),
                    false,
                );
            }
        }
    }

    fn buy(&mut self, key: UpgradeKey) {
        let name = self
            .session
            .config()
            .upgrade(key.as_str())
            .map(|d| d.name.clone())
            .unwrap_or_else(|| key.as_str().to_string());
        if self.session.purchase_upgrade(key.as_str()) {
            let level = self.session.state.ap_upgrades.level(key);
            self.add_log(&format!("{} -> Lv.{}", name, level), true);
        } else {
            self.add_log(&format!("Cannot buy {} right now.", name), false);
        }
    }

    fn delete_key(&mut self) -> Option<Command> {
        if !self.delete_armed {
            self.delete_armed = true;
            self.add_log("Press X again to delete ALL progress.", true);
            return None;
        }
        self.delete_armed = false;
        if self.session.delete_everything(true, true) {
            info!("save wiped from front-end");
            self.input_mode = InputMode::Play;
            self.slot_page = 0;
            self.log.clear();
            self.add_log("All progress deleted.", true);
            return Some(Command::WipeSave);
        }
        None
    }

    pub fn delete_armed(&self) -> bool {
        self.delete_armed
    }
}

pub fn offline_message(report: &OfflineReport) -> String {
    let minutes = (report.capped_elapsed_ms / 60_000.0).floor() as u64;
    format!(
        "Welcome back! {}h {}m away at {:.0}% speed: +{} pyramids.",
        minutes / 60,
        minutes % 60,
        report.offline_multiplier_used * 100.0,
        format_number(report.pyramids_gained)
    )
}

/// Format a number with comma separators.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    if n >= 1e15 {
        return format!("{:.2e}", n);
    }
    let whole = n.floor() as u64;
    let s = whole.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(GameSession::default(), None)
    }

    #[test]
    fn click_key_sculpts() {
        let mut app = app();
        for _ in 0..100 {
            app.handle_key('c');
        }
        assert_eq!(app.session.state.pyramids, 1.0);
    }

    #[test]
    fn digit_hires_root() {
        let mut app = app();
        app.handle_key('1');
        assert!(!app.session.state.workers[&1].unlocked);
        assert!(app.log.last().is_some_and(|e| e.text.contains("needs 10")));
        app.session.state.pyramids = 10.0;
        app.handle_key('1');
        assert!(app.session.state.workers[&1].unlocked);
    }

    #[test]
    fn slot_page_reaches_slots_beyond_nine() {
        let mut app = app();
        app.session.state.pyramids = 1_000.0;
        app.handle_key('n');
        assert_eq!(app.slot_page, 0, "six slots fit on one page");

        app.session.state.ap_upgrades.set("hireCapacity", 10);
        assert!(app.has_more_slot_pages());
        app.handle_key('n');
        assert_eq!(app.slot_page, 1);
        assert_eq!(app.slot_hotkey(12), Some('3'));
        assert_eq!(app.slot_hotkey(3), None);
        app.handle_key('3');
        assert!(app.session.state.workers[&12].unlocked);

        app.handle_key('n');
        assert_eq!(app.slot_page, 0);
        assert_eq!(app.slot_hotkey(3), Some('3'));
    }

    #[test]
    fn delete_needs_two_presses_in_a_row() {
        let mut app = app();
        app.session.state.alien_points = 5;
        assert_eq!(app.handle_key('x'), None);
        assert_eq!(app.handle_key('c'), None);
        assert_eq!(app.handle_key('x'), None);
        assert_eq!(app.session.state.alien_points, 5);
        assert_eq!(app.handle_key('x'), Some(Command::WipeSave));
        assert_eq!(app.session.state.alien_points, 0);
    }

    #[test]
    fn store_requires_visibility() {
        let mut app = app();
        app.handle_key('u');
        assert_eq!(app.input_mode, InputMode::Play);
        app.session.state.alien_points = 20;
        app.handle_key('u');
        assert_eq!(app.input_mode, InputMode::Store);
        app.handle_key('c'); // hireCapacity
        assert_eq!(app.session.state.ap_upgrades.level(UpgradeKey::HireCapacity), 1);
        assert_eq!(app.session.state.alien_points, 5);
        app.handle_key('q');
        assert_eq!(app.input_mode, InputMode::Play);
    }

    #[test]
    fn save_key_returns_command() {
        let mut app = app();
        assert_eq!(app.handle_key('s'), Some(Command::Save));
    }

    #[test]
    fn frame_runs_ticks_and_autosaves() {
        let mut app = app();
        app.session.state.pyramids = 10.0;
        app.handle_key('1');
        assert_eq!(app.frame(1_000.0), None);
        let mut now = 1_000.0;
        let mut saves = 0;
        for _ in 0..1_300 {
            now += 50.0;
            if app.frame(now) == Some(Command::Save) {
                saves += 1;
            }
        }
        assert_eq!(saves, 1);
        assert!(app.scheduler.total_ticks >= 640);
        assert!(app.session.state.workers[&1].stone_progress > 0.0
            || app.session.state.workers[&1].sculpted_stones > 0.0);
    }

    #[test]
    fn offline_report_is_logged() {
        let report = OfflineReport {
            capped_elapsed_ms: 7_500_000.0,
            pyramids_gained: 1234.0,
            offline_multiplier_used: 0.5,
        };
        let app = App::new(GameSession::default(), Some(report));
        let last = &app.log.last().unwrap().text;
        assert!(last.contains("2h 5m"));
        assert!(last.contains("50%"));
        assert!(last.contains("1,234"));
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.9), "999");
        assert_eq!(format_number(1_000.0), "1,000");
        assert_eq!(format_number(1_234_567.0), "1,234,567");
        assert_eq!(format_number(f64::NAN), "0");
    }
}
