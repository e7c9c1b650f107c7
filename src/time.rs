//! Fixed-timestep scheduler using an accumulator pattern.
//!
//! `draw_web()` calls at ~60fps with variable delta. The scheduler converts
//! this into a whole number of simulation ticks and tells the caller when an
//! autosave is due. Stopping it cancels both.

use crate::game::GameConfig;

/// Frames further apart than this are treated as a backgrounded tab; the
/// missing time is left for offline reconciliation.
const MAX_FRAME_DELTA_MS: f64 = 500.0;

/// Work due this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Schedule {
    pub ticks: u32,
    pub autosave: bool,
}

pub struct Scheduler {
    ms_per_tick: f64,
    autosave_every_ms: f64,
    /// Milliseconds not yet consumed as ticks
    accumulator: f64,
    since_autosave: f64,
    pub total_ticks: u64,
    /// Timestamp of the last update (ms), None on the first frame
    last_timestamp: Option<f64>,
    running: bool,
}

impl Scheduler {
    pub fn new(ms_per_tick: f64, autosave_every_ms: f64) -> Self {
        Self {
            ms_per_tick: ms_per_tick.max(1.0),
            autosave_every_ms,
            accumulator: 0.0,
            since_autosave: 0.0,
            total_ticks: 0,
            last_timestamp: None,
            running: true,
        }
    }

    pub fn from_config(cfg: &GameConfig) -> Self {
        Self::new(cfg.tick_rate_ms, cfg.autosave_interval_ms)
    }

    /// Feed the frame timestamp; returns what to run this frame.
    pub fn update(&mut self, now_ms: f64) -> Schedule {
        if !self.running {
            return Schedule::default();
        }
        let raw = match self.last_timestamp {
            Some(prev) => (now_ms - prev).max(0.0),
            None => 0.0,
        };
        self.last_timestamp = Some(now_ms);

        self.accumulator += raw.min(MAX_FRAME_DELTA_MS);
        let ticks = (self.accumulator / self.ms_per_tick) as u32;
        self.accumulator -= ticks as f64 * self.ms_per_tick;
        self.total_ticks += ticks as u64;

        self.since_autosave += raw;
        let autosave = self.autosave_every_ms > 0.0 && self.since_autosave >= self.autosave_every_ms;
        if autosave {
            self.since_autosave = 0.0;
        }

        Schedule { ticks, autosave }
    }

    /// Timestamps for `ticks` ticks ending at `now_ms`, oldest first.
    pub fn tick_times(&self, now_ms: f64, ticks: u32) -> impl Iterator<Item = f64> {
        let step = self.ms_per_tick;
        (0..ticks).map(move |i| now_ms - (ticks - 1 - i) as f64 * step)
    }

    /// Cancel both timers. Later updates do nothing.
    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator = 0.0;
        self.since_autosave = 0.0;
    }
}
