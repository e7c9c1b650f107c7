//! Pyramid Scheme: an incremental game about sculpting stones, stacking
//! pyramids, and recruiting investors who recruit investors.
//!
//! [`game`] holds the simulation core and has no browser dependencies.
//! [`time`] turns frame timestamps into fixed ticks and [`app`] wires both to
//! key presses for the terminal front-end.

pub mod app;
pub mod game;
pub mod time;

pub use game::{GameConfig, GameSession};
