//! Idle Breakout - incremental brick-breaker simulation core
//!
//! Core modules:
//! - `sim`: Deterministic playfield (grid, balls, physics, noise)
//! - `economy`: Currency, upgrades, save document, prestige layers
//! - `session`: Per-frame orchestration and player actions
//! - `persistence`: Storage backends and export strings
//! - `settings`: Engine limits and tuning

pub mod economy;
pub mod error;
pub mod persistence;
pub mod records;
pub mod session;
pub mod settings;
pub mod sim;

pub use economy::{Decimal, PlayerState};
pub use records::StarRecords;
pub use session::{GameEvent, Session, TickInput, tick};
pub use settings::Settings;

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// World units per grid cell unless the player picks another size
    pub const DEFAULT_CELL_SIZE: f32 = 24.0;

    /// Launch angle jitter either side of straight up (radians)
    pub const SPAWN_JITTER: f32 = 0.6;

    /// Heavy auto-spawn: base interval, reduction per level, floor (seconds)
    pub const HEAVY_SPAWN_BASE_SECS: f32 = 60.0;
    pub const HEAVY_SPAWN_STEP_SECS: f32 = 8.0;
    pub const HEAVY_SPAWN_MIN_SECS: f32 = 20.0;
    /// Auto-spawned heavies alive at once
    pub const MAX_AUTO_HEAVIES: usize = 3;
}

/// Velocity vector from speed and heading (radians, +x = 0, +y down)
#[inline]
pub fn velocity_from_angle(speed: f32, angle: f32) -> Vec2 {
    Vec2::new(speed * angle.cos(), speed * angle.sin())
}

/// Heading of a velocity vector
#[inline]
pub fn angle_of(velocity: Vec2) -> f32 {
    velocity.y.atan2(velocity.x)
}
