//! Deterministic playfield simulation
//!
//! Grid, balls and their physics. This module must stay pure:
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No economy, storage or platform dependencies

pub mod ball;
pub mod ball_kind;
pub mod collision;
pub mod grid;
pub mod rng;
pub mod state;

pub use ball::{Ball, BallAux, BallSnapshot};
pub use ball_kind::{BALL_TYPES, BallKind, BallTypeDef, StepEnv};
pub use collision::{CircleHit, Rect, WorldBounds, circle_rect_collision, reflect_velocity};
pub use grid::{
    BlockGrid, CELL_SIZE_RANGE, DamageReport, FillBand, GenerateOptions, GridHit, GridLimits,
    GridSnapshot, PatternKind, calibrate_noise_threshold,
};
pub use rng::{SeededStream, derive_level_seed, hash_2d, random_seed, seed_from_text, value_noise_2d};
pub use state::{GameSnapshot, GameState};
