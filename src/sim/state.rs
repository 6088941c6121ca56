//! Live playfield state: the grid and every ball on it
//!
//! Everything needed to resume a session round-trips through
//! `GameSnapshot`; the RNG is reseeded on restore (it only drives cosmetic
//! and retargeting choices).

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ball::{Ball, BallSnapshot};
use super::ball_kind::{BallKind, StepEnv};
use super::collision::WorldBounds;
use super::grid::{BlockGrid, GridLimits, GridSnapshot};
use super::rng::SeededStream;
use crate::consts::{DEFAULT_CELL_SIZE, SPAWN_JITTER};
use crate::error::SnapshotError;

/// Persisted playfield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub balls: Vec<BallSnapshot>,
    pub grid: GridSnapshot,
    pub initial_blocks: u32,
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub grid: BlockGrid,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<Ball>,
    /// Alive cells right after the current level was generated
    pub initial_blocks: u32,
    pub rng: SeededStream,
    /// Seconds accumulated toward the next heavy auto-spawn
    pub heavy_spawn_timer: f32,
    next_id: u32,
}

impl GameState {
    pub fn new(grid: BlockGrid, seed: u32) -> Self {
        let initial_blocks = grid.alive_count() as u32;
        Self {
            grid,
            balls: Vec::new(),
            initial_blocks,
            rng: SeededStream::new(seed),
            heavy_spawn_timer: 0.0,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    pub fn bounds(&self) -> WorldBounds {
        let extent = self.grid.origin() + self.grid.extent();
        WorldBounds::new(extent.x, extent.y)
    }

    /// Launch point: bottom centre, one cell above the floor
    pub fn spawn_point(&self) -> Vec2 {
        let b = self.bounds();
        Vec2::new(b.width * 0.5, (b.height - self.grid.cell_size()).max(0.0))
    }

    /// Spawn a ball at the launch point heading upward with a little jitter
    pub fn spawn_ball(&mut self, kind: BallKind, speed: f32, damage: Option<f64>) -> u32 {
        let id = self.next_entity_id();
        let jitter = self.rng.range(-SPAWN_JITTER as f64, SPAWN_JITTER as f64) as f32;
        let angle = -std::f32::consts::FRAC_PI_2 + jitter;
        let mut pos = self.spawn_point();
        // Nudge sideways out of any brick sitting on the launch point
        let radius = kind.def().radius;
        if self.grid.has_alive_block_within_radius(pos, radius + self.grid.cell_size()) {
            let b = self.bounds();
            pos.x = self.rng.range(radius as f64, (b.width - radius).max(radius) as f64) as f32;
        }
        self.balls
            .push(Ball::spawn(id, kind, pos, speed, angle, damage, None));
        id
    }

    pub fn ball_mut(&mut self, id: u32) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }

    pub fn ball_count(&self, kind: BallKind) -> usize {
        self.balls.iter().filter(|b| b.kind == kind).count()
    }

    /// Ensure balls are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
    }

    /// Swap in a freshly generated grid for a new level
    pub fn replace_grid(&mut self, grid: BlockGrid) {
        self.initial_blocks = grid.alive_count() as u32;
        self.grid = grid;
        self.clamp_balls_into_bounds();
    }

    /// Pull every ball back inside the world (after a resize or a restore)
    fn clamp_balls_into_bounds(&mut self) {
        let bounds = self.bounds();
        for ball in &mut self.balls {
            let r = ball.radius;
            ball.pos.x = ball.pos.x.clamp(r.min(bounds.width * 0.5), (bounds.width - r).max(bounds.width * 0.5));
            ball.pos.y = ball.pos.y.clamp(r.min(bounds.height * 0.5), (bounds.height - r).max(bounds.height * 0.5));
        }
    }

    /// Step every ball once; returns total cells destroyed
    pub fn step_balls(&mut self, dt: f32, cursor: Option<Vec2>) -> u32 {
        let mut env = StepEnv {
            bounds: self.bounds(),
            cursor,
            rng: &mut self.rng,
        };
        let mut destroyed = 0;
        for ball in &mut self.balls {
            destroyed += ball.step(dt, &mut self.grid, &mut env);
        }
        destroyed
    }

    pub fn to_snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            balls: self.balls.iter().map(Ball::to_data).collect(),
            grid: self.grid.to_data(),
            initial_blocks: self.initial_blocks,
        }
    }

    /// Rebuild from an untrusted snapshot value
    ///
    /// Too many balls or an invalid grid rejects the whole snapshot. Entries
    /// in `balls` that are not objects are skipped; duplicate ids are
    /// reassigned.
    pub fn restore(
        raw: &Value,
        limits: &GridLimits,
        max_balls: usize,
        seed: u32,
    ) -> Result<Self, SnapshotError> {
        let grid_raw = raw.get("grid").ok_or(SnapshotError::MissingGrid)?;
        let balls_raw = raw
            .get("balls")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if balls_raw.len() > max_balls {
            return Err(SnapshotError::TooManyBalls {
                count: balls_raw.len(),
                limit: max_balls,
            });
        }

        let mut grid = BlockGrid::new(0, 0, DEFAULT_CELL_SIZE, Vec2::ZERO);
        grid.from_data(grid_raw, limits)?;

        let mut state = GameState::new(grid, seed);
        if let Some(n) = raw
            .get("initialBlocks")
            .and_then(Value::as_u64)
        {
            state.initial_blocks = n.min(limits.max_cells as u64) as u32;
        }

        state.balls = balls_raw.iter().filter_map(Ball::from_data).collect();
        state.normalize_order();
        let mut next_id = 1u32;
        for ball in &mut state.balls {
            if ball.id < next_id {
                ball.id = next_id;
            }
            next_id = ball.id.saturating_add(1);
        }
        state.next_id = next_id;
        state.clamp_balls_into_bounds();
        Ok(state)
    }

    pub fn from_snapshot(
        snapshot: &GameSnapshot,
        limits: &GridLimits,
        max_balls: usize,
        seed: u32,
    ) -> Result<Self, SnapshotError> {
        let raw = serde_json::to_value(snapshot).map_err(|_| SnapshotError::MissingGrid)?;
        Self::restore(&raw, limits, max_balls, seed)
    }
}
