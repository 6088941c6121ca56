//! Ball entity and its sub-stepped integrator

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ball_kind::{BallKind, StepEnv};
use super::collision::{reflect_velocity, resolve_walls};
use super::grid::BlockGrid;
use crate::velocity_from_angle;

/// Hard cap on integration segments per ball per step
pub const MAX_SUBSTEPS: u32 = 12;
/// Smallest allowed segment length, in world units
pub const MIN_SEGMENT: f32 = 2.0;
/// Extra push-out after a block contact so the next segment starts clear
pub const PUSH_OUT_EPSILON: f32 = 0.01;

/// Derived baselines and precomputed hit modifiers
///
/// Upgrades are reapplied from the `base_*` values every tick, so stats never
/// compound. The modifier fields are rewritten by the same pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BallAux {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_damage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_radius: Option<f32>,
    pub is_cursor_ball: bool,
    pub aim_at_cursor_on_wall: bool,
    /// Spawned by the heavy auto-spawner rather than bought
    pub auto_spawned: bool,
    pub crit_chance: f64,
    pub crit_mult: f64,
    pub execute_ratio: f64,
    pub pieces: u32,
    pub splash_radius: u32,
}

impl BallAux {
    /// Coerce an untrusted `data` map; unknown keys are dropped
    fn from_map(map: &Map<String, Value>) -> Self {
        let f = |key: &str| map.get(key).and_then(Value::as_f64).filter(|v| v.is_finite());
        let b = |key: &str| map.get(key).and_then(Value::as_bool).unwrap_or(false);
        let u = |key: &str, max: u32| {
            f(key).map_or(0, |v| v.clamp(0.0, max as f64).floor() as u32)
        };
        Self {
            base_speed: f("baseSpeed").filter(|v| *v >= 0.0).map(|v| v.min(1e9) as f32),
            base_damage: f("baseDamage").filter(|v| *v >= 0.0),
            base_radius: f("baseRadius").filter(|v| *v > 0.0).map(|v| v.clamp(0.5, 1e4) as f32),
            is_cursor_ball: b("isCursorBall"),
            aim_at_cursor_on_wall: b("aimAtCursorOnWall"),
            auto_spawned: b("autoSpawned"),
            crit_chance: f("critChance").map_or(0.0, |v| v.clamp(0.0, 1.0)),
            crit_mult: f("critMult").map_or(0.0, |v| v.max(0.0)),
            execute_ratio: f("executeRatio").map_or(0.0, |v| v.clamp(0.0, 1.0)),
            pieces: u("pieces", 64),
            splash_radius: u("splashRadius", 16),
        }
    }
}

/// Persisted ball shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallSnapshot {
    pub id: u32,
    pub type_id: BallKind,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub damage: f64,
    pub data: BallAux,
}

/// A ball entity
#[derive(Debug, Clone, PartialEq)]
pub struct Ball {
    pub id: u32,
    pub kind: BallKind,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub damage: f64,
    pub aux: BallAux,
    /// Cell a non-bouncing ball is currently passing through
    pierced: Option<(i32, i32)>,
}

impl Ball {
    /// Create a ball from polar velocity; unset damage/radius use the type defaults
    pub fn spawn(
        id: u32,
        kind: BallKind,
        pos: Vec2,
        speed: f32,
        angle: f32,
        damage: Option<f64>,
        radius: Option<f32>,
    ) -> Self {
        let def = kind.def();
        let damage = damage.filter(|d| d.is_finite() && *d >= 0.0).unwrap_or(def.damage);
        let radius = radius.filter(|r| r.is_finite() && *r > 0.0).unwrap_or(def.radius);
        let speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
        Self {
            id,
            kind,
            pos,
            vel: velocity_from_angle(speed, angle),
            radius,
            damage,
            aux: BallAux {
                base_speed: Some(speed),
                base_damage: Some(damage),
                base_radius: Some(radius),
                ..Default::default()
            },
            pierced: None,
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Rescale velocity, keeping direction (a stopped ball heads up)
    pub fn set_speed(&mut self, speed: f32) {
        let dir = self.vel.normalize_or_zero();
        let dir = if dir == Vec2::ZERO { Vec2::new(0.0, -1.0) } else { dir };
        self.vel = dir * speed.max(0.0);
    }

    /// Point velocity at a world position, keeping speed
    pub fn aim_at(&mut self, target: Vec2) {
        let dir = (target - self.pos).normalize_or_zero();
        if dir != Vec2::ZERO {
            self.vel = dir * self.speed();
        }
    }

    pub fn color(&self) -> u32 {
        self.kind.def().color
    }

    /// Number of integration segments for a frame of length `dt`
    ///
    /// Each segment moves at most ~3/4 of the radius so a ball cannot skip
    /// over a cell edge; the cap bounds per-frame cost.
    pub fn substeps(&self, dt: f32) -> u32 {
        let travel = self.speed() * dt.max(0.0);
        let segment = (self.radius * 0.75).max(MIN_SEGMENT);
        let n = (travel / segment).ceil();
        if n.is_finite() {
            (n as u32).clamp(1, MAX_SUBSTEPS)
        } else {
            MAX_SUBSTEPS
        }
    }

    /// Advance one frame; returns cells destroyed (all hit effects included)
    pub fn step(&mut self, dt: f32, grid: &mut BlockGrid, env: &mut StepEnv<'_>) -> u32 {
        if dt.is_nan() || dt <= 0.0 {
            return 0;
        }
        let steps = self.substeps(dt);
        let h = dt / steps as f32;
        let mut destroyed = 0;

        for _ in 0..steps {
            self.pos += self.vel * h;

            if resolve_walls(&mut self.pos, &mut self.vel, self.radius, &env.bounds).any() {
                self.kind.on_wall_hit(self, grid, env);
            }

            match grid.find_circle_collision(self.pos, self.radius) {
                Some(hit) => {
                    let cell = (hit.col, hit.row);
                    if self.kind.bounces_on_blocks() {
                        destroyed += self.kind.on_block_hit(grid, hit.col, hit.row, self, env);
                        self.pos += hit.normal * (hit.penetration + PUSH_OUT_EPSILON);
                        self.vel = reflect_velocity(self.vel, hit.normal);
                    } else if self.pierced != Some(cell) {
                        destroyed += self.kind.on_block_hit(grid, hit.col, hit.row, self, env);
                        self.pierced = Some(cell);
                    }
                }
                None => self.pierced = None,
            }

            // Push-out may cross a wall; clamp again so bounds always hold
            resolve_walls(&mut self.pos, &mut self.vel, self.radius, &env.bounds);
        }
        destroyed
    }

    pub fn to_data(&self) -> BallSnapshot {
        BallSnapshot {
            id: self.id,
            type_id: self.kind,
            x: self.pos.x,
            y: self.pos.y,
            vx: self.vel.x,
            vy: self.vel.y,
            radius: self.radius,
            damage: self.damage,
            data: self.aux,
        }
    }

    /// Rebuild from untrusted JSON; numeric fields fall back to finite defaults
    ///
    /// Returns `None` only when `raw` is not an object.
    pub fn from_data(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let num = |key: &str| obj.get(key).and_then(Value::as_f64).filter(|v| v.is_finite());
        // Clamped so the f32 cast cannot overflow to infinity
        let coord = |key: &str| num(key).map_or(0.0, |v| v.clamp(-1e9, 1e9) as f32);
        let kind = obj
            .get("typeId")
            .and_then(Value::as_str)
            .and_then(BallKind::from_str)
            .unwrap_or_default();
        let def = kind.def();
        let aux = obj
            .get("data")
            .and_then(Value::as_object)
            .map(BallAux::from_map)
            .unwrap_or_default();

        Some(Self {
            id: num("id").map_or(0, |v| v.clamp(0.0, u32::MAX as f64) as u32),
            kind,
            pos: Vec2::new(coord("x"), coord("y")),
            vel: Vec2::new(coord("vx"), coord("vy")),
            radius: num("radius")
                .filter(|r| *r > 0.0)
                .map_or(def.radius, |r| r.clamp(0.5, 1e4) as f32),
            damage: num("damage").filter(|d| *d >= 0.0).unwrap_or(def.damage),
            aux,
            pierced: None,
        })
    }

    pub fn from_snapshot(snapshot: &BallSnapshot) -> Option<Self> {
        serde_json::to_value(snapshot)
            .ok()
            .and_then(|raw| Self::from_data(&raw))
    }
}
