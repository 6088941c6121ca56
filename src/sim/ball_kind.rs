//! Ball type registry
//!
//! Each kind owns its base stats (in `BALL_TYPES`) and its hit behaviour.
//! `Ball::step` only calls `on_block_hit`/`on_wall_hit` and reads
//! `bounces_on_blocks`, so adding a kind touches this file alone.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ball::Ball;
use super::collision::WorldBounds;
use super::grid::{BlockGrid, DamageReport};
use super::rng::SeededStream;

/// Share of hit damage dealt to each shrapnel piece
const PIECE_DAMAGE_FRACTION: f64 = 0.25;
/// Share of hit damage a sweeper deals to the rest of the row
const SWEEP_DAMAGE_FRACTION: f64 = 0.5;
/// Sniper ignores blocks closer than this many cells when retargeting
const SNIPER_MIN_CELLS: f32 = 3.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BallKind {
    #[default]
    Normal,
    Splash,
    Sniper,
    Sweeper,
    Heavy,
}

/// Static per-kind tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallTypeDef {
    pub kind: BallKind,
    pub name: &'static str,
    pub radius: f32,
    pub damage: f64,
    /// Damage gained per damage upgrade level
    pub damage_per_level: f64,
    pub speed: f32,
    /// Packed 0xRRGGBB for the renderer
    pub color: u32,
    pub buy_cost: f64,
    pub cost_growth: f64,
    pub bounce_on_blocks: bool,
    /// Base splash radius in cells (0 = no splash)
    pub splash_radius: u32,
    /// Damage lost at the splash edge (0.5 = half damage at max range)
    pub splash_falloff: f64,
}

pub const BALL_TYPES: [BallTypeDef; 5] = [
    BallTypeDef {
        kind: BallKind::Normal,
        name: "Normal",
        radius: 6.0,
        damage: 1.0,
        damage_per_level: 1.0,
        speed: 240.0,
        color: 0xE8E8F0,
        buy_cost: 10.0,
        cost_growth: 1.35,
        bounce_on_blocks: true,
        splash_radius: 0,
        splash_falloff: 0.0,
    },
    BallTypeDef {
        kind: BallKind::Splash,
        name: "Splash",
        radius: 7.0,
        damage: 1.0,
        damage_per_level: 1.0,
        speed: 210.0,
        color: 0x4FC3F7,
        buy_cost: 150.0,
        cost_growth: 1.4,
        bounce_on_blocks: true,
        splash_radius: 1,
        splash_falloff: 0.5,
    },
    BallTypeDef {
        kind: BallKind::Sniper,
        name: "Sniper",
        radius: 5.0,
        damage: 4.0,
        damage_per_level: 3.0,
        speed: 320.0,
        color: 0xFFD54F,
        buy_cost: 2_000.0,
        cost_growth: 1.45,
        bounce_on_blocks: true,
        splash_radius: 0,
        splash_falloff: 0.0,
    },
    BallTypeDef {
        kind: BallKind::Sweeper,
        name: "Sweeper",
        radius: 6.0,
        damage: 1.0,
        // Sweepers double the usual per-level gain
        damage_per_level: 2.0,
        speed: 220.0,
        color: 0x81C784,
        buy_cost: 20_000.0,
        cost_growth: 1.5,
        bounce_on_blocks: true,
        splash_radius: 0,
        splash_falloff: 0.0,
    },
    BallTypeDef {
        kind: BallKind::Heavy,
        name: "Heavy",
        radius: 10.0,
        damage: 10.0,
        damage_per_level: 5.0,
        speed: 150.0,
        color: 0xE57373,
        buy_cost: 200_000.0,
        cost_growth: 1.55,
        bounce_on_blocks: false,
        splash_radius: 0,
        splash_falloff: 0.0,
    },
];

/// Everything a ball may consult while resolving hits in one step
pub struct StepEnv<'a> {
    pub bounds: WorldBounds,
    /// Pointer position in world space, if the pointer is over the field
    pub cursor: Option<Vec2>,
    pub rng: &'a mut SeededStream,
}

impl BallKind {
    pub const ALL: [BallKind; 5] = [
        BallKind::Normal,
        BallKind::Splash,
        BallKind::Sniper,
        BallKind::Sweeper,
        BallKind::Heavy,
    ];

    pub fn def(self) -> &'static BallTypeDef {
        match self {
            BallKind::Normal => &BALL_TYPES[0],
            BallKind::Splash => &BALL_TYPES[1],
            BallKind::Sniper => &BALL_TYPES[2],
            BallKind::Sweeper => &BALL_TYPES[3],
            BallKind::Heavy => &BALL_TYPES[4],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BallKind::Normal => "normal",
            BallKind::Splash => "splash",
            BallKind::Sniper => "sniper",
            BallKind::Sweeper => "sweeper",
            BallKind::Heavy => "heavy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        BallKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn bounces_on_blocks(self) -> bool {
        self.def().bounce_on_blocks
    }

    /// Whether range upgrades mean anything for this kind
    pub fn has_splash(self) -> bool {
        self.def().splash_radius > 0
    }

    /// Apply this kind's damage for a contact with cell (col, row)
    ///
    /// Returns the number of cells destroyed, including splash, sweep,
    /// shrapnel and execution kills.
    pub fn on_block_hit(
        self,
        grid: &mut BlockGrid,
        col: i32,
        row: i32,
        ball: &Ball,
        env: &mut StepEnv<'_>,
    ) -> u32 {
        let aux = &ball.aux;
        let mut damage = ball.damage;
        if aux.crit_chance > 0.0 && env.rng.chance(aux.crit_chance) {
            damage *= aux.crit_mult.max(1.0);
        }

        let mut report = grid.damage_cell(col, row, damage);
        match self {
            BallKind::Normal | BallKind::Sniper | BallKind::Heavy => {}
            BallKind::Splash => {
                let radius = aux.splash_radius.max(self.def().splash_radius);
                let falloff = self.def().splash_falloff;
                report += grid.damage_radius_weighted(col, row, radius, damage, false, |d| {
                    1.0 - falloff * (d / radius.max(1) as f64)
                });
            }
            BallKind::Sweeper => {
                report += grid.damage_row(row, damage * SWEEP_DAMAGE_FRACTION, Some(col));
            }
        }

        report += apply_execution(grid, col, row, ball);
        report += apply_pieces(grid, col, row, damage, aux.pieces, env.rng);
        report.destroyed
    }

    /// Optional retargeting after a wall bounce
    pub fn on_wall_hit(self, ball: &mut Ball, grid: &BlockGrid, env: &mut StepEnv<'_>) {
        if ball.aux.aim_at_cursor_on_wall {
            if let Some(cursor) = env.cursor {
                ball.aim_at(cursor);
                return;
            }
        }
        let target = match self {
            BallKind::Sniper => grid.random_alive_block_outside_radius(
                ball.pos,
                grid.cell_size() * SNIPER_MIN_CELLS,
                env.rng,
            ),
            BallKind::Heavy => grid.farthest_alive_block(ball.pos),
            _ => None,
        };
        if let Some((col, row)) = target {
            ball.aim_at(grid.cell_center(col, row));
        }
    }
}

fn apply_execution(grid: &mut BlockGrid, col: i32, row: i32, ball: &Ball) -> DamageReport {
    let ratio = ball.aux.execute_ratio;
    if ratio <= 0.0 {
        return DamageReport::default();
    }
    let hp = grid.hp(col, row);
    if hp > 0.0 && hp <= ball.damage * ratio {
        grid.damage_cell(col, row, hp)
    } else {
        DamageReport::default()
    }
}

fn apply_pieces(
    grid: &mut BlockGrid,
    col: i32,
    row: i32,
    damage: f64,
    pieces: u32,
    rng: &mut SeededStream,
) -> DamageReport {
    let mut report = DamageReport::default();
    for _ in 0..pieces {
        let neighbors = grid.alive_neighbors(col, row);
        if neighbors.is_empty() {
            break;
        }
        let (c, r) = neighbors[rng.index(neighbors.len())];
        report += grid.damage_cell(c, r, damage * PIECE_DAMAGE_FRACTION);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_grid(hp: f64) -> BlockGrid {
        let mut grid = BlockGrid::new(8, 8, 20.0, Vec2::ZERO);
        for r in 0..8 {
            for c in 0..8 {
                grid.set_cell(c, r, hp);
            }
        }
        grid
    }

    fn env(rng: &mut SeededStream) -> StepEnv<'_> {
        StepEnv {
            bounds: WorldBounds::new(160.0, 300.0),
            cursor: None,
            rng,
        }
    }

    #[test]
    fn test_registry_lookup() {
        for kind in BallKind::ALL {
            assert_eq!(kind.def().kind, kind);
            assert_eq!(BallKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(BallKind::from_str("SPLASH"), Some(BallKind::Splash));
        assert_eq!(BallKind::from_str("laser"), None);
        assert!(!BallKind::Heavy.bounces_on_blocks());
    }

    #[test]
    fn test_normal_hits_single_cell() {
        let mut grid = filled_grid(1.0);
        let mut rng = SeededStream::new(1);
        let ball = Ball::spawn(1, BallKind::Normal, Vec2::ZERO, 0.0, 0.0, None, None);
        let destroyed = BallKind::Normal.on_block_hit(&mut grid, 3, 3, &ball, &mut env(&mut rng));
        assert_eq!(destroyed, 1);
        assert_eq!(grid.alive_count(), 63);
    }

    #[test]
    fn test_splash_hits_neighbours_with_falloff() {
        let mut grid = filled_grid(1.0);
        let mut rng = SeededStream::new(1);
        let ball = Ball::spawn(1, BallKind::Splash, Vec2::ZERO, 0.0, 0.0, Some(1.0), None);
        let destroyed = BallKind::Splash.on_block_hit(&mut grid, 3, 3, &ball, &mut env(&mut rng));
        // Centre dies, four orthogonal neighbours take half damage
        assert_eq!(destroyed, 1);
        assert_eq!(grid.hp(3, 4), 0.5);

        let ball = Ball::spawn(2, BallKind::Splash, Vec2::ZERO, 0.0, 0.0, Some(2.0), None);
        let destroyed = BallKind::Splash.on_block_hit(&mut grid, 5, 5, &ball, &mut env(&mut rng));
        assert_eq!(destroyed, 5);
    }

    #[test]
    fn test_sweeper_damages_row() {
        let mut grid = filled_grid(1.0);
        let mut rng = SeededStream::new(1);
        let ball = Ball::spawn(1, BallKind::Sweeper, Vec2::ZERO, 0.0, 0.0, Some(2.0), None);
        let destroyed = BallKind::Sweeper.on_block_hit(&mut grid, 0, 2, &ball, &mut env(&mut rng));
        assert_eq!(destroyed, 8);
        assert!(grid.is_alive(0, 1));
    }

    #[test]
    fn test_execution_finishes_weak_cell() {
        let mut grid = filled_grid(10.0);
        let mut rng = SeededStream::new(1);
        let mut ball = Ball::spawn(1, BallKind::Normal, Vec2::ZERO, 0.0, 0.0, Some(8.0), None);
        ball.aux.execute_ratio = 0.5;
        let destroyed = BallKind::Normal.on_block_hit(&mut grid, 1, 1, &ball, &mut env(&mut rng));
        assert_eq!(destroyed, 1);
        assert_eq!(grid.hp(1, 1), 0.0);
    }

    #[test]
    fn test_pieces_hit_neighbours() {
        let mut grid = filled_grid(100.0);
        let mut rng = SeededStream::new(1);
        let mut ball = Ball::spawn(1, BallKind::Normal, Vec2::ZERO, 0.0, 0.0, Some(4.0), None);
        ball.aux.pieces = 3;
        BallKind::Normal.on_block_hit(&mut grid, 4, 4, &ball, &mut env(&mut rng));
        let neighbour_loss: f64 = grid
            .alive_neighbors(4, 4)
            .into_iter()
            .map(|(c, r)| 100.0 - grid.hp(c, r))
            .sum();
        assert!((neighbour_loss - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_heavy_retargets_farthest() {
        let mut grid = BlockGrid::new(8, 8, 20.0, Vec2::ZERO);
        grid.set_cell(7, 0, 5.0);
        grid.set_cell(1, 1, 5.0);
        let mut rng = SeededStream::new(1);
        let mut ball = Ball::spawn(1, BallKind::Heavy, Vec2::new(10.0, 150.0), 150.0, 0.0, None, None);
        BallKind::Heavy.on_wall_hit(&mut ball, &grid, &mut env(&mut rng));
        let to_target = (grid.cell_center(7, 0) - ball.pos).normalize();
        assert!((ball.vel.normalize() - to_target).length() < 1e-4);
        assert!((ball.speed() - 150.0).abs() < 1e-3);
    }

    #[test]
    fn test_cursor_aim_overrides_type() {
        let grid = filled_grid(1.0);
        let mut rng = SeededStream::new(1);
        let mut ball = Ball::spawn(1, BallKind::Sniper, Vec2::new(10.0, 10.0), 100.0, 0.0, None, None);
        ball.aux.aim_at_cursor_on_wall = true;
        let mut e = env(&mut rng);
        e.cursor = Some(Vec2::new(10.0, 110.0));
        BallKind::Sniper.on_wall_hit(&mut ball, &grid, &mut e);
        assert!(ball.vel.x.abs() < 1e-4);
        assert!((ball.vel.y - 100.0).abs() < 1e-3);
    }
}
