//! Cost curves and upgrade-derived stats
//!
//! Every price is `base * growth^level`. All gameplay formulas that depend
//! on upgrade levels live here so the tick loop never recomputes them.

use super::decimal::Decimal;
use super::player::{BallProgress, PlayerState};
use super::stars::StarUpgrade;
use crate::sim::BallKind;

/// Level ceiling for families without a hard max
pub const UNCAPPED_LEVEL: u32 = 1_000_000;

/// Base ball limit before `ballCapBoost`
pub const BASE_BALL_CAP: usize = 60;
pub const BALL_CAP_PER_LEVEL: usize = 5;

pub const SPEED_PER_LEVEL: f32 = 0.24;
pub const SIZE_PER_LEVEL: f32 = 0.08;
pub const CRIT_CHANCE_PER_LEVEL: f64 = 0.04;
pub const CRIT_CHANCE_CAP: f64 = 0.6;
pub const CRIT_MULT: f64 = 3.0;
pub const EXECUTE_RATIO_PER_LEVEL: f64 = 0.25;
/// Splash radius cap before `splashRangeBonus`
pub const SPLASH_RANGE_CAP: u32 = 4;

/// `base * growth^level` with a hard max level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCurve {
    pub base: f64,
    pub growth: f64,
    pub max_level: u32,
}

impl CostCurve {
    pub const fn new(base: f64, growth: f64, max_level: u32) -> Self {
        Self {
            base,
            growth,
            max_level,
        }
    }

    pub fn cost(&self, level: u32) -> Decimal {
        geometric_cost(self.base, self.growth, level)
    }

    pub fn is_maxed(&self, level: u32) -> bool {
        level >= self.max_level
    }
}

/// `base * growth^level`, computed in f64 while it stays finite
pub fn geometric_cost(base: f64, growth: f64, level: u32) -> Decimal {
    let direct = base * growth.powi(level.min(i32::MAX as u32) as i32);
    if direct.is_finite() {
        Decimal::from_f64(direct)
    } else {
        Decimal::from_f64(base) * Decimal::from_f64(growth).pow(level as f64)
    }
}

/// Clears-currency upgrades
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearsUpgrade {
    Density,
    GridSize,
    BrickHp,
}

impl ClearsUpgrade {
    pub const ALL: [ClearsUpgrade; 3] = [
        ClearsUpgrade::Density,
        ClearsUpgrade::GridSize,
        ClearsUpgrade::BrickHp,
    ];

    pub fn curve(self) -> CostCurve {
        match self {
            ClearsUpgrade::Density => CostCurve::new(1.0, 2.0, 10),
            ClearsUpgrade::GridSize => CostCurve::new(2.0, 2.5, 10),
            ClearsUpgrade::BrickHp => CostCurve::new(1.0, 1.75, 25),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClearsUpgrade::Density => "density",
            ClearsUpgrade::GridSize => "gridSize",
            ClearsUpgrade::BrickHp => "brickHp",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }

    pub fn level(self, player: &PlayerState) -> u32 {
        let u = &player.clears_upgrades;
        match self {
            ClearsUpgrade::Density => u.density,
            ClearsUpgrade::GridSize => u.grid_size,
            ClearsUpgrade::BrickHp => u.brick_hp,
        }
    }

    pub fn level_mut(self, player: &mut PlayerState) -> &mut u32 {
        let u = &mut player.clears_upgrades;
        match self {
            ClearsUpgrade::Density => &mut u.density,
            ClearsUpgrade::GridSize => &mut u.grid_size,
            ClearsUpgrade::BrickHp => &mut u.brick_hp,
        }
    }
}

/// Per-ball-type upgrade families (bought with points)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallUpgrade {
    Damage,
    Speed,
    Range,
    Size,
    Piece,
    Crit,
    Execution,
}

impl BallUpgrade {
    pub const ALL: [BallUpgrade; 7] = [
        BallUpgrade::Damage,
        BallUpgrade::Speed,
        BallUpgrade::Range,
        BallUpgrade::Size,
        BallUpgrade::Piece,
        BallUpgrade::Crit,
        BallUpgrade::Execution,
    ];

    /// (factor on the ball's buy cost, growth, max level)
    fn tuning(self) -> (f64, f64, u32) {
        match self {
            BallUpgrade::Damage => (5.0, 1.6, UNCAPPED_LEVEL),
            BallUpgrade::Speed => (8.0, 1.75, 25),
            BallUpgrade::Range => (20.0, 2.2, SPLASH_RANGE_CAP - 1),
            BallUpgrade::Size => (12.0, 1.9, 10),
            BallUpgrade::Piece => (30.0, 2.0, 8),
            BallUpgrade::Crit => (25.0, 1.85, 15),
            BallUpgrade::Execution => (40.0, 2.1, 10),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BallUpgrade::Damage => "damage",
            BallUpgrade::Speed => "speed",
            BallUpgrade::Range => "range",
            BallUpgrade::Size => "size",
            BallUpgrade::Piece => "piece",
            BallUpgrade::Crit => "crit",
            BallUpgrade::Execution => "execution",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }

    /// Star unlock gating this family, if any
    pub fn required_unlock(self) -> Option<StarUpgrade> {
        match self {
            BallUpgrade::Piece => Some(StarUpgrade::PieceUnlock),
            BallUpgrade::Crit => Some(StarUpgrade::CritUnlock),
            BallUpgrade::Execution => Some(StarUpgrade::ExecutionUnlock),
            _ => None,
        }
    }

    pub fn applies_to(self, kind: BallKind) -> bool {
        match self {
            BallUpgrade::Range => kind.has_splash(),
            _ => true,
        }
    }

    /// Highest purchasable level for this player
    pub fn max_level(self, player: &PlayerState) -> u32 {
        match self {
            BallUpgrade::Range => {
                self.tuning().2 + player.star_upgrades.level(StarUpgrade::SplashRangeBonus)
            }
            _ => self.tuning().2,
        }
    }

    pub fn level(self, progress: &BallProgress) -> u32 {
        match self {
            BallUpgrade::Damage => progress.damage_level,
            BallUpgrade::Speed => progress.speed_level,
            BallUpgrade::Range => progress.range_level,
            BallUpgrade::Size => progress.size_level,
            BallUpgrade::Piece => progress.piece_level,
            BallUpgrade::Crit => progress.crit_level,
            BallUpgrade::Execution => progress.execution_level,
        }
    }

    pub fn level_mut(self, progress: &mut BallProgress) -> &mut u32 {
        match self {
            BallUpgrade::Damage => &mut progress.damage_level,
            BallUpgrade::Speed => &mut progress.speed_level,
            BallUpgrade::Range => &mut progress.range_level,
            BallUpgrade::Size => &mut progress.size_level,
            BallUpgrade::Piece => &mut progress.piece_level,
            BallUpgrade::Crit => &mut progress.crit_level,
            BallUpgrade::Execution => &mut progress.execution_level,
        }
    }

    /// Points price of the next level for `kind`
    pub fn cost(self, kind: BallKind, player: &PlayerState) -> Decimal {
        let (factor, growth, _) = self.tuning();
        let discount =
            0.9f64.powi(player.star_upgrades.level(StarUpgrade::CheaperUpgrades) as i32);
        let base = kind.def().buy_cost * factor * discount;
        geometric_cost(base, growth, self.level(&player.ball(kind)))
    }
}

/// Buy-cost growth for a ball type after `cheaperBalls`
pub fn ball_cost_growth(kind: BallKind, cheaper_balls: u32) -> f64 {
    let def = kind.def();
    (def.cost_growth - 0.01 * cheaper_balls as f64).max(1.05_f64.min(def.cost_growth))
}

/// Points price of the next ball of `kind` when `owned` are already bought
pub fn ball_buy_cost(kind: BallKind, owned: u32, cheaper_balls: u32) -> Decimal {
    geometric_cost(kind.def().buy_cost, ball_cost_growth(kind, cheaper_balls), owned)
}

/// Cursor ball damage multiplier level (bought with points)
pub const CURSOR_CURVE: CostCurve = CostCurve::new(50.0, 1.8, 50);

/// Hit damage from a stored baseline: `(base + perLevel·level) × damageBoost`
pub fn ball_damage(kind: BallKind, base: f64, progress: &BallProgress, damage_boost: u32) -> f64 {
    let gain = kind.def().damage_per_level * progress.damage_level as f64;
    (base + gain) * (1.0 + 0.25 * damage_boost as f64)
}

/// Speed multiplier from the per-type level: `1 + 0.24·level`
pub fn speed_multiplier(level: u32) -> f32 {
    1.0 + SPEED_PER_LEVEL * level as f32
}

pub fn ball_speed(base: f32, progress: &BallProgress, speed_boost: u32) -> f32 {
    base * speed_multiplier(progress.speed_level) * (1.0 + 0.05 * speed_boost as f32)
}

pub fn ball_radius(base: f32, progress: &BallProgress) -> f32 {
    base * (1.0 + SIZE_PER_LEVEL * progress.size_level.min(10) as f32)
}

/// Splash radius in cells (0 for kinds without splash)
pub fn splash_radius(kind: BallKind, progress: &BallProgress, range_bonus: u32) -> u32 {
    if !kind.has_splash() {
        return 0;
    }
    (kind.def().splash_radius + progress.range_level).min(SPLASH_RANGE_CAP + range_bonus)
}

/// Hit modifiers after star unlocks: (crit chance, crit mult, execute ratio, pieces)
pub fn hit_modifiers(progress: &BallProgress, player: &PlayerState) -> (f64, f64, f64, u32) {
    let stars = &player.star_upgrades;
    let crit = if stars.has(StarUpgrade::CritUnlock) {
        (CRIT_CHANCE_PER_LEVEL * progress.crit_level as f64).min(CRIT_CHANCE_CAP)
    } else {
        0.0
    };
    let execute = if stars.has(StarUpgrade::ExecutionUnlock) {
        EXECUTE_RATIO_PER_LEVEL * progress.execution_level.min(10) as f64
    } else {
        0.0
    };
    let pieces = if stars.has(StarUpgrade::PieceUnlock) {
        progress.piece_level.min(8)
    } else {
        0
    };
    let mult = if crit > 0.0 { CRIT_MULT } else { 1.0 };
    (crit, mult, execute, pieces)
}

pub fn ball_cap(player: &PlayerState) -> usize {
    BASE_BALL_CAP
        + BALL_CAP_PER_LEVEL * player.star_upgrades.level(StarUpgrade::BallCapBoost) as usize
}

/// Cursor ball damage multiplier: `1 + 0.5·cursorLevel`
pub fn cursor_damage_multiplier(cursor_level: u32) -> f64 {
    1.0 + 0.5 * cursor_level as f64
}

/// Brick fill fraction from the density upgrade
pub fn density_fill(density_level: u32) -> f64 {
    0.35 + 0.05 * density_level.min(10) as f64
}

/// Cells per axis from the grid-size upgrade, capped by `max_axis`
pub fn grid_axis(grid_size_level: u32, max_axis: u32) -> u32 {
    (16 + 8 * grid_size_level.min(10)).min(max_axis.max(1))
}

/// (hp_min, hp_max) for bricks on `level`
pub fn brick_hp_range(level: u32, brick_hp_level: u32) -> (f64, f64) {
    let scale = 1.18f64.powf(level.saturating_sub(1) as f64);
    let hp_min = (scale * (1.0 + 0.5 * brick_hp_level as f64)).min(1e300);
    (hp_min, hp_min * 6.0)
}

/// Points for one destroyed brick
pub fn points_per_brick(player: &PlayerState) -> Decimal {
    let level = player.progress.level.saturating_sub(1) as f64;
    let hp_bonus = 1.0 + 0.5 * player.clears_upgrades.brick_hp as f64;
    let boost = player.star_upgrades.level(StarUpgrade::PointsBoost) as f64;
    Decimal::from_f64(1.2).pow(level)
        * hp_bonus
        * Decimal::from_f64(1.5).pow(boost)
        * (player.clears + Decimal::ONE).pow(0.5)
}
