//! Player save document
//!
//! Everything here is plain data with camelCase serde. The shape is only
//! trusted after `normalize` has run; gameplay code mutates it in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::decimal::Decimal;
use super::stars::StarUpgrades;
use crate::records::StarRecords;
use crate::sim::{BallKind, GameSnapshot};

/// Current save document version
pub const SAVE_VERSION: u32 = 3;

/// Clears-currency upgrades (survive clears prestige)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClearsUpgrades {
    pub density: u32,
    pub grid_size: u32,
    pub brick_hp: u32,
}

/// Per-ball-type purchase count and upgrade levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BallProgress {
    pub owned: u32,
    pub damage_level: u32,
    pub speed_level: u32,
    pub range_level: u32,
    pub size_level: u32,
    pub piece_level: u32,
    pub crit_level: u32,
    pub execution_level: u32,
}

impl BallProgress {
    /// Same counts with every upgrade level reset
    pub fn without_upgrades(&self) -> Self {
        Self {
            owned: self.owned,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Progress {
    pub level: u32,
    pub master_seed: u32,
    pub best_level: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            level: 1,
            master_seed: 0,
            best_level: 1,
        }
    }
}

/// Player-tunable generation overrides
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationPrefs {
    /// Minimum noise threshold (0 = no override)
    pub noise_threshold: f64,
    pub desired_cell_size: f32,
}

impl Default for GenerationPrefs {
    fn default() -> Self {
        Self {
            noise_threshold: 0.0,
            desired_cell_size: 24.0,
        }
    }
}

/// Lifetime star statistics (survive every reset)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StarStats {
    pub total_stars_earned: u64,
    pub star_prestiges: u64,
    pub clears_prestiges: u64,
    pub best_level_ever: u32,
    pub history: StarRecords,
}

/// The whole persisted player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub version: u32,
    pub points: Decimal,
    pub clears: Decimal,
    pub stars: u64,
    pub clears_upgrades: ClearsUpgrades,
    pub star_upgrades: StarUpgrades,
    pub ball_types: BTreeMap<BallKind, BallProgress>,
    pub cursor_level: u32,
    pub progress: Progress,
    /// Level clears banked toward the next clears prestige
    pub clears_buffered: u64,
    /// Bricks destroyed over those banked levels
    pub clears_buffered_bricks: f64,
    pub run_time_secs: f64,
    pub generation: GenerationPrefs,
    pub star_stats: StarStats,
    /// Embedded playfield for session resume
    pub game: Option<GameSnapshot>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            points: Decimal::ZERO,
            clears: Decimal::ZERO,
            stars: 0,
            clears_upgrades: ClearsUpgrades::default(),
            star_upgrades: StarUpgrades::default(),
            ball_types: BallKind::ALL
                .into_iter()
                .map(|k| (k, BallProgress::default()))
                .collect(),
            cursor_level: 0,
            progress: Progress::default(),
            clears_buffered: 0,
            clears_buffered_bricks: 0.0,
            run_time_secs: 0.0,
            generation: GenerationPrefs::default(),
            star_stats: StarStats::default(),
            game: None,
        }
    }
}

impl PlayerState {
    /// Fresh player with a given master seed
    pub fn with_seed(master_seed: u32) -> Self {
        let mut player = Self::default();
        player.progress.master_seed = master_seed;
        player
    }

    pub fn ball(&self, kind: BallKind) -> BallProgress {
        self.ball_types.get(&kind).copied().unwrap_or_default()
    }

    pub fn ball_mut(&mut self, kind: BallKind) -> &mut BallProgress {
        self.ball_types.entry(kind).or_default()
    }

    pub fn level(&self) -> u32 {
        self.progress.level
    }

    pub fn can_afford_points(&self, cost: Decimal) -> bool {
        self.points >= cost
    }

    pub fn can_afford_clears(&self, cost: Decimal) -> bool {
        self.clears >= cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_every_ball_type() {
        let p = PlayerState::default();
        assert_eq!(p.ball_types.len(), BallKind::ALL.len());
        assert_eq!(p.level(), 1);
        assert_eq!(p.version, SAVE_VERSION);
    }

    #[test]
    fn test_serializes_camel_case() {
        let p = PlayerState::with_seed(9);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["progress"]["masterSeed"], 9);
        assert_eq!(v["points"], "0");
        assert!(v["ballTypes"]["splash"]["damageLevel"].is_number());
        assert!(v["clearsUpgrades"].get("brickHp").is_some());
        assert!(v["game"].is_null());
    }

    #[test]
    fn test_without_upgrades_keeps_count() {
        let b = BallProgress {
            owned: 4,
            damage_level: 9,
            crit_level: 2,
            ..Default::default()
        };
        let stripped = b.without_upgrades();
        assert_eq!(stripped.owned, 4);
        assert_eq!(stripped.damage_level, 0);
        assert_eq!(stripped.crit_level, 0);
    }
}
