//! Star upgrade tree (top prestige layer)
//!
//! Costs are whole stars: `ceil(base * growth^level)`. Single-level
//! entries are plain unlocks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StarUpgrade {
    MoreStars,
    Starboard,
    StarsFromLevel,
    StarsFromClears,
    StarsFromTime,
    ClearsLogMult,
    DoubleClears,
    BufferedBonus,
    KeepBallUpgrades,
    KeepBallCounts,
    StartingBall,
    CursorBall,
    CursorBallSplash,
    HeavyAutoSpawn,
    HeavyInterval,
    DamageBoost,
    SpeedBoost,
    PointsBoost,
    CheaperBalls,
    CheaperUpgrades,
    CritUnlock,
    ExecutionUnlock,
    PieceUnlock,
    SplashRangeBonus,
    BallCapBoost,
}

/// Static tuning for one star upgrade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarUpgradeDef {
    pub name: &'static str,
    pub description: &'static str,
    pub max_level: u32,
    pub base_cost: f64,
    pub growth: f64,
    /// Must be owned before this one can be bought
    pub requires: Option<StarUpgrade>,
}

const fn unlock(name: &'static str, description: &'static str, base_cost: f64) -> StarUpgradeDef {
    StarUpgradeDef {
        name,
        description,
        max_level: 1,
        base_cost,
        growth: 1.0,
        requires: None,
    }
}

const fn leveled(
    name: &'static str,
    description: &'static str,
    max_level: u32,
    base_cost: f64,
    growth: f64,
) -> StarUpgradeDef {
    StarUpgradeDef {
        name,
        description,
        max_level,
        base_cost,
        growth,
        requires: None,
    }
}

impl StarUpgrade {
    pub const ALL: [StarUpgrade; 25] = [
        StarUpgrade::MoreStars,
        StarUpgrade::Starboard,
        StarUpgrade::StarsFromLevel,
        StarUpgrade::StarsFromClears,
        StarUpgrade::StarsFromTime,
        StarUpgrade::ClearsLogMult,
        StarUpgrade::DoubleClears,
        StarUpgrade::BufferedBonus,
        StarUpgrade::KeepBallUpgrades,
        StarUpgrade::KeepBallCounts,
        StarUpgrade::StartingBall,
        StarUpgrade::CursorBall,
        StarUpgrade::CursorBallSplash,
        StarUpgrade::HeavyAutoSpawn,
        StarUpgrade::HeavyInterval,
        StarUpgrade::DamageBoost,
        StarUpgrade::SpeedBoost,
        StarUpgrade::PointsBoost,
        StarUpgrade::CheaperBalls,
        StarUpgrade::CheaperUpgrades,
        StarUpgrade::CritUnlock,
        StarUpgrade::ExecutionUnlock,
        StarUpgrade::PieceUnlock,
        StarUpgrade::SplashRangeBonus,
        StarUpgrade::BallCapBoost,
    ];

    pub fn def(self) -> StarUpgradeDef {
        match self {
            StarUpgrade::MoreStars => leveled("More Stars", "+50% stars per level", 10, 1.0, 2.0),
            StarUpgrade::Starboard => unlock("Starboard", "Double star gain", 25.0),
            StarUpgrade::StarsFromLevel => {
                unlock("Stars From Level", "+1 star per 10 levels past the gate", 1.0)
            }
            StarUpgrade::StarsFromClears => {
                unlock("Stars From Clears", "+1 star per digit of clears", 3.0)
            }
            StarUpgrade::StarsFromTime => {
                unlock("Stars From Time", "+10% stars per hour of the run", 5.0)
            }
            StarUpgrade::ClearsLogMult => {
                unlock("Brick Logarithm", "Clears scale with ln(bricks destroyed)", 2.0)
            }
            StarUpgrade::DoubleClears => unlock("Double Clears", "Clears prestige pays double", 15.0),
            StarUpgrade::BufferedBonus => {
                leveled("Buffered Bonus", "+10% buffered clears per level", 10, 2.0, 1.6)
            }
            StarUpgrade::KeepBallUpgrades => {
                unlock("Keep Upgrades", "Ball upgrades survive clears prestige", 8.0)
            }
            StarUpgrade::KeepBallCounts => {
                unlock("Keep Balls", "Bought balls survive clears prestige", 12.0)
            }
            StarUpgrade::StartingBall => unlock("Head Start", "Begin every run with a splash ball", 1.0),
            StarUpgrade::CursorBall => unlock("Cursor Ball", "A free ball that chases the cursor", 3.0),
            StarUpgrade::CursorBallSplash => StarUpgradeDef {
                requires: Some(StarUpgrade::CursorBall),
                ..unlock("Splash Cursor", "The cursor ball splashes", 10.0)
            },
            StarUpgrade::HeavyAutoSpawn => {
                unlock("Heavy Drop", "Heavy balls spawn on a timer", 20.0)
            }
            StarUpgrade::HeavyInterval => StarUpgradeDef {
                requires: Some(StarUpgrade::HeavyAutoSpawn),
                ..leveled("Heavy Interval", "-8s between heavy drops", 5, 5.0, 1.8)
            },
            StarUpgrade::DamageBoost => leveled("Damage Boost", "+25% ball damage", 20, 1.0, 1.5),
            StarUpgrade::SpeedBoost => leveled("Speed Boost", "+5% ball speed", 10, 2.0, 1.6),
            StarUpgrade::PointsBoost => leveled("Points Boost", "x1.5 points", 25, 1.0, 1.45),
            StarUpgrade::CheaperBalls => {
                leveled("Cheaper Balls", "-0.01 ball price growth", 10, 2.0, 1.7)
            }
            StarUpgrade::CheaperUpgrades => {
                leveled("Cheaper Upgrades", "-10% ball upgrade prices", 10, 2.0, 1.7)
            }
            StarUpgrade::CritUnlock => unlock("Critical Hits", "Unlock crit upgrades", 4.0),
            StarUpgrade::ExecutionUnlock => unlock("Execution", "Unlock execution upgrades", 6.0),
            StarUpgrade::PieceUnlock => unlock("Shrapnel", "Unlock piece upgrades", 5.0),
            StarUpgrade::SplashRangeBonus => {
                leveled("Wide Splash", "+1 max splash range", 3, 6.0, 2.5)
            }
            StarUpgrade::BallCapBoost => leveled("Ball Cap", "+5 max balls", 10, 3.0, 1.6),
        }
    }

    /// Save-document key
    pub fn as_str(&self) -> &'static str {
        match self {
            StarUpgrade::MoreStars => "moreStars",
            StarUpgrade::Starboard => "starboard",
            StarUpgrade::StarsFromLevel => "starsFromLevel",
            StarUpgrade::StarsFromClears => "starsFromClears",
            StarUpgrade::StarsFromTime => "starsFromTime",
            StarUpgrade::ClearsLogMult => "clearsLogMult",
            StarUpgrade::DoubleClears => "doubleClears",
            StarUpgrade::BufferedBonus => "bufferedBonus",
            StarUpgrade::KeepBallUpgrades => "keepBallUpgrades",
            StarUpgrade::KeepBallCounts => "keepBallCounts",
            StarUpgrade::StartingBall => "startingBall",
            StarUpgrade::CursorBall => "cursorBall",
            StarUpgrade::CursorBallSplash => "cursorBallSplash",
            StarUpgrade::HeavyAutoSpawn => "heavyAutoSpawn",
            StarUpgrade::HeavyInterval => "heavyInterval",
            StarUpgrade::DamageBoost => "damageBoost",
            StarUpgrade::SpeedBoost => "speedBoost",
            StarUpgrade::PointsBoost => "pointsBoost",
            StarUpgrade::CheaperBalls => "cheaperBalls",
            StarUpgrade::CheaperUpgrades => "cheaperUpgrades",
            StarUpgrade::CritUnlock => "critUnlock",
            StarUpgrade::ExecutionUnlock => "executionUnlock",
            StarUpgrade::PieceUnlock => "pieceUnlock",
            StarUpgrade::SplashRangeBonus => "splashRangeBonus",
            StarUpgrade::BallCapBoost => "ballCapBoost",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }

    pub fn max_level(self) -> u32 {
        self.def().max_level
    }

    /// Star price of the next level (None once maxed)
    pub fn cost(self, level: u32) -> Option<u64> {
        let def = self.def();
        if level >= def.max_level {
            return None;
        }
        let raw = (def.base_cost * def.growth.powi(level as i32)).ceil();
        Some(raw.clamp(1.0, u64::MAX as f64) as u64)
    }
}

/// Owned star upgrade levels; absent keys are level 0
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StarUpgrades(BTreeMap<StarUpgrade, u32>);

impl StarUpgrades {
    pub fn level(&self, upgrade: StarUpgrade) -> u32 {
        self.0.get(&upgrade).copied().unwrap_or(0)
    }

    pub fn has(&self, upgrade: StarUpgrade) -> bool {
        self.level(upgrade) > 0
    }

    /// Set a level, clamped to the upgrade's max; zero removes the key
    pub fn set(&mut self, upgrade: StarUpgrade, level: u32) {
        let level = level.min(upgrade.max_level());
        if level == 0 {
            self.0.remove(&upgrade);
        } else {
            self.0.insert(upgrade, level);
        }
    }

    /// True when the prerequisite (if any) is owned
    pub fn is_unlocked(&self, upgrade: StarUpgrade) -> bool {
        upgrade.def().requires.is_none_or(|req| self.has(req))
    }

    pub fn iter(&self) -> impl Iterator<Item = (StarUpgrade, u32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}
