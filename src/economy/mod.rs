//! Progression economy
//!
//! Currency, upgrade trees, the save document and prestige transitions.
//! Nothing here touches the playfield; the session applies the results.

pub mod decimal;
pub mod normalize;
pub mod player;
pub mod prestige;
pub mod stars;
pub mod upgrades;

pub use decimal::{Decimal, ParseDecimalError};
pub use normalize::{migrate, normalize, normalize_with};
pub use player::{
    BallProgress, ClearsUpgrades, GenerationPrefs, PlayerState, Progress, SAVE_VERSION, StarStats,
};
pub use prestige::{clears_gain, clears_prestige, star_gain, star_prestige};
pub use stars::{StarUpgrade, StarUpgrades};
pub use upgrades::{BallUpgrade, ClearsUpgrade, CostCurve, ball_buy_cost};
