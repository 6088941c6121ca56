//! Prestige layers
//!
//! Clears prestige converts banked level clears into permanent clears and
//! soft-resets the run. Star prestige is gated behind a level and wipes
//! everything except stars, star upgrades and lifetime star stats.

use super::decimal::Decimal;
use super::player::{BallProgress, PlayerState};
use super::stars::StarUpgrade;
use crate::error::PrestigeError;
use crate::records::StarRun;

/// Multiplier from `clearsLogMult`: `max(1, ln(max(bricks, 1)))`
pub fn clears_log_mult(player: &PlayerState) -> f64 {
    if !player.star_upgrades.has(StarUpgrade::ClearsLogMult) {
        return 1.0;
    }
    player.clears_buffered_bricks.max(1.0).ln().max(1.0)
}

/// Clears a prestige would pay right now
pub fn clears_gain(player: &PlayerState) -> Decimal {
    let bonus = 1.0 + 0.1 * player.star_upgrades.level(StarUpgrade::BufferedBonus) as f64;
    let raw = (player.clears_buffered as f64 * clears_log_mult(player) * bonus).floor();
    let doubled = if player.star_upgrades.has(StarUpgrade::DoubleClears) {
        raw * 2.0
    } else {
        raw
    };
    Decimal::from_f64(doubled)
}

/// Convert buffered clears and soft-reset the run
///
/// Clears upgrades and everything star-related survive. Ball upgrade levels
/// survive with `keepBallUpgrades`, bought counts with `keepBallCounts`.
pub fn clears_prestige(player: &mut PlayerState) -> Result<Decimal, PrestigeError> {
    let gain = clears_gain(player);
    if gain < Decimal::ONE {
        return Err(PrestigeError::NoGain);
    }

    let keep_upgrades = player.star_upgrades.has(StarUpgrade::KeepBallUpgrades);
    let keep_counts = player.star_upgrades.has(StarUpgrade::KeepBallCounts);
    for progress in player.ball_types.values_mut() {
        *progress = match (keep_upgrades, keep_counts) {
            (true, true) => *progress,
            (true, false) => BallProgress {
                owned: 0,
                ..*progress
            },
            (false, true) => progress.without_upgrades(),
            (false, false) => BallProgress::default(),
        };
    }

    player.clears += gain;
    player.points = Decimal::ZERO;
    player.cursor_level = 0;
    player.progress.level = 1;
    player.clears_buffered = 0;
    player.clears_buffered_bricks = 0.0;
    player.run_time_secs = 0.0;
    player.star_stats.clears_prestiges = player.star_stats.clears_prestiges.saturating_add(1);
    player.game = None;

    log::info!("Clears prestige: +{} clears", gain.format_short());
    Ok(gain)
}

/// Stars a prestige would pay right now (0 below the level gate)
pub fn star_gain(player: &PlayerState, min_level: u32) -> u64 {
    let level = player.progress.level;
    if level < min_level {
        return 0;
    }
    let stars = &player.star_upgrades;

    let mut base = 1.0;
    if stars.has(StarUpgrade::StarsFromLevel) {
        base += ((level - min_level) / 10) as f64;
    }
    if stars.has(StarUpgrade::StarsFromClears) {
        base += (player.clears + Decimal::ONE).log10().floor().max(0.0);
    }

    let more_stars = 1.0 + 0.5 * stars.level(StarUpgrade::MoreStars) as f64;
    let starboard = if stars.has(StarUpgrade::Starboard) { 2.0 } else { 1.0 };
    let time = if stars.has(StarUpgrade::StarsFromTime) {
        1.0 + (player.run_time_secs / 3600.0).min(10.0) * 0.1
    } else {
        1.0
    };

    let gain = (base * more_stars * starboard * time).ceil();
    if gain.is_finite() {
        gain.clamp(0.0, u64::MAX as f64) as u64
    } else {
        0
    }
}

/// Hard reset into a fresh run, paying out stars
pub fn star_prestige(player: &mut PlayerState, min_level: u32) -> Result<u64, PrestigeError> {
    let level = player.progress.level;
    if level < min_level {
        return Err(PrestigeError::LevelTooLow {
            required: min_level,
            current: level,
        });
    }
    let gain = star_gain(player, min_level);
    if gain == 0 {
        return Err(PrestigeError::NoGain);
    }

    let mut stats = player.star_stats.clone();
    stats.total_stars_earned = stats.total_stars_earned.saturating_add(gain);
    stats.star_prestiges = stats.star_prestiges.saturating_add(1);
    stats.best_level_ever = stats.best_level_ever.max(player.progress.best_level);
    stats.history.add_run(StarRun {
        stars: gain,
        level,
        run_time_secs: player.run_time_secs,
    });

    let mut fresh = PlayerState::with_seed(player.progress.master_seed);
    fresh.stars = player.stars.saturating_add(gain);
    fresh.star_upgrades = player.star_upgrades.clone();
    fresh.generation = player.generation;
    fresh.star_stats = stats;
    *player = fresh;

    log::info!("Star prestige at level {level}: +{gain} stars");
    Ok(gain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::BallKind;

    fn buffered(clears: u64, bricks: f64) -> PlayerState {
        let mut p = PlayerState::default();
        p.clears_buffered = clears;
        p.clears_buffered_bricks = bricks;
        p
    }

    #[test]
    fn test_clears_gain_plain() {
        let p = buffered(5, 0.0);
        assert_eq!(clears_gain(&p), Decimal::from_f64(5.0));
    }

    #[test]
    fn test_clears_gain_log_mult_with_no_bricks() {
        let mut p = buffered(5, 0.0);
        p.star_upgrades.set(StarUpgrade::ClearsLogMult, 1);
        assert_eq!(clears_gain(&p), Decimal::from_f64(5.0));
    }

    #[test]
    fn test_clears_gain_log_mult_and_double() {
        let mut p = buffered(5, 1000.0);
        p.star_upgrades.set(StarUpgrade::ClearsLogMult, 1);
        // floor(5 * ln 1000) = floor(34.53) = 34
        assert_eq!(clears_gain(&p), Decimal::from_f64(34.0));
        p.star_upgrades.set(StarUpgrade::DoubleClears, 1);
        assert_eq!(clears_gain(&p), Decimal::from_f64(68.0));
    }

    #[test]
    fn test_clears_prestige_requires_gain() {
        let mut p = buffered(0, 500.0);
        assert_eq!(clears_prestige(&mut p), Err(PrestigeError::NoGain));
    }

    #[test]
    fn test_clears_prestige_resets_run() {
        let mut p = buffered(3, 10.0);
        p.points = Decimal::from_f64(1e6);
        p.progress.level = 12;
        p.progress.best_level = 12;
        p.clears_upgrades.density = 2;
        p.ball_mut(BallKind::Normal).owned = 4;
        p.ball_mut(BallKind::Normal).damage_level = 7;

        let gain = clears_prestige(&mut p).unwrap();
        assert_eq!(gain, Decimal::from_f64(3.0));
        assert_eq!(p.clears, gain);
        assert!(p.points.is_zero());
        assert_eq!(p.progress.level, 1);
        assert_eq!(p.progress.best_level, 12);
        assert_eq!(p.clears_upgrades.density, 2);
        assert_eq!(p.ball(BallKind::Normal), BallProgress::default());
        assert_eq!(p.star_stats.clears_prestiges, 1);
    }

    #[test]
    fn test_clears_prestige_keeps_with_unlocks() {
        let mut p = buffered(1, 0.0);
        p.star_upgrades.set(StarUpgrade::KeepBallUpgrades, 1);
        p.ball_mut(BallKind::Splash).owned = 2;
        p.ball_mut(BallKind::Splash).range_level = 1;
        clears_prestige(&mut p).unwrap();
        assert_eq!(p.ball(BallKind::Splash).owned, 0);
        assert_eq!(p.ball(BallKind::Splash).range_level, 1);

        let mut p = buffered(1, 0.0);
        p.star_upgrades.set(StarUpgrade::KeepBallCounts, 1);
        p.ball_mut(BallKind::Splash).owned = 2;
        p.ball_mut(BallKind::Splash).range_level = 1;
        clears_prestige(&mut p).unwrap();
        assert_eq!(p.ball(BallKind::Splash).owned, 2);
        assert_eq!(p.ball(BallKind::Splash).range_level, 0);
    }

    #[test]
    fn test_star_gain_formula() {
        let mut p = PlayerState::default();
        p.progress.level = 29;
        assert_eq!(star_gain(&p, 30), 0);

        p.progress.level = 55;
        assert_eq!(star_gain(&p, 30), 1);

        p.star_upgrades.set(StarUpgrade::StarsFromLevel, 1);
        // 1 + floor(25 / 10) = 3
        assert_eq!(star_gain(&p, 30), 3);

        p.star_upgrades.set(StarUpgrade::MoreStars, 2);
        p.star_upgrades.set(StarUpgrade::Starboard, 1);
        // 3 * 2 * 2
        assert_eq!(star_gain(&p, 30), 12);

        p.star_upgrades.set(StarUpgrade::StarsFromClears, 1);
        p.clears = Decimal::from_f64(1e6);
        // (3 + 6) * 2 * 2
        assert_eq!(star_gain(&p, 30), 36);

        p.star_upgrades.set(StarUpgrade::StarsFromTime, 1);
        p.run_time_secs = 5.0 * 3600.0;
        // 36 * 1.5
        assert_eq!(star_gain(&p, 30), 54);
    }

    #[test]
    fn test_star_prestige_gate_and_reset() {
        let mut p = PlayerState::with_seed(42);
        p.progress.level = 10;
        assert_eq!(
            star_prestige(&mut p, 30),
            Err(PrestigeError::LevelTooLow { required: 30, current: 10 })
        );

        p.progress.level = 31;
        p.progress.best_level = 31;
        p.stars = 4;
        p.clears = Decimal::from_f64(50.0);
        p.star_upgrades.set(StarUpgrade::DamageBoost, 2);
        p.run_time_secs = 100.0;

        let gain = star_prestige(&mut p, 30).unwrap();
        assert_eq!(gain, 1);
        assert_eq!(p.stars, 5);
        assert!(p.clears.is_zero());
        assert_eq!(p.progress.level, 1);
        assert_eq!(p.progress.master_seed, 42);
        assert_eq!(p.star_upgrades.level(StarUpgrade::DamageBoost), 2);
        assert_eq!(p.star_stats.star_prestiges, 1);
        assert_eq!(p.star_stats.best_level_ever, 31);
        assert_eq!(p.star_stats.history.entries().len(), 1);
        assert_eq!(p.run_time_secs, 0.0);
    }
}
