//! Per-frame session update
//!
//! Order within a tick: cursor ball sync, heavy auto-spawn, upgrade
//! reapplication, ball integration, payout, then level advance if the grid
//! emptied.

use glam::Vec2;

use super::{GameEvent, Session, build_level_grid};
use crate::consts::{
    HEAVY_SPAWN_BASE_SECS, HEAVY_SPAWN_MIN_SECS, HEAVY_SPAWN_STEP_SECS, MAX_AUTO_HEAVIES,
};
use crate::economy::normalize::{MAX_BRICKS, MAX_LEVEL, MAX_RUN_TIME_SECS};
use crate::economy::upgrades::{
    ball_damage, ball_radius, ball_speed, cursor_damage_multiplier, hit_modifiers,
    points_per_brick, splash_radius,
};
use crate::economy::{PlayerState, StarUpgrade};
use crate::sim::{BallKind, GameState};

/// Host input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer position in world space, if over the playfield
    pub cursor: Option<Vec2>,
}

/// Advance the session by `dt` seconds
///
/// `dt` is clamped to `[0, max_frame_dt]`; a non-finite delta is a no-op.
pub fn tick(session: &mut Session, input: &TickInput, dt: f32) {
    let dt = if dt.is_finite() {
        dt.clamp(0.0, session.settings.max_frame_dt)
    } else {
        0.0
    };
    if dt <= 0.0 {
        return;
    }

    let player = &mut session.player;
    player.run_time_secs = (player.run_time_secs + dt as f64).min(MAX_RUN_TIME_SECS);

    sync_cursor_ball(session);
    update_heavy_spawner(session, dt);
    reapply_upgrades(&mut session.game, &session.player);

    let destroyed = session.game.step_balls(dt, input.cursor);
    if destroyed > 0 {
        let points = points_per_brick(&session.player) * destroyed as f64;
        session.player.points += points;
        session.emit(GameEvent::BricksDestroyed {
            count: destroyed,
            points,
        });
    }

    if session.game.grid.is_cleared() {
        advance_level(session);
    }
}

/// Recompute every ball's stats from its stored baselines
///
/// Baselines never change after spawn, so calling this any number of times
/// gives the same result.
pub fn reapply_upgrades(game: &mut GameState, player: &PlayerState) {
    let stars = &player.star_upgrades;
    let damage_boost = stars.level(StarUpgrade::DamageBoost);
    let speed_boost = stars.level(StarUpgrade::SpeedBoost);
    let range_bonus = stars.level(StarUpgrade::SplashRangeBonus);
    let cursor_mult = cursor_damage_multiplier(player.cursor_level);

    for ball in &mut game.balls {
        let def = ball.kind.def();
        let progress = player.ball(ball.kind);

        let base_damage = ball.aux.base_damage.unwrap_or(def.damage);
        let mut damage = ball_damage(ball.kind, base_damage, &progress, damage_boost);
        if ball.aux.is_cursor_ball {
            damage *= cursor_mult;
        }
        ball.damage = damage;

        let base_speed = ball.aux.base_speed.unwrap_or(def.speed);
        ball.set_speed(ball_speed(base_speed, &progress, speed_boost));
        ball.radius = ball_radius(ball.aux.base_radius.unwrap_or(def.radius), &progress);

        let (crit_chance, crit_mult, execute_ratio, pieces) = hit_modifiers(&progress, player);
        ball.aux.crit_chance = crit_chance;
        ball.aux.crit_mult = crit_mult;
        ball.aux.execute_ratio = execute_ratio;
        ball.aux.pieces = pieces;
        ball.aux.splash_radius = splash_radius(ball.kind, &progress, range_bonus);
    }
}

/// Keep exactly one cursor ball of the right kind while it is unlocked
fn sync_cursor_ball(session: &mut Session) {
    let stars = &session.player.star_upgrades;
    let wanted = if !stars.has(StarUpgrade::CursorBall) {
        None
    } else if stars.has(StarUpgrade::CursorBallSplash) {
        Some(BallKind::Splash)
    } else {
        Some(BallKind::Normal)
    };

    let mut found = false;
    session.game.balls.retain(|b| {
        if !b.aux.is_cursor_ball {
            return true;
        }
        // Drop extras and balls of a stale kind
        let keep = !found && Some(b.kind) == wanted;
        found |= keep;
        keep
    });

    if let (false, Some(kind)) = (found, wanted) {
        let id = session.game.spawn_ball(kind, kind.def().speed, None);
        if let Some(ball) = session.game.ball_mut(id) {
            ball.aux.is_cursor_ball = true;
            ball.aux.aim_at_cursor_on_wall = true;
        }
        session.emit(GameEvent::BallSpawned { id, kind });
    }
}

/// Seconds between heavy drops: `max(60 - 8·level, 20)`
pub fn heavy_spawn_interval(interval_level: u32) -> f32 {
    (HEAVY_SPAWN_BASE_SECS - HEAVY_SPAWN_STEP_SECS * interval_level as f32)
        .max(HEAVY_SPAWN_MIN_SECS)
}

fn update_heavy_spawner(session: &mut Session, dt: f32) {
    let stars = &session.player.star_upgrades;
    if !stars.has(StarUpgrade::HeavyAutoSpawn) {
        session.game.heavy_spawn_timer = 0.0;
        return;
    }
    let interval = heavy_spawn_interval(stars.level(StarUpgrade::HeavyInterval));

    let game = &mut session.game;
    game.heavy_spawn_timer += dt;
    if game.heavy_spawn_timer < interval {
        return;
    }
    game.heavy_spawn_timer = 0.0;

    let auto_heavies = game.balls.iter().filter(|b| b.aux.auto_spawned).count();
    if auto_heavies >= MAX_AUTO_HEAVIES {
        return;
    }
    let kind = BallKind::Heavy;
    let id = game.spawn_ball(kind, kind.def().speed, None);
    if let Some(ball) = game.ball_mut(id) {
        ball.aux.auto_spawned = true;
    }
    log::debug!("Heavy auto-spawn #{id}");
    session.emit(GameEvent::BallSpawned { id, kind });
}

/// Bank the clear, move to the next level and build its grid
fn advance_level(session: &mut Session) {
    let player = &mut session.player;
    let cleared = player.progress.level;
    player.clears_buffered = player.clears_buffered.saturating_add(1);
    player.clears_buffered_bricks =
        (player.clears_buffered_bricks + session.game.initial_blocks as f64).min(MAX_BRICKS);
    player.progress.level = cleared.saturating_add(1).min(MAX_LEVEL);
    player.progress.best_level = player.progress.best_level.max(player.progress.level);
    player.star_stats.best_level_ever = player
        .star_stats
        .best_level_ever
        .max(player.progress.best_level);

    log::info!("Level {cleared} cleared");
    session.emit(GameEvent::LevelCleared { level: cleared });

    let grid = build_level_grid(&session.player, &session.settings);
    session.game.replace_grid(grid);
    let level = session.player.progress.level;
    let alive = session.game.initial_blocks;
    session.emit(GameEvent::GridRegenerated { level, alive });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::economy::upgrades::BallUpgrade;
    use crate::sim::BlockGrid;

    const DT: f32 = 1.0 / 60.0;

    fn session(seed: u32) -> Session {
        Session::new(Settings::default(), PlayerState::with_seed(seed))
    }

    #[test]
    fn test_bad_dt_is_ignored() {
        let mut s = session(1);
        let before = s.game.balls[0].pos;
        tick(&mut s, &TickInput::default(), f32::NAN);
        tick(&mut s, &TickInput::default(), -1.0);
        assert_eq!(s.game.balls[0].pos, before);
        assert_eq!(s.player.run_time_secs, 0.0);
    }

    #[test]
    fn test_large_dt_is_clamped() {
        let mut s = session(1);
        tick(&mut s, &TickInput::default(), 10.0);
        assert!((s.player.run_time_secs - s.settings.max_frame_dt as f64).abs() < 1e-6);
    }

    #[test]
    fn test_destroying_bricks_pays_points() {
        let mut s = session(2);
        s.player.ball_mut(BallKind::Normal).damage_level = 100;
        s.drain_events();
        for _ in 0..1200 {
            tick(&mut s, &TickInput::default(), DT);
        }
        assert!(s.player.points > crate::Decimal::ZERO);
        assert!(s
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::BricksDestroyed { .. })));
    }

    #[test]
    fn test_cleared_grid_advances_level() {
        let mut s = session(3);
        s.game.replace_grid(BlockGrid::new(16, 16, 24.0, Vec2::ZERO));
        s.game.initial_blocks = 40;
        s.drain_events();

        tick(&mut s, &TickInput::default(), DT);
        assert_eq!(s.player.progress.level, 2);
        assert_eq!(s.player.progress.best_level, 2);
        assert_eq!(s.player.clears_buffered, 1);
        assert_eq!(s.player.clears_buffered_bricks, 40.0);
        assert!(s.game.grid.alive_count() > 0);
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::LevelCleared { level: 1 }));
    }

    #[test]
    fn test_upgrades_do_not_compound() {
        let mut s = session(4);
        s.player.ball_mut(BallKind::Normal).speed_level = 5;
        s.player.ball_mut(BallKind::Normal).damage_level = 3;
        reapply_upgrades(&mut s.game, &s.player);
        let speed = s.game.balls[0].speed();
        let damage = s.game.balls[0].damage;
        for _ in 0..5 {
            reapply_upgrades(&mut s.game, &s.player);
        }
        assert!((s.game.balls[0].speed() - speed).abs() < 1e-3);
        assert_eq!(s.game.balls[0].damage, damage);
        // 240 * (1 + 0.24 * 5)
        assert!((speed - 528.0).abs() < 0.01);
        assert_eq!(damage, 4.0);
        assert_eq!(BallUpgrade::Damage.level(&s.player.ball(BallKind::Normal)), 3);
    }

    #[test]
    fn test_cursor_ball_follows_unlocks() {
        let mut s = session(5);
        s.player.star_upgrades.set(StarUpgrade::CursorBall, 1);
        s.player.cursor_level = 2;
        tick(&mut s, &TickInput::default(), DT);
        let cursor: Vec<_> = s.game.balls.iter().filter(|b| b.aux.is_cursor_ball).collect();
        assert_eq!(cursor.len(), 1);
        assert_eq!(cursor[0].kind, BallKind::Normal);
        assert!(cursor[0].aux.aim_at_cursor_on_wall);
        // base 1 damage doubled by cursor level 2
        assert_eq!(cursor[0].damage, 2.0);

        s.player.star_upgrades.set(StarUpgrade::CursorBallSplash, 1);
        tick(&mut s, &TickInput::default(), DT);
        let kinds: Vec<_> = s
            .game
            .balls
            .iter()
            .filter(|b| b.aux.is_cursor_ball)
            .map(|b| b.kind)
            .collect();
        assert_eq!(kinds, vec![BallKind::Splash]);
        assert_eq!(s.bought_ball_count(), 1);
    }

    #[test]
    fn test_heavy_auto_spawn() {
        assert_eq!(heavy_spawn_interval(0), 60.0);
        assert_eq!(heavy_spawn_interval(2), 44.0);
        assert_eq!(heavy_spawn_interval(5), 20.0);

        let mut s = session(6);
        s.player.star_upgrades.set(StarUpgrade::HeavyAutoSpawn, 1);
        s.player.star_upgrades.set(StarUpgrade::HeavyInterval, 5);
        let frames = (20.0 / 0.05) as usize + 1;
        for _ in 0..frames * 5 {
            tick(&mut s, &TickInput::default(), 0.05);
        }
        let auto = s.game.balls.iter().filter(|b| b.aux.auto_spawned).count();
        assert_eq!(auto, MAX_AUTO_HEAVIES);
        assert!(s.game.balls.iter().filter(|b| b.aux.auto_spawned).all(|b| b.kind == BallKind::Heavy));
    }

    #[test]
    fn test_ticks_are_deterministic() {
        let mut a = session(9);
        let mut b = session(9);
        let input = TickInput {
            cursor: Some(Vec2::new(100.0, 100.0)),
        };
        for _ in 0..300 {
            tick(&mut a, &input, DT);
            tick(&mut b, &input, DT);
        }
        assert_eq!(a.game.to_snapshot(), b.game.to_snapshot());
        assert_eq!(a.player, b.player);
    }
}
