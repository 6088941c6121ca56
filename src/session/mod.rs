//! Live session: a player, their playfield and the engine settings
//!
//! `tick` advances the playfield and pays out points; the purchase and
//! prestige actions live in `actions`. Hosts read what happened through
//! `drain_events` rather than diffing state.

mod actions;
pub mod level;
mod tick;

pub use level::build_level_grid;
pub use tick::{TickInput, reapply_upgrades, tick};

use crate::economy::{Decimal, PlayerState, StarUpgrade};
use crate::economy::upgrades::ball_cap;
use crate::settings::Settings;
use crate::sim::{BallKind, GameState, derive_level_seed};

/// Something the host may want to animate or log
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    BricksDestroyed { count: u32, points: Decimal },
    LevelCleared { level: u32 },
    GridRegenerated { level: u32, alive: u32 },
    BallSpawned { id: u32, kind: BallKind },
}

pub struct Session {
    pub settings: Settings,
    pub player: PlayerState,
    pub game: GameState,
    events: Vec<GameEvent>,
}

impl Session {
    /// Start or resume a session
    ///
    /// A saved playfield is resumed as-is; a missing or rejected one starts
    /// a fresh run for the player's current level.
    pub fn new(settings: Settings, mut player: PlayerState) -> Self {
        let settings = settings.sanitized();
        let seed = run_seed(&player);
        let resumed = player.game.take().and_then(|snapshot| {
            match GameState::from_snapshot(
                &snapshot,
                &settings.grid_limits,
                settings.max_saved_balls,
                seed,
            ) {
                Ok(game) => Some(game),
                Err(e) => {
                    log::warn!("Saved playfield rejected ({e}), starting fresh");
                    None
                }
            }
        });

        match resumed {
            Some(game) => {
                let mut session = Self {
                    settings,
                    player,
                    game,
                    events: Vec::new(),
                };
                // A save taken on the clearing frame would otherwise skip a level
                if session.game.grid.is_cleared() {
                    session.regenerate();
                }
                session.grant_starter_balls();
                let respawned = session.spawn_missing_balls();
                if respawned > 0 {
                    log::warn!("Saved playfield was missing {respawned} owned balls, respawned");
                }
                reapply_upgrades(&mut session.game, &session.player);
                log::info!(
                    "Resumed level {} with {} balls",
                    session.player.progress.level,
                    session.game.balls.len()
                );
                session
            }
            None => {
                let grid = build_level_grid(&player, &settings);
                let mut session = Self {
                    game: GameState::new(grid, seed),
                    settings,
                    player,
                    events: Vec::new(),
                };
                session.start_run();
                session
            }
        }
    }

    /// Take every event since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Balls the player bought (cursor and auto-spawned balls excluded)
    pub fn bought_ball_count(&self) -> usize {
        self.game
            .balls
            .iter()
            .filter(|b| !b.aux.is_cursor_ball && !b.aux.auto_spawned)
            .count()
    }

    /// Live bought balls of one kind
    fn bought_count_of(&self, kind: BallKind) -> usize {
        self.game
            .balls
            .iter()
            .filter(|b| b.kind == kind && !b.aux.is_cursor_ball && !b.aux.auto_spawned)
            .count()
    }

    /// Player state with the live playfield embedded, ready to persist
    pub fn build_snapshot(&self) -> PlayerState {
        let mut save = self.player.clone();
        save.game = Some(self.game.to_snapshot());
        save
    }

    /// Throw away the playfield and start the current level from scratch
    pub(crate) fn reset_run(&mut self) {
        let grid = build_level_grid(&self.player, &self.settings);
        self.game = GameState::new(grid, run_seed(&self.player));
        self.start_run();
    }

    /// Grant starter balls and put every owned ball on the field
    fn start_run(&mut self) {
        self.grant_starter_balls();
        self.spawn_missing_balls();

        let level = self.player.progress.level;
        let alive = self.game.grid.alive_count() as u32;
        self.emit(GameEvent::GridRegenerated { level, alive });
        log::info!(
            "Run started at level {level} with {} balls and {alive} bricks",
            self.game.balls.len()
        );
    }

    fn grant_starter_balls(&mut self) {
        if self.player.star_upgrades.has(StarUpgrade::StartingBall)
            && self.player.ball(BallKind::Splash).owned == 0
        {
            self.player.ball_mut(BallKind::Splash).owned = 1;
        }
        // Zero balls and zero points would be a dead end
        if self.player.ball_types.values().all(|p| p.owned == 0) {
            self.player.ball_mut(BallKind::Normal).owned = 1;
        }
    }

    /// Spawn owned balls that are not on the field, up to the ball cap
    ///
    /// Returns how many were spawned.
    fn spawn_missing_balls(&mut self) -> usize {
        let mut room = ball_cap(&self.player).saturating_sub(self.bought_ball_count());
        let mut spawned = 0;
        for kind in BallKind::ALL {
            let owned = self.player.ball(kind).owned as usize;
            let missing = owned.saturating_sub(self.bought_count_of(kind)).min(room);
            for _ in 0..missing {
                self.spawn_owned(kind);
            }
            room -= missing;
            spawned += missing;
        }
        spawned
    }

    /// Spawn one bought ball of `kind` with current upgrades applied
    pub(crate) fn spawn_owned(&mut self, kind: BallKind) -> u32 {
        let id = self.game.spawn_ball(kind, kind.def().speed, None);
        reapply_upgrades(&mut self.game, &self.player);
        self.emit(GameEvent::BallSpawned { id, kind });
        id
    }
}

/// RNG seed for a run's playfield
fn run_seed(player: &PlayerState) -> u32 {
    derive_level_seed(player.progress.master_seed, player.progress.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_gets_starter_ball() {
        let mut session = Session::new(Settings::default(), PlayerState::with_seed(5));
        assert_eq!(session.player.ball(BallKind::Normal).owned, 1);
        assert_eq!(session.game.balls.len(), 1);
        assert!(session.game.grid.alive_count() > 0);

        let events = session.drain_events();
        assert!(events.contains(&GameEvent::BallSpawned {
            id: 1,
            kind: BallKind::Normal
        }));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_starting_ball_upgrade() {
        let mut player = PlayerState::with_seed(5);
        player.star_upgrades.set(StarUpgrade::StartingBall, 1);
        let session = Session::new(Settings::default(), player);
        assert_eq!(session.player.ball(BallKind::Splash).owned, 1);
        assert_eq!(session.player.ball(BallKind::Normal).owned, 0);
        assert_eq!(session.game.ball_count(BallKind::Splash), 1);
    }

    #[test]
    fn test_owned_balls_respect_cap() {
        let mut player = PlayerState::with_seed(5);
        player.ball_mut(BallKind::Normal).owned = 500;
        player.ball_mut(BallKind::Heavy).owned = 3;
        let session = Session::new(Settings::default(), player);
        assert_eq!(session.game.balls.len(), ball_cap(&session.player));
        assert_eq!(session.game.ball_count(BallKind::Heavy), 0);
    }

    #[test]
    fn test_resume_from_save() {
        let mut session = Session::new(Settings::default(), PlayerState::with_seed(8));
        for _ in 0..30 {
            tick(&mut session, &TickInput::default(), 1.0 / 60.0);
        }
        let save = session.build_snapshot();
        assert!(save.game.is_some());

        let resumed = Session::new(Settings::default(), save.clone());
        assert!(resumed.player.game.is_none());
        assert_eq!(resumed.game.grid, session.game.grid);
        assert_eq!(resumed.game.balls.len(), session.game.balls.len());
        assert_eq!(resumed.player.points, session.player.points);
    }

    #[test]
    fn test_resume_respawns_missing_balls() {
        let mut save = Session::new(Settings::default(), PlayerState::with_seed(8)).build_snapshot();
        save.ball_mut(BallKind::Splash).owned = 2;
        let mut raw = serde_json::to_value(&save).unwrap();
        raw["game"]["balls"] = serde_json::json!([]);
        let player = crate::economy::normalize(&raw);
        assert!(player.game.is_some());

        let mut session = Session::new(Settings::default(), player);
        assert_eq!(session.game.ball_count(BallKind::Normal), 1);
        assert_eq!(session.game.ball_count(BallKind::Splash), 2);

        let start: Vec<_> = session.game.balls.iter().map(|b| b.pos).collect();
        for _ in 0..60 {
            tick(&mut session, &TickInput::default(), 1.0 / 60.0);
        }
        assert_eq!(session.bought_ball_count(), 3);
        let moved = session.game.balls.iter().zip(&start).all(|(b, p)| b.pos != *p);
        assert!(moved);
    }

    #[test]
    fn test_resume_keeps_balls_already_on_field() {
        let session = Session::new(Settings::default(), PlayerState::with_seed(8));
        let mut resumed = Session::new(Settings::default(), session.build_snapshot());
        assert_eq!(resumed.game.balls.len(), 1);
        assert!(
            !resumed
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::BallSpawned { .. }))
        );
    }

    #[test]
    fn test_rejected_snapshot_starts_fresh() {
        let mut save = Session::new(Settings::default(), PlayerState::with_seed(8)).build_snapshot();
        let settings = Settings {
            max_saved_balls: 0,
            ..Settings::default()
        };
        save.ball_mut(BallKind::Normal).owned = 2;
        let session = Session::new(settings, save);
        assert_eq!(session.game.balls.len(), 2);
    }
}
