//! Player actions: purchases, prestige and resets
//!
//! Every purchase either succeeds in full or leaves the session untouched.

use super::{GameEvent, Session, build_level_grid, reapply_upgrades};
use crate::economy::upgrades::{CURSOR_CURVE, ball_buy_cost, ball_cap};
use crate::economy::{BallUpgrade, ClearsUpgrade, Decimal, PlayerState, StarUpgrade, prestige};
use crate::error::{PrestigeError, PurchaseError};
use crate::sim::BallKind;

impl Session {
    /// Points price of the next ball of `kind`
    pub fn ball_price(&self, kind: BallKind) -> Decimal {
        let cheaper = self.player.star_upgrades.level(StarUpgrade::CheaperBalls);
        ball_buy_cost(kind, self.player.ball(kind).owned, cheaper)
    }

    /// Buy a ball and put it on the field; returns its entity id
    pub fn buy_ball(&mut self, kind: BallKind) -> Result<u32, PurchaseError> {
        if self.bought_ball_count() >= ball_cap(&self.player) {
            return Err(PurchaseError::BallCap);
        }
        let cost = self.ball_price(kind);
        if !self.player.can_afford_points(cost) {
            return Err(PurchaseError::CannotAfford);
        }
        self.player.points -= cost;
        let progress = self.player.ball_mut(kind);
        progress.owned = progress.owned.saturating_add(1);
        log::debug!("Bought {} ball for {}", kind.as_str(), cost.format_short());
        Ok(self.spawn_owned(kind))
    }

    /// Buy the next level of a per-type upgrade; returns the new level
    pub fn buy_ball_upgrade(
        &mut self,
        kind: BallKind,
        upgrade: BallUpgrade,
    ) -> Result<u32, PurchaseError> {
        if !upgrade.applies_to(kind) {
            return Err(PurchaseError::NotApplicable);
        }
        if let Some(unlock) = upgrade.required_unlock() {
            if !self.player.star_upgrades.has(unlock) {
                return Err(PurchaseError::Locked);
            }
        }
        let level = upgrade.level(&self.player.ball(kind));
        if level >= upgrade.max_level(&self.player) {
            return Err(PurchaseError::MaxLevel);
        }
        let cost = upgrade.cost(kind, &self.player);
        if !self.player.can_afford_points(cost) {
            return Err(PurchaseError::CannotAfford);
        }

        self.player.points -= cost;
        *upgrade.level_mut(self.player.ball_mut(kind)) = level + 1;
        reapply_upgrades(&mut self.game, &self.player);
        Ok(level + 1)
    }

    /// Buy a clears upgrade; a bigger grid takes effect immediately
    pub fn buy_clears_upgrade(&mut self, upgrade: ClearsUpgrade) -> Result<u32, PurchaseError> {
        let curve = upgrade.curve();
        let level = upgrade.level(&self.player);
        if curve.is_maxed(level) {
            return Err(PurchaseError::MaxLevel);
        }
        let cost = curve.cost(level);
        if !self.player.can_afford_clears(cost) {
            return Err(PurchaseError::CannotAfford);
        }

        self.player.clears -= cost;
        *upgrade.level_mut(&mut self.player) = level + 1;
        if upgrade == ClearsUpgrade::GridSize {
            self.regenerate();
        }
        Ok(level + 1)
    }

    /// Buy a star upgrade level; returns the new level
    pub fn buy_star_upgrade(&mut self, upgrade: StarUpgrade) -> Result<u32, PurchaseError> {
        let stars = &self.player.star_upgrades;
        if !stars.is_unlocked(upgrade) {
            return Err(PurchaseError::Locked);
        }
        let level = stars.level(upgrade);
        let cost = upgrade.cost(level).ok_or(PurchaseError::MaxLevel)?;
        if self.player.stars < cost {
            return Err(PurchaseError::CannotAfford);
        }

        self.player.stars -= cost;
        self.player.star_upgrades.set(upgrade, level + 1);
        reapply_upgrades(&mut self.game, &self.player);
        log::info!("Star upgrade {} -> {}", upgrade.as_str(), level + 1);
        Ok(level + 1)
    }

    /// Raise the cursor ball's damage multiplier
    pub fn buy_cursor_level(&mut self) -> Result<u32, PurchaseError> {
        if !self.player.star_upgrades.has(StarUpgrade::CursorBall) {
            return Err(PurchaseError::Locked);
        }
        let level = self.player.cursor_level;
        if CURSOR_CURVE.is_maxed(level) {
            return Err(PurchaseError::MaxLevel);
        }
        let cost = CURSOR_CURVE.cost(level);
        if !self.player.can_afford_points(cost) {
            return Err(PurchaseError::CannotAfford);
        }

        self.player.points -= cost;
        self.player.cursor_level = level + 1;
        reapply_upgrades(&mut self.game, &self.player);
        Ok(level + 1)
    }

    /// Rebuild the current level's grid; balls stay where they are
    pub fn regenerate(&mut self) {
        let grid = build_level_grid(&self.player, &self.settings);
        self.game.replace_grid(grid);
        let level = self.player.progress.level;
        let alive = self.game.initial_blocks;
        self.emit(GameEvent::GridRegenerated { level, alive });
    }

    /// Clears prestige, then a fresh run
    pub fn clears_prestige(&mut self) -> Result<Decimal, PrestigeError> {
        let gain = prestige::clears_prestige(&mut self.player)?;
        self.reset_run();
        Ok(gain)
    }

    /// Star prestige at the configured level gate, then a fresh run
    pub fn star_prestige(&mut self) -> Result<u64, PrestigeError> {
        let gain = prestige::star_prestige(&mut self.player, self.settings.star_prestige_min_level)?;
        self.reset_run();
        Ok(gain)
    }

    /// Stars a prestige would pay right now
    pub fn star_gain(&self) -> u64 {
        prestige::star_gain(&self.player, self.settings.star_prestige_min_level)
    }

    /// Wipe all progress, stars included
    pub fn hard_reset(&mut self, master_seed: u32) {
        log::warn!("Hard reset (seed {master_seed})");
        self.player = PlayerState::with_seed(master_seed);
        self.reset_run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;

    fn rich_session() -> Session {
        let mut player = PlayerState::with_seed(21);
        player.points = Decimal::from_f64(1e12);
        player.clears = Decimal::from_f64(1e6);
        player.stars = 1_000;
        Session::new(Settings::default(), player)
    }

    #[test]
    fn test_buy_ball() {
        let mut s = rich_session();
        let before = s.player.points;
        let price = s.ball_price(BallKind::Sniper);
        let id = s.buy_ball(BallKind::Sniper).unwrap();
        assert_eq!(s.player.points, before - price);
        assert_eq!(s.player.ball(BallKind::Sniper).owned, 1);
        assert_eq!(s.game.ball_count(BallKind::Sniper), 1);
        assert!(s.game.balls.iter().any(|b| b.id == id));
        assert!(s.ball_price(BallKind::Sniper) > price);
    }

    #[test]
    fn test_buy_ball_refusals_leave_state_alone() {
        let mut poor = Session::new(Settings::default(), PlayerState::with_seed(1));
        let before = poor.player.clone();
        assert_eq!(poor.buy_ball(BallKind::Heavy), Err(PurchaseError::CannotAfford));
        assert_eq!(poor.player, before);
        assert_eq!(poor.game.balls.len(), 1);

        let mut s = rich_session();
        s.player.points = Decimal::from_f64(1e300);
        while s.bought_ball_count() < ball_cap(&s.player) {
            s.buy_ball(BallKind::Normal).unwrap();
        }
        assert_eq!(s.buy_ball(BallKind::Normal), Err(PurchaseError::BallCap));
    }

    #[test]
    fn test_ball_upgrade_gates() {
        let mut s = rich_session();
        assert_eq!(
            s.buy_ball_upgrade(BallKind::Normal, BallUpgrade::Range),
            Err(PurchaseError::NotApplicable)
        );
        assert_eq!(
            s.buy_ball_upgrade(BallKind::Normal, BallUpgrade::Crit),
            Err(PurchaseError::Locked)
        );
        assert_eq!(s.buy_ball_upgrade(BallKind::Normal, BallUpgrade::Damage), Ok(1));
        assert_eq!(s.game.balls[0].damage, 2.0);

        for level in 1..=3 {
            assert_eq!(s.buy_ball_upgrade(BallKind::Splash, BallUpgrade::Range), Ok(level));
        }
        assert_eq!(
            s.buy_ball_upgrade(BallKind::Splash, BallUpgrade::Range),
            Err(PurchaseError::MaxLevel)
        );
        s.player.star_upgrades.set(StarUpgrade::SplashRangeBonus, 1);
        assert_eq!(s.buy_ball_upgrade(BallKind::Splash, BallUpgrade::Range), Ok(4));
    }

    #[test]
    fn test_grid_size_upgrade_regenerates() {
        let mut s = rich_session();
        assert_eq!(s.game.grid.cols(), 16);
        s.drain_events();
        assert_eq!(s.buy_clears_upgrade(ClearsUpgrade::GridSize), Ok(1));
        assert_eq!(s.game.grid.cols(), 24);
        assert!(s
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::GridRegenerated { level: 1, .. })));
        let bounds = s.game.bounds();
        assert!(s.game.balls.iter().all(|b| b.pos.x <= bounds.width && b.pos.y <= bounds.height));
    }

    #[test]
    fn test_star_upgrade_prerequisites() {
        let mut s = rich_session();
        assert_eq!(
            s.buy_star_upgrade(StarUpgrade::CursorBallSplash),
            Err(PurchaseError::Locked)
        );
        assert_eq!(s.buy_star_upgrade(StarUpgrade::CursorBall), Ok(1));
        assert_eq!(s.buy_star_upgrade(StarUpgrade::CursorBall), Err(PurchaseError::MaxLevel));
        assert_eq!(s.player.stars, 1_000 - 3);
        assert_eq!(s.buy_cursor_level(), Ok(1));
    }

    #[test]
    fn test_cursor_level_needs_unlock() {
        let mut s = rich_session();
        assert_eq!(s.buy_cursor_level(), Err(PurchaseError::Locked));
    }

    #[test]
    fn test_clears_prestige_resets_run() {
        let mut s = rich_session();
        s.buy_ball(BallKind::Splash).unwrap();
        s.player.clears_buffered = 4;
        s.player.progress.level = 9;
        let gain = s.clears_prestige().unwrap();
        assert_eq!(gain, Decimal::from_f64(4.0));
        assert_eq!(s.player.progress.level, 1);
        assert_eq!(s.player.points, Decimal::ZERO);
        // Counts were wiped, so the starter ball comes back
        assert_eq!(s.game.balls.len(), 1);
        assert_eq!(s.player.ball(BallKind::Normal).owned, 1);
        assert_eq!(s.clears_prestige(), Err(PrestigeError::NoGain));
    }

    #[test]
    fn test_star_prestige_gate() {
        let mut s = rich_session();
        assert_eq!(
            s.star_prestige(),
            Err(PrestigeError::LevelTooLow {
                required: 30,
                current: 1
            })
        );
        s.player.progress.level = 30;
        s.player.progress.best_level = 30;
        assert_eq!(s.star_gain(), 1);
        assert_eq!(s.star_prestige(), Ok(1));
        assert_eq!(s.player.stars, 1_001);
        assert_eq!(s.player.clears, Decimal::ZERO);
        assert_eq!(s.player.star_stats.best_level_ever, 30);
        assert_eq!(s.player.progress.master_seed, 21);
    }

    #[test]
    fn test_hard_reset() {
        let mut s = rich_session();
        s.buy_star_upgrade(StarUpgrade::DamageBoost).unwrap();
        s.hard_reset(77);
        assert_eq!(s.player.stars, 0);
        assert!(!s.player.star_upgrades.has(StarUpgrade::DamageBoost));
        assert_eq!(s.player.progress.master_seed, 77);
        assert_eq!(s.game.balls.len(), 1);
    }
}
