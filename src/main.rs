//! Idle Breakout headless runner
//!
//! Usage: `idle-breakout [seed-text] [seconds] [save-dir]`
//!
//! Simulates an unattended session at a fixed 60 Hz with a greedy buyer
//! standing in for the player, then logs a summary. With a save directory
//! the run resumes from and autosaves to `<save-dir>/idle-breakout-save.json`.

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use idle_breakout::economy::{BallUpgrade, Decimal};
    use idle_breakout::persistence::{
        Autosave, FileStorage, MemoryStorage, Storage, load_player, save_session,
    };
    use idle_breakout::records::format_duration;
    use idle_breakout::sim::{BallKind, seed_from_text};
    use idle_breakout::{GameEvent, PlayerState, Session, Settings, TickInput, tick};

    const SIM_DT: f32 = 1.0 / 60.0;
    const DEFAULT_SECONDS: f32 = 600.0;
    /// Buy attempts happen this often (in ticks)
    const SHOP_EVERY: u64 = 30;
    /// Bank clears once this many levels are buffered
    const PRESTIGE_AT_BUFFERED: u64 = 10;

    pub fn run() {
        let mut args = std::env::args().skip(1);
        let seed_text = args.next().unwrap_or_else(|| "idle".to_string());
        let seconds = args
            .next()
            .and_then(|s| s.parse::<f32>().ok())
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_SECONDS);
        let mut storage: Box<dyn Storage> = match args.next() {
            Some(dir) => Box::new(FileStorage::new(dir)),
            None => Box::new(MemoryStorage::new()),
        };

        let settings = Settings::default();
        let mut player = load_player(storage.as_ref(), &settings);
        if player == PlayerState::default() {
            player = PlayerState::with_seed(seed_from_text(&seed_text));
        }
        log::info!(
            "Starting at level {} (seed {:#010x}), simulating {}",
            player.progress.level,
            player.progress.master_seed,
            format_duration(seconds as f64)
        );

        let mut autosave = Autosave::new(settings.autosave_interval_secs);
        let mut session = Session::new(settings, player);
        let input = TickInput::default();
        let ticks = (seconds / SIM_DT).ceil() as u64;
        let mut bricks = 0u64;

        for n in 0..ticks {
            tick(&mut session, &input, SIM_DT);
            for event in session.drain_events() {
                match event {
                    GameEvent::BricksDestroyed { count, .. } => bricks += count as u64,
                    GameEvent::LevelCleared { level } => log::debug!("Cleared level {level}"),
                    _ => {}
                }
            }
            if n % SHOP_EVERY == 0 {
                shop(&mut session);
            }
            if autosave.advance(SIM_DT) {
                save_session(storage.as_mut(), &session);
            }
        }
        save_session(storage.as_mut(), &session);

        let p = &session.player;
        log::info!(
            "Done: level {} (best {}), {} points, {} clears, {} stars, {} balls, {} bricks",
            p.progress.level,
            p.progress.best_level,
            p.points,
            p.clears,
            p.stars,
            session.game.balls.len(),
            bricks
        );
    }

    /// Greedy stand-in for a player: prestige when worthwhile, then buy the
    /// cheapest affordable item until nothing fits
    fn shop(session: &mut Session) {
        if session.star_gain() > 0 {
            if let Ok(stars) = session.star_prestige() {
                log::info!("Star prestige for {stars} stars");
            }
            return;
        }
        if session.player.clears_buffered >= PRESTIGE_AT_BUFFERED {
            if let Ok(gain) = session.clears_prestige() {
                log::info!("Clears prestige for {gain} clears");
            }
            return;
        }

        loop {
            let mut offers: Vec<(Decimal, Offer)> = BallKind::ALL
                .into_iter()
                .map(|kind| (session.ball_price(kind), Offer::Ball(kind)))
                .collect();
            for kind in BallKind::ALL {
                if session.player.ball(kind).owned > 0 {
                    let upgrade = BallUpgrade::Damage;
                    offers.push((upgrade.cost(kind, &session.player), Offer::Upgrade(kind, upgrade)));
                }
            }
            offers.sort_by(|a, b| a.0.cmp(&b.0));

            let bought = offers.into_iter().any(|(_, offer)| match offer {
                Offer::Ball(kind) => session.buy_ball(kind).is_ok(),
                Offer::Upgrade(kind, upgrade) => session.buy_ball_upgrade(kind, upgrade).is_ok(),
            });
            if !bought {
                break;
            }
        }
    }

    #[derive(Clone, Copy)]
    enum Offer {
        Ball(BallKind),
        Upgrade(BallKind, BallUpgrade),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Idle Breakout (headless) starting...");
    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Browser hosts drive `idle_breakout::Session` directly
}
