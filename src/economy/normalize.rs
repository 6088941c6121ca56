//! Save migration and total-defense normalization
//!
//! `normalize` accepts any JSON value and always returns a usable
//! `PlayerState`: every field is read on its own, type-checked and clamped,
//! and anything unreadable falls back to its default. Running it on its own
//! output changes nothing.

use serde_json::{Map, Value};

use super::decimal::Decimal;
use super::player::{
    BallProgress, ClearsUpgrades, GenerationPrefs, PlayerState, Progress, SAVE_VERSION, StarStats,
};
use super::stars::{StarUpgrade, StarUpgrades};
use super::upgrades::{BallUpgrade, CURSOR_CURVE, ClearsUpgrade};
use crate::records::{StarRecords, StarRun};
use crate::settings::Settings;
use crate::sim::{BallKind, CELL_SIZE_RANGE, GameState};

pub const MAX_LEVEL: u32 = 1_000_000;
pub const MAX_STARS: u64 = 1_000_000_000_000_000;
pub const MAX_COUNT: u64 = 1_000_000_000;
pub const MAX_RUN_TIME_SECS: f64 = 1e12;
pub const MAX_BRICKS: f64 = 1e300;
pub const MAX_NOISE_THRESHOLD: f64 = 0.95;

/// Normalize with default engine limits
pub fn normalize(raw: &Value) -> PlayerState {
    normalize_with(raw, &Settings::default())
}

/// Normalize an untrusted save document
pub fn normalize_with(raw: &Value, settings: &Settings) -> PlayerState {
    let doc = migrate(raw);
    let mut player = PlayerState::default();

    player.points = read_currency(doc.get("points"));
    player.clears = read_currency(doc.get("clears"));
    player.stars = read_u64(doc.get("stars"), MAX_STARS, 0);
    player.clears_upgrades = read_clears_upgrades(doc.get("clearsUpgrades"));
    player.star_upgrades = read_star_upgrades(doc.get("starUpgrades"));

    // Range caps depend on star upgrades, so balls come after them
    let balls = doc.get("ballTypes").and_then(Value::as_object);
    for kind in BallKind::ALL {
        let progress = read_ball_progress(balls.and_then(|b| b.get(kind.as_str())), kind, &player);
        player.ball_types.insert(kind, progress);
    }

    player.cursor_level = read_u32(doc.get("cursorLevel"), 0, CURSOR_CURVE.max_level, 0);
    player.progress = read_progress(doc.get("progress"));
    player.clears_buffered = read_u64(doc.get("clearsBuffered"), MAX_COUNT, 0);
    player.clears_buffered_bricks =
        read_f64(doc.get("clearsBufferedBricks"), 0.0, MAX_BRICKS, 0.0);
    player.run_time_secs = read_f64(doc.get("runTimeSecs"), 0.0, MAX_RUN_TIME_SECS, 0.0);
    player.generation = read_generation(doc.get("generation"));
    player.star_stats = read_star_stats(doc.get("starStats"), player.progress.best_level);

    player.game = doc.get("game").filter(|g| g.is_object()).and_then(|g| {
        match GameState::restore(
            g,
            &settings.grid_limits,
            settings.max_saved_balls,
            player.progress.master_seed,
        ) {
            Ok(state) => Some(state.to_snapshot()),
            Err(e) => {
                log::warn!("Discarding saved playfield: {e}");
                None
            }
        }
    });

    player
}

/// Bring any document up to the current version's key layout
///
/// Non-objects become an empty document. Missing or unreadable versions
/// are treated as current.
pub fn migrate(raw: &Value) -> Map<String, Value> {
    let mut doc = raw.as_object().cloned().unwrap_or_default();
    let version = doc
        .get("version")
        .and_then(Value::as_u64)
        .filter(|v| (1..=SAVE_VERSION as u64).contains(v))
        .unwrap_or(SAVE_VERSION as u64);

    if version < 2 {
        log::debug!("Migrating save v1 -> v2");
        migrate_v1(&mut doc);
    }
    if version < 3 {
        log::debug!("Migrating save v2 -> v3");
        migrate_v2(&mut doc);
    }
    doc.insert("version".into(), Value::from(SAVE_VERSION));
    doc
}

/// v1 kept the master seed at the root and named brick HP `hp`
fn migrate_v1(doc: &mut Map<String, Value>) {
    if let Some(seed) = doc.remove("seed") {
        let progress = doc
            .entry("progress")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(p) = progress.as_object_mut() {
            p.entry("masterSeed").or_insert(seed);
        }
    }
    if let Some(up) = doc.get_mut("clearsUpgrades").and_then(Value::as_object_mut) {
        if let Some(hp) = up.remove("hp") {
            up.entry("brickHp").or_insert(hp);
        }
    }
}

/// v2 stored per-type ball progress under `balls`
fn migrate_v2(doc: &mut Map<String, Value>) {
    if let Some(balls) = doc.remove("balls") {
        doc.entry("ballTypes").or_insert(balls);
    }
}

fn read_number(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn read_f64(v: Option<&Value>, lo: f64, hi: f64, default: f64) -> f64 {
    read_number(v).map_or(default, |n| n.clamp(lo, hi))
}

fn read_u32(v: Option<&Value>, lo: u32, hi: u32, default: u32) -> u32 {
    read_number(v).map_or(default, |n| n.floor().clamp(lo as f64, hi as f64) as u32)
}

fn read_u64(v: Option<&Value>, hi: u64, default: u64) -> u64 {
    read_number(v).map_or(default, |n| n.floor().clamp(0.0, hi as f64) as u64)
}

/// Currency: strings go through `Decimal`'s parser; negatives and garbage become 0
fn read_currency(v: Option<&Value>) -> Decimal {
    let d = match v {
        Some(Value::String(s)) => s.parse::<Decimal>().unwrap_or(Decimal::ZERO),
        Some(Value::Number(n)) => n.as_f64().map_or(Decimal::ZERO, Decimal::from_f64),
        _ => Decimal::ZERO,
    };
    if d.is_negative() { Decimal::ZERO } else { d }
}

fn read_clears_upgrades(v: Option<&Value>) -> ClearsUpgrades {
    let obj = v.and_then(Value::as_object);
    let get = |u: ClearsUpgrade| {
        read_u32(obj.and_then(|o| o.get(u.as_str())), 0, u.curve().max_level, 0)
    };
    ClearsUpgrades {
        density: get(ClearsUpgrade::Density),
        grid_size: get(ClearsUpgrade::GridSize),
        brick_hp: get(ClearsUpgrade::BrickHp),
    }
}

fn read_star_upgrades(v: Option<&Value>) -> StarUpgrades {
    let mut owned = StarUpgrades::default();
    let Some(obj) = v.and_then(Value::as_object) else {
        return owned;
    };
    for (key, level) in obj {
        if let Some(upgrade) = StarUpgrade::from_str(key) {
            owned.set(upgrade, read_u32(Some(level), 0, upgrade.max_level(), 0));
        }
    }
    owned
}

fn read_ball_progress(v: Option<&Value>, kind: BallKind, player: &PlayerState) -> BallProgress {
    let obj = v.and_then(Value::as_object);
    let level = |u: BallUpgrade, key: &str| {
        if !u.applies_to(kind) {
            return 0;
        }
        read_u32(obj.and_then(|o| o.get(key)), 0, u.max_level(player), 0)
    };
    BallProgress {
        owned: read_u64(obj.and_then(|o| o.get("owned")), MAX_COUNT, 0) as u32,
        damage_level: level(BallUpgrade::Damage, "damageLevel"),
        speed_level: level(BallUpgrade::Speed, "speedLevel"),
        range_level: level(BallUpgrade::Range, "rangeLevel"),
        size_level: level(BallUpgrade::Size, "sizeLevel"),
        piece_level: level(BallUpgrade::Piece, "pieceLevel"),
        crit_level: level(BallUpgrade::Crit, "critLevel"),
        execution_level: level(BallUpgrade::Execution, "executionLevel"),
    }
}

fn read_progress(v: Option<&Value>) -> Progress {
    let obj = v.and_then(Value::as_object);
    let get = |key: &str| obj.and_then(|o| o.get(key));
    let level = read_u32(get("level"), 1, MAX_LEVEL, 1);
    Progress {
        level,
        master_seed: read_u32(get("masterSeed"), 0, u32::MAX, 0),
        best_level: read_u32(get("bestLevel"), 1, MAX_LEVEL, 1).max(level),
    }
}

fn read_generation(v: Option<&Value>) -> GenerationPrefs {
    let obj = v.and_then(Value::as_object);
    let get = |key: &str| obj.and_then(|o| o.get(key));
    let d = GenerationPrefs::default();
    GenerationPrefs {
        noise_threshold: read_f64(
            get("noiseThreshold"),
            0.0,
            MAX_NOISE_THRESHOLD,
            d.noise_threshold,
        ),
        desired_cell_size: read_f64(
            get("desiredCellSize"),
            CELL_SIZE_RANGE.0 as f64,
            CELL_SIZE_RANGE.1 as f64,
            d.desired_cell_size as f64,
        ) as f32,
    }
}

fn read_star_stats(v: Option<&Value>, best_level: u32) -> StarStats {
    let obj = v.and_then(Value::as_object);
    let get = |key: &str| obj.and_then(|o| o.get(key));
    let history = get("history")
        .and_then(Value::as_array)
        .map(|runs| {
            runs.iter()
                .filter_map(Value::as_object)
                .map(|r| StarRun {
                    stars: read_u64(r.get("stars"), MAX_STARS, 0),
                    level: read_u32(r.get("level"), 1, MAX_LEVEL, 1),
                    run_time_secs: read_f64(r.get("runTimeSecs"), 0.0, MAX_RUN_TIME_SECS, 0.0),
                })
                .collect()
        })
        .map(StarRecords::from_entries)
        .unwrap_or_default();
    StarStats {
        total_stars_earned: read_u64(get("totalStarsEarned"), MAX_STARS, 0),
        star_prestiges: read_u64(get("starPrestiges"), MAX_COUNT, 0),
        clears_prestiges: read_u64(get("clearsPrestiges"), MAX_COUNT, 0),
        best_level_ever: read_u32(get("bestLevelEver"), 1, MAX_LEVEL, 1).max(best_level),
        history,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BlockGrid, GenerateOptions};
    use glam::Vec2;
    use proptest::prelude::*;
    use serde_json::json;

    fn renormalize(p: &PlayerState) -> PlayerState {
        normalize(&serde_json::to_value(p).unwrap())
    }

    #[test]
    fn test_non_objects_become_defaults() {
        for raw in [json!(null), json!([1, 2, 3]), json!("save"), json!(42), json!(true)] {
            assert_eq!(normalize(&raw), PlayerState::default());
        }
    }

    #[test]
    fn test_currency_rejects_non_finite() {
        let p = normalize(&json!({"points": "NaN", "clears": "Infinity"}));
        assert!(p.points.is_zero());
        assert!(p.clears.is_zero());
        let p = normalize(&json!({"points": "1.5e400", "clears": "-20"}));
        assert_eq!(p.points.exponent(), 400);
        assert!(p.clears.is_zero());
    }

    #[test]
    fn test_clamps_ranges() {
        let p = normalize(&json!({
            "stars": -4,
            "clearsUpgrades": {"density": 99, "gridSize": "3", "brickHp": [1]},
            "starUpgrades": {"moreStars": 1e9, "bogus": 3, "starboard": -1},
            "ballTypes": {"normal": {"owned": 3.7, "speedLevel": 500, "rangeLevel": 2}},
            "progress": {"level": 0, "bestLevel": 5e20, "masterSeed": 77},
            "generation": {"noiseThreshold": 4, "desiredCellSize": 1},
            "runTimeSecs": "Infinity",
        }));
        assert_eq!(p.stars, 0);
        assert_eq!(p.clears_upgrades, ClearsUpgrades { density: 10, grid_size: 3, brick_hp: 0 });
        assert_eq!(p.star_upgrades.level(StarUpgrade::MoreStars), 10);
        assert!(!p.star_upgrades.has(StarUpgrade::Starboard));
        let normal = p.ball(BallKind::Normal);
        assert_eq!((normal.owned, normal.speed_level, normal.range_level), (3, 25, 0));
        assert_eq!(p.progress.level, 1);
        assert_eq!(p.progress.best_level, MAX_LEVEL);
        assert_eq!(p.progress.master_seed, 77);
        assert_eq!(p.generation.noise_threshold, MAX_NOISE_THRESHOLD);
        assert_eq!(p.generation.desired_cell_size, 8.0);
        assert_eq!(p.run_time_secs, 0.0);
    }

    #[test]
    fn test_range_cap_follows_star_bonus() {
        let raw = json!({
            "starUpgrades": {"splashRangeBonus": 2},
            "ballTypes": {"splash": {"rangeLevel": 50}},
        });
        assert_eq!(normalize(&raw).ball(BallKind::Splash).range_level, 5);
    }

    #[test]
    fn test_migrates_v1() {
        let raw = json!({
            "version": 1,
            "seed": 1234,
            "clearsUpgrades": {"hp": 4},
            "balls": {"splash": {"owned": 2}},
        });
        let p = normalize(&raw);
        assert_eq!(p.progress.master_seed, 1234);
        assert_eq!(p.clears_upgrades.brick_hp, 4);
        assert_eq!(p.ball(BallKind::Splash).owned, 2);
        assert_eq!(p.version, SAVE_VERSION);
    }

    #[test]
    fn test_current_version_ignores_legacy_keys() {
        let p = normalize(&json!({"version": 3, "seed": 5, "balls": {"normal": {"owned": 9}}}));
        assert_eq!(p.progress.master_seed, 0);
        assert_eq!(p.ball(BallKind::Normal).owned, 0);
    }

    #[test]
    fn test_keeps_valid_game_and_drops_oversized() {
        let mut grid = BlockGrid::new(12, 12, 20.0, Vec2::ZERO);
        grid.generate(&GenerateOptions::default());
        let mut state = GameState::new(grid, 3);
        state.spawn_ball(BallKind::Normal, 240.0, None);
        let mut player = PlayerState::default();
        player.game = Some(state.to_snapshot());

        let p = renormalize(&player);
        assert_eq!(p.game, player.game);

        let mut raw = serde_json::to_value(&player).unwrap();
        raw["game"]["grid"]["cellSize"] = json!(1e30);
        let game = normalize(&raw).game.unwrap();
        assert_eq!(game.grid.cell_size, CELL_SIZE_RANGE.1);

        raw["game"]["grid"]["cols"] = json!(5000);
        assert_eq!(normalize(&raw).game, None);
    }

    #[test]
    fn test_history_sanitized() {
        let p = normalize(&json!({"starStats": {"history": [
            {"stars": 3, "level": 31},
            {"stars": "x"},
            7,
            {"stars": 9, "level": 40, "runTimeSecs": 100}
        ]}}));
        let stars: Vec<u64> = p.star_stats.history.entries().iter().map(|r| r.stars).collect();
        assert_eq!(stars, vec![9, 3]);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            prop::num::f64::NORMAL.prop_map(Value::from),
            prop_oneof![
                Just("NaN".to_string()),
                Just("Infinity".to_string()),
                Just("1e999".to_string()),
                Just("-3".to_string()),
                "[a-z0-9.e]{0,8}",
            ]
            .prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map(
                    prop_oneof![
                        Just("points".to_string()),
                        Just("level".to_string()),
                        Just("owned".to_string()),
                        Just("damageLevel".to_string()),
                        Just("masterSeed".to_string()),
                        Just("moreStars".to_string()),
                        Just("history".to_string()),
                        "[a-z]{1,6}",
                    ],
                    inner,
                    0..5,
                )
                .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    /// Top-level document whose known keys hold arbitrary values
    fn arb_document() -> impl Strategy<Value = Value> {
        let keys = [
            "version", "points", "clears", "stars", "clearsUpgrades", "starUpgrades", "ballTypes",
            "cursorLevel", "progress", "clearsBuffered", "clearsBufferedBricks", "runTimeSecs",
            "generation", "starStats", "game", "seed", "balls",
        ];
        prop::collection::vec(arb_json(), keys.len()).prop_map(move |vals| {
            Value::Object(
                keys.iter()
                    .zip(vals)
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            )
        })
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in prop_oneof![arb_json(), arb_document()]) {
            let once = normalize(&raw);
            let twice = renormalize(&once);
            prop_assert_eq!(&once, &twice);
        }

        #[test]
        fn prop_normalized_fields_in_range(raw in arb_document()) {
            let p = normalize(&raw);
            prop_assert!(!p.points.is_negative() && !p.clears.is_negative());
            prop_assert!(p.points.mantissa().is_finite());
            prop_assert!((1..=MAX_LEVEL).contains(&p.progress.level));
            prop_assert!(p.progress.best_level >= p.progress.level);
            prop_assert!(p.stars <= MAX_STARS);
            prop_assert!(p.clears_buffered_bricks.is_finite() && p.clears_buffered_bricks >= 0.0);
            prop_assert!(p.run_time_secs.is_finite() && p.run_time_secs >= 0.0);
            for (u, lvl) in p.star_upgrades.iter() {
                prop_assert!(lvl >= 1 && lvl <= u.max_level());
            }
            prop_assert!(p.clears_upgrades.density <= 10);
            prop_assert!((0.0..=MAX_NOISE_THRESHOLD).contains(&p.generation.noise_threshold));
        }
    }
}
