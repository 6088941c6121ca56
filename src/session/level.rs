//! Level generation from player progress
//!
//! Grid size comes from the grid-size upgrade, brick HP from the level and
//! brick-HP upgrade, density from the density upgrade. The noise threshold
//! is never allowed below the calibrated max-fill threshold.

use glam::Vec2;

use crate::economy::PlayerState;
use crate::economy::upgrades::{brick_hp_range, density_fill, grid_axis};
use crate::settings::Settings;
use crate::sim::{
    BlockGrid, FillBand, GenerateOptions, PatternKind, calibrate_noise_threshold,
    derive_level_seed,
};

/// (cols, rows) for the player's grid-size level, within the cell cap
pub fn grid_dimensions(player: &PlayerState, settings: &Settings) -> (u32, u32) {
    let limits = &settings.grid_limits;
    let cols = grid_axis(player.clears_upgrades.grid_size, limits.max_axis);
    let max_rows = (limits.max_cells / cols.max(1) as usize).max(1) as u32;
    (cols, cols.min(max_rows))
}

/// Noise threshold for a level: the density threshold, raised to the
/// calibrated max-fill threshold and to the player's override
pub fn noise_threshold(
    player: &PlayerState,
    settings: &Settings,
    cols: u32,
    rows: u32,
    seed: u32,
) -> f64 {
    let desired = 1.0 - density_fill(player.clears_upgrades.density);
    let band = FillBand::new(cols, rows, settings.filled_rows_ratio, settings.empty_border);
    let calibrated = calibrate_noise_threshold(
        cols,
        rows,
        seed,
        settings.noise_scale,
        settings.max_fill_ratio,
        &band,
    );
    desired
        .max(calibrated)
        .max(player.generation.noise_threshold)
}

/// Full generation parameters for the player's current level
pub fn generate_options(player: &PlayerState, settings: &Settings, cols: u32, rows: u32) -> GenerateOptions {
    let level = player.progress.level;
    let seed = derive_level_seed(player.progress.master_seed, level);
    let pattern = settings.pattern_for_level(level);
    let (hp_min, hp_max) = brick_hp_range(level, player.clears_upgrades.brick_hp);
    let fill = density_fill(player.clears_upgrades.density).min(settings.max_fill_ratio);
    let noise_threshold = match pattern {
        PatternKind::Noise => Some(noise_threshold(player, settings, cols, rows, seed)),
        _ => None,
    };
    GenerateOptions {
        pattern,
        seed,
        noise_scale: settings.noise_scale,
        noise_threshold,
        fill,
        hp_min,
        hp_max,
        filled_rows_ratio: settings.filled_rows_ratio,
        empty_border: settings.empty_border,
    }
}

/// Build the grid for the player's current level
///
/// A level always has at least one brick, so a clear is never instant.
pub fn build_level_grid(player: &PlayerState, settings: &Settings) -> BlockGrid {
    let (cols, rows) = grid_dimensions(player, settings);
    let mut grid = BlockGrid::new(cols, rows, player.generation.desired_cell_size, Vec2::ZERO);
    let opts = generate_options(player, settings, cols, rows);
    grid.generate(&opts);

    if grid.is_cleared() {
        let band = FillBand::new(cols, rows, settings.filled_rows_ratio, settings.empty_border);
        let col = ((band.col_start + band.col_end) / 2).min(cols.saturating_sub(1));
        let row = band.row_start.min(rows.saturating_sub(1));
        grid.set_cell(col as i32, row as i32, opts.hp_min.max(1.0));
    }

    log::debug!(
        "Level {} grid {}x{} ({:?}) with {} bricks",
        player.progress.level,
        cols,
        rows,
        opts.pattern,
        grid.alive_count()
    );
    grid
}
