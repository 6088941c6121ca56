//! Destructible brick grid
//!
//! Dense row-major storage (`index = row * cols + col`) of per-cell hit
//! points. A cell with `hp == 0` is destroyed and never collides. `max_hp`
//! only exists for damage-ratio display and clamping.

use std::cmp::Ordering;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::collision::{CircleHit, Rect, circle_rect_collision};
use super::rng::{SeededStream, value_noise_2d};
use crate::error::GridLoadError;

/// Accepted world-space cell size, inclusive
pub const CELL_SIZE_RANGE: (f32, f32) = (8.0, 64.0);

/// Size caps applied when loading or resizing from untrusted data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridLimits {
    pub max_axis: u32,
    pub max_cells: usize,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_axis: 100,
            max_cells: 10_000,
        }
    }
}

impl GridLimits {
    pub fn allows(&self, cols: u64, rows: u64) -> bool {
        cols <= self.max_axis as u64
            && rows <= self.max_axis as u64
            && cols.saturating_mul(rows) <= self.max_cells as u64
    }
}

/// Terrain pattern used by `BlockGrid::generate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    #[default]
    Noise,
    Checker,
    Stripes,
    Diamond,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Noise => "noise",
            PatternKind::Checker => "checker",
            PatternKind::Stripes => "stripes",
            PatternKind::Diamond => "diamond",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "noise" => Some(PatternKind::Noise),
            "checker" | "checkerboard" => Some(PatternKind::Checker),
            "stripes" => Some(PatternKind::Stripes),
            "diamond" => Some(PatternKind::Diamond),
            _ => None,
        }
    }

    /// Pattern density at a cell, in [0, 1]
    pub fn sample(&self, col: u32, row: u32, cols: u32, rows: u32, seed: u32, scale: f64) -> f64 {
        let noise = value_noise_2d(col as f64 * scale, row as f64 * scale, seed);
        let v = match self {
            PatternKind::Noise => noise,
            PatternKind::Checker => {
                let on = if (col + row) % 2 == 0 { 1.0 } else { 0.0 };
                0.5 * on + 0.5 * noise
            }
            PatternKind::Stripes => {
                let on = if row % 2 == 0 { 1.0 } else { 0.0 };
                0.5 * on + 0.5 * noise
            }
            PatternKind::Diamond => {
                let cx = (cols.max(1) - 1) as f64 * 0.5;
                let cy = (rows.max(1) - 1) as f64 * 0.5;
                let dx = if cx > 0.0 { (col as f64 - cx).abs() / cx } else { 0.0 };
                let dy = if cy > 0.0 { (row as f64 - cy).abs() / cy } else { 0.0 };
                let shape = (1.0 - (dx + dy) * 0.5).clamp(0.0, 1.0);
                0.7 * shape + 0.3 * noise
            }
        };
        v.clamp(0.0, 1.0)
    }
}

/// Parameters for `BlockGrid::generate`
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub pattern: PatternKind,
    pub seed: u32,
    pub noise_scale: f64,
    /// Explicit threshold; overrides `1 - fill` for the noise pattern
    pub noise_threshold: Option<f64>,
    pub fill: f64,
    pub hp_min: f64,
    pub hp_max: f64,
    /// Fraction of rows (from the top) that may hold bricks
    pub filled_rows_ratio: f64,
    /// Cells kept empty along the left, right and top edges
    pub empty_border: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            pattern: PatternKind::Noise,
            seed: 1,
            noise_scale: 0.35,
            noise_threshold: None,
            fill: 0.5,
            hp_min: 1.0,
            hp_max: 6.0,
            filled_rows_ratio: 0.6,
            empty_border: 1,
        }
    }
}

impl GenerateOptions {
    /// Threshold a sampled value must exceed to place a brick
    pub fn threshold(&self) -> f64 {
        let derived = 1.0 - self.fill.clamp(0.0, 1.0);
        let t = match (self.pattern, self.noise_threshold) {
            (PatternKind::Noise, Some(explicit)) if explicit.is_finite() => explicit,
            _ => derived,
        };
        t.clamp(0.0, 0.999)
    }
}

/// Cell span that generation is allowed to fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillBand {
    pub col_start: u32,
    pub col_end: u32,
    pub row_start: u32,
    pub row_end: u32,
}

impl FillBand {
    pub fn new(cols: u32, rows: u32, filled_rows_ratio: f64, empty_border: u32) -> Self {
        let ratio = if filled_rows_ratio.is_finite() {
            filled_rows_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let row_end = ((rows as f64 * ratio).ceil() as u32).min(rows);
        Self {
            col_start: empty_border.min(cols),
            col_end: cols.saturating_sub(empty_border),
            row_start: empty_border.min(row_end),
            row_end,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.row_start..self.row_end)
            .flat_map(move |row| (self.col_start..self.col_end).map(move |col| (col, row)))
    }
}

/// Result of a damage application
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageReport {
    /// HP actually removed (no overkill)
    pub dealt: f64,
    /// Cells that went from alive to dead during this call
    pub destroyed: u32,
}

impl std::ops::AddAssign for DamageReport {
    fn add_assign(&mut self, rhs: Self) {
        self.dealt += rhs.dealt;
        self.destroyed += rhs.destroyed;
    }
}

/// Deepest contact between a circle and the alive cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHit {
    pub col: i32,
    pub row: i32,
    pub normal: Vec2,
    pub penetration: f32,
}

/// Flat persisted form, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSnapshot {
    pub cols: u32,
    pub rows: u32,
    pub cell_size: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    pub hp: Vec<f64>,
    pub max_hp: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockGrid {
    cols: u32,
    rows: u32,
    cell_size: f32,
    origin: Vec2,
    hp: Vec<f64>,
    max_hp: Vec<f64>,
}

impl BlockGrid {
    pub fn new(cols: u32, rows: u32, cell_size: f32, origin: Vec2) -> Self {
        let n = cols as usize * rows as usize;
        Self {
            cols,
            rows,
            cell_size: sanitize_cell_size(cell_size, 24.0),
            origin,
            hp: vec![0.0; n],
            max_hp: vec![0.0; n],
        }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Total world-space extent of the grid
    pub fn extent(&self) -> Vec2 {
        Vec2::new(self.cols as f32, self.rows as f32) * self.cell_size
    }

    /// Reallocate to new dimensions; contents are discarded
    pub fn resize(&mut self, cols: u32, rows: u32) {
        if cols == self.cols && rows == self.rows {
            return;
        }
        let n = cols as usize * rows as usize;
        self.cols = cols;
        self.rows = rows;
        self.hp = vec![0.0; n];
        self.max_hp = vec![0.0; n];
    }

    pub fn clear(&mut self) {
        self.hp.fill(0.0);
        self.max_hp.fill(0.0);
    }

    #[inline]
    pub fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 || col as u32 >= self.cols || row as u32 >= self.rows {
            return None;
        }
        Some(row as usize * self.cols as usize + col as usize)
    }

    pub fn hp(&self, col: i32, row: i32) -> f64 {
        self.index(col, row).map_or(0.0, |i| self.hp[i])
    }

    pub fn max_hp(&self, col: i32, row: i32) -> f64 {
        self.index(col, row).map_or(0.0, |i| self.max_hp[i])
    }

    pub fn is_alive(&self, col: i32, row: i32) -> bool {
        self.hp(col, row) > 0.0
    }

    /// Remaining HP fraction for rendering tint
    pub fn damage_ratio(&self, col: i32, row: i32) -> f64 {
        match self.index(col, row) {
            Some(i) if self.max_hp[i] > 0.0 => (self.hp[i] / self.max_hp[i]).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Set a cell directly (editor/test hook); negative or non-finite HP clears it
    pub fn set_cell(&mut self, col: i32, row: i32, hp: f64) {
        if let Some(i) = self.index(col, row) {
            let hp = if hp.is_finite() { hp.max(0.0) } else { 0.0 };
            self.hp[i] = hp;
            self.max_hp[i] = hp;
        }
    }

    pub fn alive_count(&self) -> usize {
        self.hp.iter().filter(|&&h| h > 0.0).count()
    }

    pub fn is_cleared(&self) -> bool {
        self.hp.iter().all(|&h| h <= 0.0)
    }

    /// Iterate alive cells as (col, row)
    pub fn alive_cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let cols = self.cols.max(1) as usize;
        self.hp
            .iter()
            .enumerate()
            .filter(|(_, h)| **h > 0.0)
            .map(move |(i, _)| ((i % cols) as i32, (i / cols) as i32))
    }

    pub fn cell_rect(&self, col: i32, row: i32) -> Rect {
        let min = self.origin + Vec2::new(col as f32, row as f32) * self.cell_size;
        Rect::new(min, min + Vec2::splat(self.cell_size))
    }

    pub fn cell_center(&self, col: i32, row: i32) -> Vec2 {
        self.cell_rect(col, row).center()
    }

    /// Cell containing a world point, if inside the grid
    pub fn cell_at(&self, pos: Vec2) -> Option<(i32, i32)> {
        let local = (pos - self.origin) / self.cell_size;
        let (col, row) = (local.x.floor() as i32, local.y.floor() as i32);
        self.index(col, row).map(|_| (col, row))
    }

    /// Fill the grid from a pattern; every cell is reset first
    pub fn generate(&mut self, opts: &GenerateOptions) {
        self.clear();
        let threshold = opts.threshold();
        let hp_min = if opts.hp_min.is_finite() { opts.hp_min.max(1.0) } else { 1.0 };
        let hp_max = if opts.hp_max.is_finite() { opts.hp_max.max(hp_min) } else { hp_min };
        let band = FillBand::new(self.cols, self.rows, opts.filled_rows_ratio, opts.empty_border);

        for (col, row) in band.cells() {
            let v = opts
                .pattern
                .sample(col, row, self.cols, self.rows, opts.seed, opts.noise_scale);
            if v <= threshold {
                continue;
            }
            let t = ((v - threshold) / (1.0 - threshold)).clamp(0.0, 1.0);
            let hp = (hp_min + (hp_max - hp_min) * t).round().clamp(hp_min, hp_max);
            let i = row as usize * self.cols as usize + col as usize;
            self.hp[i] = hp;
            self.max_hp[i] = hp;
        }
    }

    /// Damage one cell; dead or out-of-range cells absorb nothing
    pub fn damage_cell(&mut self, col: i32, row: i32, amount: f64) -> DamageReport {
        let Some(i) = self.index(col, row) else {
            return DamageReport::default();
        };
        let before = self.hp[i];
        if before <= 0.0 || !amount.is_finite() || amount <= 0.0 {
            return DamageReport::default();
        }
        let after = (before - amount).max(0.0);
        self.hp[i] = after;
        DamageReport {
            dealt: before - after,
            destroyed: u32::from(after <= 0.0),
        }
    }

    /// Uniform damage to every cell within `radius` cells (Euclidean)
    pub fn damage_radius_cells(
        &mut self,
        col: i32,
        row: i32,
        radius: u32,
        amount: f64,
        include_center: bool,
    ) -> DamageReport {
        self.damage_radius_weighted(col, row, radius, amount, include_center, |_| 1.0)
    }

    /// Radius damage with a weight per cell distance (in cells)
    pub fn damage_radius_weighted<F>(
        &mut self,
        col: i32,
        row: i32,
        radius: u32,
        amount: f64,
        include_center: bool,
        weight: F,
    ) -> DamageReport
    where
        F: Fn(f64) -> f64,
    {
        let mut report = DamageReport::default();
        let r = radius as i32;
        let r_sq = (radius as i64) * (radius as i64);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 && !include_center {
                    continue;
                }
                let d_sq = (dx as i64) * (dx as i64) + (dy as i64) * (dy as i64);
                if d_sq > r_sq {
                    continue;
                }
                let w = weight((d_sq as f64).sqrt());
                if w > 0.0 {
                    report += self.damage_cell(col + dx, row + dy, amount * w);
                }
            }
        }
        report
    }

    /// Damage every cell in a row, optionally skipping one column
    pub fn damage_row(&mut self, row: i32, amount: f64, exclude_col: Option<i32>) -> DamageReport {
        let mut report = DamageReport::default();
        for col in 0..self.cols as i32 {
            if Some(col) == exclude_col {
                continue;
            }
            report += self.damage_cell(col, row, amount);
        }
        report
    }

    /// Alive cells in the 8-neighbourhood of a cell
    pub fn alive_neighbors(&self, col: i32, row: i32) -> Vec<(i32, i32)> {
        let mut out = Vec::with_capacity(8);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if (dx != 0 || dy != 0) && self.is_alive(col + dx, row + dy) {
                    out.push((col + dx, row + dy));
                }
            }
        }
        out
    }

    /// Deepest-penetration contact among alive cells overlapping the circle
    ///
    /// Only cells under the circle's bounding box are tested. Picking the
    /// deepest overlap (rather than the nearest cell) keeps a ball that
    /// straddles two bricks from bouncing twice in opposite directions.
    pub fn find_circle_collision(&self, center: Vec2, radius: f32) -> Option<GridHit> {
        if self.cols == 0 || self.rows == 0 {
            return None;
        }
        let lo = (center - Vec2::splat(radius) - self.origin) / self.cell_size;
        let hi = (center + Vec2::splat(radius) - self.origin) / self.cell_size;
        if hi.x < 0.0 || hi.y < 0.0 || lo.x >= self.cols as f32 || lo.y >= self.rows as f32 {
            return None;
        }
        let c0 = (lo.x.floor() as i32).max(0);
        let r0 = (lo.y.floor() as i32).max(0);
        let c1 = (hi.x.floor() as i32).min(self.cols as i32 - 1);
        let r1 = (hi.y.floor() as i32).min(self.rows as i32 - 1);

        let mut best: Option<GridHit> = None;
        for row in r0..=r1 {
            for col in c0..=c1 {
                if !self.is_alive(col, row) {
                    continue;
                }
                let Some(CircleHit {
                    normal,
                    penetration,
                }) = circle_rect_collision(center, radius, &self.cell_rect(col, row))
                else {
                    continue;
                };
                if best.is_none_or(|b| penetration > b.penetration) {
                    best = Some(GridHit {
                        col,
                        row,
                        normal,
                        penetration,
                    });
                }
            }
        }
        best
    }

    pub fn has_alive_block_within_radius(&self, pos: Vec2, radius: f32) -> bool {
        let r_sq = radius * radius;
        self.alive_cells()
            .any(|(c, r)| self.cell_center(c, r).distance_squared(pos) <= r_sq)
    }

    /// Uniformly random alive cell whose centre lies beyond `radius`
    pub fn random_alive_block_outside_radius(
        &self,
        pos: Vec2,
        radius: f32,
        rng: &mut SeededStream,
    ) -> Option<(i32, i32)> {
        let r_sq = radius * radius;
        let candidates: Vec<_> = self
            .alive_cells()
            .filter(|&(c, r)| self.cell_center(c, r).distance_squared(pos) > r_sq)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.index(candidates.len())])
    }

    /// Alive cell with the most distant centre; first in row-major order on ties
    pub fn farthest_alive_block(&self, pos: Vec2) -> Option<(i32, i32)> {
        self.alive_cells()
            .map(|(c, r)| ((c, r), self.cell_center(c, r).distance_squared(pos)))
            .fold(None, |best: Option<((i32, i32), f32)>, item| match best {
                Some(b) if b.1.partial_cmp(&item.1) != Some(Ordering::Less) => Some(b),
                _ => Some(item),
            })
            .map(|(cell, _)| cell)
    }

    pub fn to_data(&self) -> GridSnapshot {
        GridSnapshot {
            cols: self.cols,
            rows: self.rows,
            cell_size: self.cell_size,
            origin_x: self.origin.x,
            origin_y: self.origin.y,
            hp: self.hp.clone(),
            max_hp: self.max_hp.clone(),
        }
    }

    /// Validate and load an untrusted snapshot
    ///
    /// On error nothing is mutated. Individual cells are coerced: non-finite
    /// or negative HP becomes 0 and `max_hp` is raised to at least `hp`.
    pub fn from_data(&mut self, raw: &Value, limits: &GridLimits) -> Result<(), GridLoadError> {
        let obj = raw.as_object().ok_or(GridLoadError::NotAnObject)?;
        let cols = read_dimension(obj.get("cols")).ok_or(GridLoadError::InvalidDimensions)?;
        let rows = read_dimension(obj.get("rows")).ok_or(GridLoadError::InvalidDimensions)?;
        if !limits.allows(cols, rows) {
            return Err(GridLoadError::TooLarge { cols, rows });
        }
        let n = (cols * rows) as usize;

        let hp_raw = obj.get("hp").and_then(Value::as_array);
        let found = hp_raw.map_or(0, Vec::len);
        if found != n {
            return Err(GridLoadError::LengthMismatch {
                field: "hp",
                expected: n,
                found,
            });
        }
        let max_raw = match obj.get("maxHp").and_then(Value::as_array) {
            Some(arr) if arr.len() == n => Some(arr),
            Some(arr) => {
                return Err(GridLoadError::LengthMismatch {
                    field: "maxHp",
                    expected: n,
                    found: arr.len(),
                });
            }
            None => None,
        };

        let mut hp = Vec::with_capacity(n);
        let mut max_hp = Vec::with_capacity(n);
        for i in 0..n {
            let h = hp_raw.map_or(0.0, |a| finite_non_negative(&a[i]));
            let m = max_raw.map_or(h, |a| finite_non_negative(&a[i])).max(h);
            hp.push(h);
            max_hp.push(m);
        }

        let cell_size = obj
            .get("cellSize")
            .and_then(Value::as_f64)
            .map_or(self.cell_size, |c| sanitize_cell_size(c as f32, self.cell_size))
            .clamp(CELL_SIZE_RANGE.0, CELL_SIZE_RANGE.1);
        let origin = Vec2::new(
            read_coord(obj.get("originX")),
            read_coord(obj.get("originY")),
        );

        self.cols = cols as u32;
        self.rows = rows as u32;
        self.cell_size = cell_size;
        self.origin = origin;
        self.hp = hp;
        self.max_hp = max_hp;
        Ok(())
    }

    /// Typed convenience over `from_data`
    pub fn from_snapshot(snapshot: &GridSnapshot, limits: &GridLimits) -> Result<Self, GridLoadError> {
        let raw = serde_json::to_value(snapshot).map_err(|_| GridLoadError::NotAnObject)?;
        let mut grid = BlockGrid::new(0, 0, snapshot.cell_size, Vec2::ZERO);
        grid.from_data(&raw, limits)?;
        Ok(grid)
    }
}

/// Noise threshold that keeps the filled share of `band` at or below `max_fill`
///
/// Samples the noise over every candidate cell, sorts, and takes the
/// percentile at `1 - max_fill`. Cells must strictly exceed the result.
pub fn calibrate_noise_threshold(
    cols: u32,
    rows: u32,
    seed: u32,
    noise_scale: f64,
    max_fill: f64,
    band: &FillBand,
) -> f64 {
    let mut samples: Vec<f64> = band
        .cells()
        .map(|(c, r)| PatternKind::Noise.sample(c, r, cols, rows, seed, noise_scale))
        .collect();
    if samples.is_empty() {
        return 0.0;
    }
    samples.sort_by(|a, b| a.total_cmp(b));
    let max_fill = if max_fill.is_finite() { max_fill.clamp(0.0, 1.0) } else { 1.0 };
    let idx = ((1.0 - max_fill) * samples.len() as f64).floor() as usize;
    samples[idx.min(samples.len() - 1)]
}

fn sanitize_cell_size(size: f32, fallback: f32) -> f32 {
    if size.is_finite() && size > 0.0 {
        size
    } else if fallback.is_finite() && fallback > 0.0 {
        fallback
    } else {
        24.0
    }
}

fn read_dimension(v: Option<&Value>) -> Option<u64> {
    let v = v?;
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    let f = v.as_f64()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0).then_some(f as u64)
}

fn read_coord(v: Option<&Value>) -> f32 {
    v.and_then(Value::as_f64)
        .filter(|f| f.is_finite())
        .map_or(0.0, |f| f.clamp(-1e9, 1e9) as f32)
}

fn finite_non_negative(v: &Value) -> f64 {
    v.as_f64().filter(|f| f.is_finite()).map_or(0.0, |f| f.max(0.0))
}
