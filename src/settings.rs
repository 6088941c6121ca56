//! Engine settings and limits
//!
//! Separate from the player save: these are the host's tuning knobs
//! (grid caps, generation shape, autosave cadence). Every field has a
//! default, so a partial JSON document is a valid settings file.

use serde::{Deserialize, Serialize};

use crate::sim::{GridLimits, PatternKind};

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    // === Limits ===
    /// Caps applied to generated and loaded grids
    pub grid_limits: GridLimits,
    /// Saved ball lists longer than this are rejected on load
    pub max_saved_balls: usize,

    // === Generation ===
    /// Hard ceiling on the filled share of the brick band
    pub max_fill_ratio: f64,
    /// Fraction of rows (from the top) that may hold bricks
    pub filled_rows_ratio: f64,
    /// Empty cells kept along the left, right and top edges
    pub empty_border: u32,
    pub noise_scale: f64,
    /// Every n-th level uses a structured pattern instead of noise (0 = never)
    pub pattern_every: u32,
    pub pattern_cycle: Vec<PatternKind>,

    // === Progression ===
    /// Level required before a star prestige is allowed
    pub star_prestige_min_level: u32,

    // === Session ===
    /// Largest frame delta the tick will simulate, in seconds
    pub max_frame_dt: f32,
    /// Seconds between autosaves (0 disables)
    pub autosave_interval_secs: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid_limits: GridLimits::default(),
            max_saved_balls: 500,

            max_fill_ratio: 0.7,
            filled_rows_ratio: 0.6,
            empty_border: 1,
            noise_scale: 0.35,
            pattern_every: 5,
            pattern_cycle: vec![
                PatternKind::Checker,
                PatternKind::Stripes,
                PatternKind::Diamond,
            ],

            star_prestige_min_level: 30,

            max_frame_dt: 0.05,
            autosave_interval_secs: 30.0,
        }
    }
}

impl Settings {
    /// Parse settings JSON; unknown keys are ignored, bad documents fall back to defaults
    pub fn from_json_str(json: &str) -> Self {
        match serde_json::from_str::<Settings>(json) {
            Ok(settings) => {
                log::info!("Loaded settings");
                settings.sanitized()
            }
            Err(e) => {
                log::warn!("Invalid settings ({e}), using defaults");
                Self::default()
            }
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Clamp every knob into a range the engine can run with
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        self.grid_limits.max_axis = self.grid_limits.max_axis.clamp(1, 1000);
        self.grid_limits.max_cells = self.grid_limits.max_cells.clamp(1, 1_000_000);
        self.max_fill_ratio = finite_or(self.max_fill_ratio, d.max_fill_ratio).clamp(0.0, 1.0);
        self.filled_rows_ratio =
            finite_or(self.filled_rows_ratio, d.filled_rows_ratio).clamp(0.0, 1.0);
        self.noise_scale = finite_or(self.noise_scale, d.noise_scale).clamp(0.01, 10.0);
        if self.pattern_cycle.is_empty() {
            self.pattern_every = 0;
        }
        self.max_frame_dt = if self.max_frame_dt.is_finite() {
            self.max_frame_dt.clamp(0.001, 0.25)
        } else {
            d.max_frame_dt
        };
        self.autosave_interval_secs = if self.autosave_interval_secs.is_finite() {
            self.autosave_interval_secs.max(0.0)
        } else {
            d.autosave_interval_secs
        };
        self
    }

    /// Generation pattern for a level
    pub fn pattern_for_level(&self, level: u32) -> PatternKind {
        if self.pattern_every == 0 || self.pattern_cycle.is_empty() || level % self.pattern_every != 0 {
            return PatternKind::Noise;
        }
        let n = (level / self.pattern_every).saturating_sub(1) as usize;
        self.pattern_cycle[n % self.pattern_cycle.len()]
    }
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}
