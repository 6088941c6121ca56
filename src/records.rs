//! Star prestige history
//!
//! Keeps the 10 best star prestige runs, ranked by stars gained.

use serde::{Deserialize, Serialize};

/// Maximum number of runs to keep
pub const MAX_RECORDS: usize = 10;

/// One finished star prestige run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarRun {
    /// Stars gained by the prestige
    pub stars: u64,
    /// Level reached before resetting
    pub level: u32,
    /// Length of the run in seconds
    pub run_time_secs: f64,
}

/// Best runs, sorted descending by stars
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StarRecords {
    entries: Vec<StarRun>,
}

impl StarRecords {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Rebuild from arbitrary entries: drops empty runs, sorts and truncates
    pub fn from_entries(mut entries: Vec<StarRun>) -> Self {
        entries.retain(|e| e.stars > 0);
        entries.sort_by(|a, b| b.stars.cmp(&a.stars));
        entries.truncate(MAX_RECORDS);
        Self { entries }
    }

    pub fn entries(&self) -> &[StarRun] {
        &self.entries
    }

    /// Check if a gain qualifies for the history
    pub fn qualifies(&self, stars: u64) -> bool {
        if stars == 0 {
            return false;
        }
        if self.entries.len() < MAX_RECORDS {
            return true;
        }
        self.entries.last().is_none_or(|e| stars > e.stars)
    }

    /// Record a run; returns the 1-indexed rank or None if it didn't qualify
    pub fn add_run(&mut self, run: StarRun) -> Option<usize> {
        if !self.qualifies(run.stars) {
            return None;
        }
        let pos = self.entries.iter().position(|e| run.stars > e.stars);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, run);
                i + 1
            }
            None => {
                self.entries.push(run);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_RECORDS);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<&StarRun> {
        self.entries.first()
    }
}

/// Format a run length as `1h 02m` / `3m 07s`
pub fn format_duration(secs: f64) -> String {
    let total = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    let (h, m, s) = (total / 3600, (total / 60) % 60, total % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else {
        format!("{m}m {s:02}s")
    }
}
