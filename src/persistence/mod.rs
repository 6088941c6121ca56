//! Save/load persistence and export strings
//!
//! Features:
//! - Pluggable string storage (`Storage`)
//! - Loads always normalize, so a garbled save degrades to defaults
//! - Base64 export/import of the whole save document
//! - Interval autosave

pub mod storage;

pub use storage::{FileStorage, MemoryStorage, Storage};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::economy::{PlayerState, normalize_with};
use crate::error::{ImportError, StorageError};
use crate::session::Session;
use crate::settings::Settings;

/// Storage key for the player save
pub const SAVE_KEY: &str = "idle-breakout-save";

/// Serialize and store a save; failures are logged, never fatal
pub fn save_player(storage: &mut dyn Storage, player: &PlayerState) -> bool {
    let result = serde_json::to_string(player)
        .map_err(StorageError::from)
        .and_then(|json| storage.write(SAVE_KEY, &json));
    match result {
        Ok(()) => {
            log::debug!("Saved player (level {})", player.progress.level);
            true
        }
        Err(e) => {
            log::warn!("Save failed: {e}");
            false
        }
    }
}

/// Save the session including its live playfield
pub fn save_session(storage: &mut dyn Storage, session: &Session) -> bool {
    save_player(storage, &session.build_snapshot())
}

/// Load and normalize the stored save
///
/// A missing, unreadable or unparseable save yields a fresh player.
pub fn load_player(storage: &dyn Storage, settings: &Settings) -> PlayerState {
    let raw = match storage.read(SAVE_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<Value>(&json) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Save is not valid JSON ({e}), starting fresh");
                Value::Null
            }
        },
        Ok(None) => {
            log::info!("No save found, starting fresh");
            Value::Null
        }
        Err(e) => {
            log::warn!("Could not read save ({e}), starting fresh");
            Value::Null
        }
    };
    normalize_with(&raw, settings)
}

/// Base64 of the save JSON
pub fn export_string(player: &PlayerState) -> Result<String, StorageError> {
    let json = serde_json::to_string(player)?;
    Ok(STANDARD.encode(json))
}

/// Decode an export string; the payload is normalized like any other save
pub fn import_string(input: &str, settings: &Settings) -> Result<PlayerState, ImportError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ImportError::Empty);
    }
    let bytes = STANDARD.decode(trimmed)?;
    let json = String::from_utf8(bytes)?;
    let raw: Value = serde_json::from_str(&json)?;
    Ok(normalize_with(&raw, settings))
}

/// Interval timer for autosaves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Autosave {
    pub interval_secs: f32,
    elapsed: f32,
}

impl Autosave {
    /// Zero or negative intervals never fire
    pub fn new(interval_secs: f32) -> Self {
        Self {
            interval_secs,
            elapsed: 0.0,
        }
    }

    /// Add frame time; true when a save is due
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.interval_secs.is_nan() || self.interval_secs <= 0.0 || !dt.is_finite() {
            return false;
        }
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.interval_secs {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}
