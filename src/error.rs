//! Error types for the fallible edges of the core
//!
//! Corrupted input is never an error (it gets defaulted during
//! normalization). These cover resource limits, refused purchases and
//! transport failures.

use thiserror::Error;

/// Rejected grid snapshot; live grid state is left untouched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridLoadError {
    #[error("grid snapshot is not an object")]
    NotAnObject,
    #[error("grid dimensions missing or invalid")]
    InvalidDimensions,
    #[error("grid {cols}x{rows} exceeds limits")]
    TooLarge { cols: u64, rows: u64 },
    #[error("cell array `{field}` has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Rejected game snapshot (balls or grid)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot has {count} balls, limit is {limit}")]
    TooManyBalls { count: usize, limit: usize },
    #[error("snapshot has no grid")]
    MissingGrid,
    #[error(transparent)]
    Grid(#[from] GridLoadError),
}

/// Purchase refused; the player state is unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PurchaseError {
    #[error("not enough currency")]
    CannotAfford,
    #[error("already at max level")]
    MaxLevel,
    #[error("ball limit reached")]
    BallCap,
    #[error("upgrade is locked")]
    Locked,
    #[error("upgrade does not apply to this ball type")]
    NotApplicable,
}

/// Prestige refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PrestigeError {
    #[error("nothing to gain from prestige yet")]
    NoGain,
    #[error("reach level {required} first (currently {current})")]
    LevelTooLow { required: u32, current: u32 },
}

/// Export string could not be decoded
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import string is empty")]
    Empty,
    #[error("import string is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("import payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("import payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage backend failure (quota, permissions, private mode)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not serialize save: {0}")]
    Serialize(#[from] serde_json::Error),
}
