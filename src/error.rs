use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the streak engine and its stores
#[derive(Error, Debug)]
pub enum StreakError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    // Data availability errors
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for StreakError
pub type Result<T> = std::result::Result<T, StreakError>;

/// Reasons an entity is left out of a batch run.
///
/// These never abort the run; the slate reports them next to the
/// candidates that were scored.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("no slate entry for entity")]
    NotOnSlate,

    #[error("insufficient game logs: {count} < 3")]
    TooFewGames { count: usize },

    #[error("fewer than 3 usable values in series")]
    InsufficientSeries,

    #[error("no season line")]
    NoSeasonLine,

    #[error("games played is zero")]
    ZeroGamesPlayed,
}

impl From<SkipReason> for StreakError {
    fn from(reason: SkipReason) -> Self {
        StreakError::InsufficientData(reason.to_string())
    }
}
