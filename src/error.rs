use crate::types::PhaseKind;

/// Result type for round controller operations
pub type GameResult<T> = Result<T, GameError>;

/// Settings that must hold before a game may start
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("Please add some names in Settings first")]
    NoNames,

    #[error("Please add some words in Settings first")]
    NoWords,

    #[error("A game needs at least one round")]
    NoRounds,

    #[error("At least one player must be selected per round")]
    NoPlayersPerRound,

    #[error("Cannot select {per_round} players per round from {available} distinct names")]
    TooManyPlayersPerRound { per_round: u32, available: usize },
}

/// Errors raised by the round controller and the session that drives it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Cannot {action} during {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: PhaseKind,
    },

    #[error("Cannot {0} before the first round has started")]
    NoActiveRound(&'static str),

    #[error("Player index {index} out of range ({len} selected)")]
    PlayerIndexOutOfRange { index: usize, len: usize },

    #[error("All {0} players for this round are already selected")]
    SelectionFull(usize),

    #[error("Explanation timer still running ({0}s left)")]
    ExplanationRunning(u32),

    #[error("Game has already started")]
    AlreadyStarted,

    #[error("Game has ended")]
    GameEnded,

    #[error("No active game")]
    NoActiveGame,

    #[error("Game session is no longer running")]
    SessionClosed,

    #[error(transparent)]
    Setup(#[from] SetupError),
}

impl GameError {
    /// Stable error code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidPhase { .. }
            | GameError::NoActiveRound(_)
            | GameError::SelectionFull(_)
            | GameError::ExplanationRunning(_)
            | GameError::AlreadyStarted => "INVALID_PHASE",
            GameError::PlayerIndexOutOfRange { .. } => "INVALID_INDEX",
            GameError::GameEnded | GameError::NoActiveGame | GameError::SessionClosed => {
                "NO_GAME"
            }
            GameError::Setup(_) => "SETUP_INVALID",
        }
    }
}

/// Errors from the persisted settings store
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to access settings file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Settings file {path} is not a JSON object of strings: {source}")]
    Parse {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
