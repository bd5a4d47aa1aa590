use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type GameId = String;

/// Phase of a single round, without the data each phase carries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseKind {
    Prompt,
    Posing,
    PosingComplete,
    Selecting,
    SelectionComplete,
    Explaining,
    ExplanationComplete,
}

/// Countdowns visible to the players
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TickKind {
    Posing,
    Explanation,
}

/// Scheduled callbacks owned by a game session, at most one of each kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-shot delay while the word is shown
    Prompt,
    /// One-second posing countdown
    Posing,
    /// Fast slot-machine spin before a draw settles
    Spin,
    /// One-shot pause after a draw settles
    Settle,
    /// One-second explanation countdown
    Explanation,
}

impl TimerKind {
    pub const ALL: [TimerKind; 5] = [
        TimerKind::Prompt,
        TimerKind::Posing,
        TimerKind::Spin,
        TimerKind::Settle,
        TimerKind::Explanation,
    ];

    /// Whether the timer fires repeatedly until cancelled
    pub fn is_repeating(self) -> bool {
        matches!(
            self,
            TimerKind::Posing | TimerKind::Spin | TimerKind::Explanation
        )
    }
}

/// What the view needs to render the current round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundSnapshot {
    pub round: u32,
    pub total_rounds: u32,
    pub phase: PhaseKind,
    pub word: String,
    pub selected: Vec<String>,
    pub players_per_round: u32,
    /// Index into `selected` of the player explaining (Explaining only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Runs the game: starts rounds, triggers selection and advances
    Host,
    /// Read-only screen showing the game
    Display,
}
