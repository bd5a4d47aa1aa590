use crate::settings::GameSettings;
use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Validate settings and start round 1 (replaces any running game)
    StartGame,
    BeginSelection,
    RerollPlayer {
        index: usize,
    },
    RerollAllPlayers,
    BeginExplanations,
    /// Only accepted once the explanation timer has reached zero
    ProceedToNextPlayer,
    AdvanceRound,
    ReplayRound,
    EndGame,
    GetSettings,
    UpdateSettings {
        settings: GameSettings,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        game_id: Option<GameId>,
        round: Option<RoundSnapshot>,
        settings: GameSettings,
        server_now: String,
    },
    GameStarted {
        game_id: GameId,
    },
    Settings {
        settings: GameSettings,
    },
    GameEvent {
        event: GameEvent,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Events emitted by a running game for the view to render
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum GameEvent {
    PhaseChanged {
        phase: PhaseKind,
        round: RoundSnapshot,
    },
    Tick {
        kind: TickKind,
        seconds_remaining: u32,
    },
    /// Name shown by the slot machine before the draw settles
    SpinFrame {
        name: String,
    },
    PlayerSelected {
        index: usize,
        name: String,
    },
    /// `draw` players of `total` have been selected so far
    SelectionProgress {
        draw: usize,
        total: usize,
    },
    PlayerRerolled {
        index: usize,
        previous: String,
        replacement: String,
    },
    GameEnded,
}
