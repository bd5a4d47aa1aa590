use crate::types::{PhaseKind, RoundSnapshot};

/// Slot-machine progress for the draw currently spinning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spin {
    pub frames: u32,
    /// Frames to show before the draw settles
    pub target: u32,
}

/// Phase of a round, carrying only the data valid in that phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Prompt,
    Posing {
        remaining: u32,
    },
    PosingComplete,
    /// `spin` is `None` while pausing between settled draws
    Selecting {
        spin: Option<Spin>,
    },
    SelectionComplete,
    Explaining {
        index: usize,
        remaining: u32,
    },
    ExplanationComplete,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Prompt => PhaseKind::Prompt,
            Phase::Posing { .. } => PhaseKind::Posing,
            Phase::PosingComplete => PhaseKind::PosingComplete,
            Phase::Selecting { .. } => PhaseKind::Selecting,
            Phase::SelectionComplete => PhaseKind::SelectionComplete,
            Phase::Explaining { .. } => PhaseKind::Explaining,
            Phase::ExplanationComplete => PhaseKind::ExplanationComplete,
        }
    }
}

/// State of the round in progress; rebuilt at the start of every round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    pub number: u32,
    pub word: String,
    pub selected: Vec<String>,
    pub phase: Phase,
}

impl RoundState {
    pub fn new(number: u32, word: String) -> Self {
        Self {
            number,
            word,
            selected: Vec::new(),
            phase: Phase::Prompt,
        }
    }

    pub fn snapshot(&self, total_rounds: u32, players_per_round: u32) -> RoundSnapshot {
        let explanation_index = match self.phase {
            Phase::Explaining { index, .. } => Some(index),
            _ => None,
        };

        RoundSnapshot {
            round: self.number,
            total_rounds,
            phase: self.phase.kind(),
            word: self.word.clone(),
            selected: self.selected.clone(),
            players_per_round,
            explanation_index,
        }
    }
}
