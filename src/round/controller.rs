use super::{Effect, Phase, RoundState, SelectionPools, Spin};
use crate::error::{GameError, GameResult, SetupError};
use crate::protocol::GameEvent;
use crate::selector;
use crate::settings::GameSettings;
use crate::types::{PhaseKind, RoundSnapshot, TickKind, TimerKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

/// Number of slot-machine frames shown before a draw settles
pub const SPIN_FRAMES: RangeInclusive<u32> = 20..=40;

/// Drives a game from the first prompt to the end of the last round
///
/// Operations called outside their phase are rejected with
/// [`GameError::InvalidPhase`] and leave the state untouched.
#[derive(Debug)]
pub struct RoundController {
    settings: GameSettings,
    rng: StdRng,
    pools: SelectionPools,
    round: Option<RoundState>,
    ended: bool,
}

impl RoundController {
    pub fn new(settings: GameSettings, rng: StdRng) -> Result<Self, SetupError> {
        settings.validate()?;
        Ok(Self {
            settings,
            rng,
            pools: SelectionPools::new(),
            round: None,
            ended: false,
        })
    }

    /// Build a controller with a fixed seed, or one from the OS when `None`
    pub fn with_seed(settings: GameSettings, seed: Option<u64>) -> Result<Self, SetupError> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(settings, rng)
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn round(&self) -> Option<&RoundState> {
        self.round.as_ref()
    }

    pub fn pools(&self) -> &SelectionPools {
        &self.pools
    }

    pub fn phase(&self) -> Option<PhaseKind> {
        self.round.as_ref().map(|r| r.phase.kind())
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn snapshot(&self) -> Option<RoundSnapshot> {
        self.round
            .as_ref()
            .map(|r| r.snapshot(self.settings.rounds, self.settings.players_per_round))
    }

    /// Start round 1
    pub fn start(&mut self) -> GameResult<Vec<Effect>> {
        if self.ended {
            return Err(GameError::GameEnded);
        }
        if self.round.is_some() {
            return Err(GameError::AlreadyStarted);
        }
        self.start_round()
    }

    /// (Re)start the current round with a fresh word and no players
    pub fn start_round(&mut self) -> GameResult<Vec<Effect>> {
        if self.ended {
            return Err(GameError::GameEnded);
        }

        let number = self.round.as_ref().map_or(1, |r| r.number);
        self.pools.begin_round();
        let word = self.pools.draw_word(&mut self.rng, &self.settings.words)?;
        tracing::info!("Round {} of {}: {:?}", number, self.settings.rounds, word);

        let round = RoundState::new(number, word);
        let mut effects = cancel_all();
        effects.push(phase_changed(&round, &self.settings));
        effects.push(Effect::StartTimer(TimerKind::Prompt));
        self.round = Some(round);
        Ok(effects)
    }

    /// The word has been shown long enough; start the posing countdown
    pub fn prompt_elapsed(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "start posing")?;
        expect(round, "start posing", PhaseKind::Prompt)?;

        let seconds = self.settings.posing_timer;
        round.phase = Phase::Posing { remaining: seconds };
        let mut effects = vec![
            phase_changed(round, &self.settings),
            tick(TickKind::Posing, seconds),
        ];
        if seconds == 0 {
            effects.extend(finish_posing(round, &self.settings));
        } else {
            effects.push(Effect::StartTimer(TimerKind::Posing));
        }
        Ok(effects)
    }

    pub fn tick_posing(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "tick posing")?;
        let remaining = match &mut round.phase {
            Phase::Posing { remaining } => {
                *remaining = remaining.saturating_sub(1);
                *remaining
            }
            other => return Err(invalid("tick posing", other)),
        };

        let mut effects = vec![tick(TickKind::Posing, remaining)];
        if remaining == 0 {
            effects.extend(finish_posing(round, &self.settings));
        }
        Ok(effects)
    }

    pub fn begin_selection(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "begin selection")?;
        expect(round, "begin selection", PhaseKind::PosingComplete)?;

        round.phase = Phase::Selecting {
            spin: Some(new_spin(&mut self.rng)),
        };
        Ok(vec![
            phase_changed(round, &self.settings),
            Effect::StartTimer(TimerKind::Spin),
        ])
    }

    /// Advance the slot machine by one frame, settling the draw at its target
    pub fn spin_tick(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "spin")?;
        let settled = match &mut round.phase {
            Phase::Selecting { spin: Some(spin) } => {
                spin.frames += 1;
                spin.frames >= spin.target
            }
            other => return Err(invalid("spin", other)),
        };

        let mut effects = Vec::new();
        let shown = selector::pick_spin_name(
            &mut self.rng,
            &self.settings.names,
            &self.pools.excluded_names(),
        );
        if let Some(name) = shown {
            effects.push(Effect::Emit(GameEvent::SpinFrame {
                name: name.to_string(),
            }));
        }

        if settled {
            effects.extend(self.draw_next_player()?);
        }
        Ok(effects)
    }

    /// Draw one player for this round and pause before the next draw
    pub fn draw_next_player(&mut self) -> GameResult<Vec<Effect>> {
        let total = self.settings.players_per_round as usize;
        let round = active(&mut self.round, self.ended, "draw a player")?;
        expect(round, "draw a player", PhaseKind::Selecting)?;
        if round.selected.len() >= total {
            return Err(GameError::SelectionFull(total));
        }

        let name = self.pools.draw_player(&mut self.rng, &self.settings.names)?;
        round.selected.push(name.clone());
        round.phase = Phase::Selecting { spin: None };

        let index = round.selected.len() - 1;
        tracing::info!("Selected player {} of {}: {}", index + 1, total, name);

        Ok(vec![
            Effect::CancelTimer(TimerKind::Spin),
            Effect::Emit(GameEvent::PlayerSelected { index, name }),
            Effect::Emit(GameEvent::SelectionProgress {
                draw: index + 1,
                total,
            }),
            Effect::StartTimer(TimerKind::Settle),
        ])
    }

    /// The pause after a settled draw is over
    pub fn settle_elapsed(&mut self) -> GameResult<Vec<Effect>> {
        let total = self.settings.players_per_round as usize;
        let round = active(&mut self.round, self.ended, "finish a draw")?;
        match &round.phase {
            Phase::Selecting { spin: None } => {}
            other => return Err(invalid("finish a draw", other)),
        }

        if round.selected.len() < total {
            round.phase = Phase::Selecting {
                spin: Some(new_spin(&mut self.rng)),
            };
            Ok(vec![Effect::StartTimer(TimerKind::Spin)])
        } else {
            round.phase = Phase::SelectionComplete;
            Ok(vec![phase_changed(round, &self.settings)])
        }
    }

    /// Replace one selected player, leaving the others in place
    pub fn reroll_player(&mut self, index: usize) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "reroll a player")?;
        expect(round, "reroll a player", PhaseKind::SelectionComplete)?;

        let len = round.selected.len();
        if index >= len {
            return Err(GameError::PlayerIndexOutOfRange { index, len });
        }

        let previous = round.selected[index].clone();
        let others: Vec<String> = round
            .selected
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, name)| name.clone())
            .collect();
        let replacement = self.pools.draw_replacement(
            &mut self.rng,
            &self.settings.names,
            &others,
            &previous,
        )?;
        round.selected[index] = replacement.clone();
        tracing::info!("Rerolled player {}: {} -> {}", index + 1, previous, replacement);

        Ok(vec![Effect::Emit(GameEvent::PlayerRerolled {
            index,
            previous,
            replacement,
        })])
    }

    /// Discard every selected player and draw them all again
    pub fn reroll_all_players(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "reroll all players")?;
        expect(round, "reroll all players", PhaseKind::SelectionComplete)?;

        for name in round.selected.drain(..) {
            self.pools.release(&name);
        }
        tracing::info!("Rerolling all players for round {}", round.number);

        round.phase = Phase::Selecting {
            spin: Some(new_spin(&mut self.rng)),
        };
        Ok(vec![
            phase_changed(round, &self.settings),
            Effect::StartTimer(TimerKind::Spin),
        ])
    }

    pub fn begin_explanations(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "begin explanations")?;
        expect(round, "begin explanations", PhaseKind::SelectionComplete)?;

        Ok(start_explanation(round, 0, &self.settings))
    }

    /// Count down the explanation timer; reaching zero arms [`Self::proceed_to_next_player`]
    pub fn tick_explanation(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "tick explanation")?;
        let remaining = match &mut round.phase {
            Phase::Explaining { remaining, .. } => remaining,
            other => return Err(invalid("tick explanation", other)),
        };

        if *remaining == 0 {
            return Ok(vec![Effect::CancelTimer(TimerKind::Explanation)]);
        }
        *remaining -= 1;

        let mut effects = vec![tick(TickKind::Explanation, *remaining)];
        if *remaining == 0 {
            effects.push(Effect::CancelTimer(TimerKind::Explanation));
        }
        Ok(effects)
    }

    pub fn proceed_to_next_player(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "proceed to the next player")?;
        let (index, remaining) = match round.phase {
            Phase::Explaining { index, remaining } => (index, remaining),
            ref other => return Err(invalid("proceed to the next player", other)),
        };
        if remaining > 0 {
            return Err(GameError::ExplanationRunning(remaining));
        }

        let next = index + 1;
        if next < round.selected.len() {
            return Ok(start_explanation(round, next, &self.settings));
        }

        round.phase = Phase::ExplanationComplete;
        Ok(vec![
            Effect::CancelTimer(TimerKind::Explanation),
            phase_changed(round, &self.settings),
        ])
    }

    /// Move on to the next round, or end the game after the last one
    pub fn advance_round(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "advance the round")?;
        expect(round, "advance the round", PhaseKind::ExplanationComplete)?;

        if round.number < self.settings.rounds {
            round.number += 1;
            self.start_round()
        } else {
            Ok(self.finish())
        }
    }

    /// Play the current round again without counting it
    pub fn replay_round(&mut self) -> GameResult<Vec<Effect>> {
        let round = active(&mut self.round, self.ended, "replay the round")?;
        expect(round, "replay the round", PhaseKind::ExplanationComplete)?;

        self.start_round()
    }

    /// Stop the game from any phase
    pub fn end_game(&mut self) -> GameResult<Vec<Effect>> {
        if self.ended {
            return Err(GameError::GameEnded);
        }
        Ok(self.finish())
    }

    fn finish(&mut self) -> Vec<Effect> {
        tracing::info!("Game ended");
        self.ended = true;
        let mut effects = cancel_all();
        effects.push(Effect::Emit(GameEvent::GameEnded));
        effects
    }
}

fn active<'a>(
    round: &'a mut Option<RoundState>,
    ended: bool,
    action: &'static str,
) -> GameResult<&'a mut RoundState> {
    if ended {
        return Err(GameError::GameEnded);
    }
    round.as_mut().ok_or(GameError::NoActiveRound(action))
}

fn expect(round: &RoundState, action: &'static str, kind: PhaseKind) -> GameResult<()> {
    if round.phase.kind() == kind {
        Ok(())
    } else {
        Err(invalid(action, &round.phase))
    }
}

fn invalid(action: &'static str, phase: &Phase) -> GameError {
    GameError::InvalidPhase {
        action,
        phase: phase.kind(),
    }
}

fn new_spin(rng: &mut StdRng) -> Spin {
    Spin {
        frames: 0,
        target: rng.random_range(SPIN_FRAMES),
    }
}

fn finish_posing(round: &mut RoundState, settings: &GameSettings) -> Vec<Effect> {
    round.phase = Phase::PosingComplete;
    vec![
        Effect::CancelTimer(TimerKind::Posing),
        phase_changed(round, settings),
    ]
}

fn start_explanation(round: &mut RoundState, index: usize, settings: &GameSettings) -> Vec<Effect> {
    let seconds = settings.explanation_timer;
    round.phase = Phase::Explaining {
        index,
        remaining: seconds,
    };
    tracing::debug!(
        "Explanation {} of {}: {}",
        index + 1,
        round.selected.len(),
        round.selected[index]
    );

    let mut effects = vec![
        phase_changed(round, settings),
        tick(TickKind::Explanation, seconds),
    ];
    if seconds > 0 {
        effects.push(Effect::StartTimer(TimerKind::Explanation));
    }
    effects
}

fn phase_changed(round: &RoundState, settings: &GameSettings) -> Effect {
    let phase = round.phase.kind();
    tracing::info!("Round {} phase: {:?}", round.number, phase);
    Effect::Emit(GameEvent::PhaseChanged {
        phase,
        round: round.snapshot(settings.rounds, settings.players_per_round),
    })
}

fn tick(kind: TickKind, seconds_remaining: u32) -> Effect {
    Effect::Emit(GameEvent::Tick {
        kind,
        seconds_remaining,
    })
}

fn cancel_all() -> Vec<Effect> {
    TimerKind::ALL
        .iter()
        .map(|kind| Effect::CancelTimer(*kind))
        .collect()
}
