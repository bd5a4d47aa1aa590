//! Game session: one task, one ordered input stream
//!
//! Host commands and timer expiries are queued on the same channel and
//! applied to the [`RoundController`] one at a time. Each timer kind has at
//! most one running task; starting a timer aborts the previous one of the
//! same kind, and a generation number makes sure an expiry that was already
//! queued when its timer got cancelled is dropped instead of applied.
//!
//! Shutdown is flagged synchronously on the handle. Inputs still queued at
//! that point are discarded, so a replaced game never emits again.

use crate::error::{GameError, GameResult};
use crate::protocol::GameEvent;
use crate::round::{Effect, RoundController};
use crate::types::{GameId, RoundSnapshot, TimerKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How long the scheduled steps of a round take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Time the word is shown before posing starts
    pub prompt_delay: Duration,
    /// Pause after each settled draw
    pub settle_pause: Duration,
    /// Countdown step for the posing and explanation timers
    pub tick: Duration,
    pub spin_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            prompt_delay: Duration::from_secs(2),
            settle_pause: Duration::from_secs(1),
            tick: Duration::from_secs(1),
            spin_interval: Duration::from_millis(100),
        }
    }
}

impl Pacing {
    fn period(&self, kind: TimerKind) -> Duration {
        match kind {
            TimerKind::Prompt => self.prompt_delay,
            TimerKind::Settle => self.settle_pause,
            TimerKind::Posing | TimerKind::Explanation => self.tick,
            TimerKind::Spin => self.spin_interval,
        }
    }
}

/// Host actions accepted by a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    BeginSelection,
    RerollPlayer(usize),
    RerollAllPlayers,
    BeginExplanations,
    ProceedToNextPlayer,
    AdvanceRound,
    ReplayRound,
    EndGame,
    /// Read the current round without changing it
    Snapshot,
}

#[derive(Debug)]
enum SessionInput {
    Command {
        command: Command,
        reply: oneshot::Sender<GameResult<Option<RoundSnapshot>>>,
    },
    TimerFired {
        kind: TimerKind,
        generation: u64,
    },
    Shutdown,
}

/// Cheap handle for talking to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: GameId,
    tx: mpsc::UnboundedSender<SessionInput>,
    shut_down: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// Apply a command and return the round as it stands afterwards
    pub async fn send(&self, command: Command) -> GameResult<Option<RoundSnapshot>> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(GameError::SessionClosed);
        }
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SessionInput::Command { command, reply })
            .map_err(|_| GameError::SessionClosed)?;
        response.await.map_err(|_| GameError::SessionClosed)?
    }

    /// Stop the session; no event is emitted once this returns
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        // Wake the task so it drops its timers
        let _ = self.tx.send(SessionInput::Shutdown);
    }

    pub fn is_closed(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

struct RunningTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// At most one scheduled task per timer kind
struct Timers {
    tx: mpsc::WeakUnboundedSender<SessionInput>,
    pacing: Pacing,
    running: HashMap<TimerKind, RunningTimer>,
    generation: u64,
}

impl Timers {
    fn new(tx: mpsc::WeakUnboundedSender<SessionInput>, pacing: Pacing) -> Self {
        Self {
            tx,
            pacing,
            running: HashMap::new(),
            generation: 0,
        }
    }

    fn start(&mut self, kind: TimerKind) {
        self.cancel(kind);
        self.generation += 1;
        let generation = self.generation;
        let period = self.pacing.period(kind);
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            if kind.is_repeating() {
                let period = period.max(Duration::from_millis(1));
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                loop {
                    interval.tick().await;
                    let Some(tx) = tx.upgrade() else { break };
                    if tx.send(SessionInput::TimerFired { kind, generation }).is_err() {
                        break;
                    }
                }
            } else {
                tokio::time::sleep(period).await;
                if let Some(tx) = tx.upgrade() {
                    let _ = tx.send(SessionInput::TimerFired { kind, generation });
                }
            }
        });

        self.running.insert(kind, RunningTimer { generation, handle });
    }

    fn cancel(&mut self, kind: TimerKind) {
        if let Some(timer) = self.running.remove(&kind) {
            timer.handle.abort();
        }
    }

    fn cancel_all(&mut self) {
        for (_, timer) in self.running.drain() {
            timer.handle.abort();
        }
    }

    /// Whether an expiry belongs to the live timer of its kind
    fn accept(&mut self, kind: TimerKind, generation: u64) -> bool {
        match self.running.get(&kind) {
            Some(timer) if timer.generation == generation => {
                if !kind.is_repeating() {
                    self.running.remove(&kind);
                }
                true
            }
            _ => false,
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

pub struct Session {
    id: GameId,
    controller: RoundController,
    timers: Timers,
    events: broadcast::Sender<GameEvent>,
    rx: mpsc::UnboundedReceiver<SessionInput>,
    shut_down: Arc<AtomicBool>,
}

impl Session {
    /// Start round 1 on a new task and return its handle
    ///
    /// Subscribe to `events` before calling this to see the first prompt.
    pub fn spawn(
        controller: RoundController,
        pacing: Pacing,
        events: broadcast::Sender<GameEvent>,
    ) -> SessionHandle {
        let (session, handle) = Session::new(controller, pacing, events);
        tokio::spawn(session.run());
        handle
    }

    fn new(
        controller: RoundController,
        pacing: Pacing,
        events: broadcast::Sender<GameEvent>,
    ) -> (Session, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ulid::Ulid::new().to_string();
        let shut_down = Arc::new(AtomicBool::new(false));
        let session = Session {
            id: id.clone(),
            controller,
            timers: Timers::new(tx.downgrade(), pacing),
            events,
            rx,
            shut_down: shut_down.clone(),
        };

        (session, SessionHandle { id, tx, shut_down })
    }

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    async fn run(mut self) {
        if self.is_shut_down() {
            tracing::info!("Session {} shut down before starting", self.id);
            return;
        }

        tracing::info!("Session {} started", self.id);
        match self.controller.start() {
            Ok(effects) => self.apply(effects),
            Err(e) => {
                tracing::error!("Session {} failed to start: {}", self.id, e);
                return;
            }
        }

        while let Some(input) = self.rx.recv().await {
            if self.is_shut_down() {
                tracing::info!("Session {} shut down", self.id);
                break;
            }

            match input {
                SessionInput::Command { command, reply } => {
                    tracing::debug!("Session {} command: {:?}", self.id, command);
                    let result = self.handle_command(command);
                    if let Err(e) = &result {
                        tracing::warn!("Rejected command: {}", e);
                    }
                    let _ = reply.send(result);
                }
                SessionInput::TimerFired { kind, generation } => {
                    if !self.timers.accept(kind, generation) {
                        tracing::trace!("Dropping stale {:?} timer #{}", kind, generation);
                        continue;
                    }
                    match self.fire(kind) {
                        Ok(effects) => self.apply(effects),
                        Err(e) => tracing::warn!("{:?} timer rejected: {}", kind, e),
                    }
                }
                SessionInput::Shutdown => {
                    tracing::info!("Session {} shut down", self.id);
                    break;
                }
            }

            if self.controller.is_ended() {
                tracing::info!("Session {} finished", self.id);
                break;
            }
        }

        self.timers.cancel_all();
    }

    fn handle_command(&mut self, command: Command) -> GameResult<Option<RoundSnapshot>> {
        let controller = &mut self.controller;
        let effects = match command {
            Command::BeginSelection => controller.begin_selection(),
            Command::RerollPlayer(index) => controller.reroll_player(index),
            Command::RerollAllPlayers => controller.reroll_all_players(),
            Command::BeginExplanations => controller.begin_explanations(),
            Command::ProceedToNextPlayer => controller.proceed_to_next_player(),
            Command::AdvanceRound => controller.advance_round(),
            Command::ReplayRound => controller.replay_round(),
            Command::EndGame => controller.end_game(),
            Command::Snapshot => Ok(Vec::new()),
        }?;

        self.apply(effects);
        Ok(self.controller.snapshot())
    }

    fn fire(&mut self, kind: TimerKind) -> GameResult<Vec<Effect>> {
        match kind {
            TimerKind::Prompt => self.controller.prompt_elapsed(),
            TimerKind::Posing => self.controller.tick_posing(),
            TimerKind::Spin => self.controller.spin_tick(),
            TimerKind::Settle => self.controller.settle_elapsed(),
            TimerKind::Explanation => self.controller.tick_explanation(),
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                // No subscribers is fine
                Effect::Emit(event) => {
                    if self.is_shut_down() {
                        tracing::trace!("Session {} shut down, dropping {:?}", self.id, event);
                        continue;
                    }
                    let _ = self.events.send(event);
                }
                Effect::StartTimer(kind) => self.timers.start(kind),
                Effect::CancelTimer(kind) => self.timers.cancel(kind),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GameSettings;
    use crate::types::{PhaseKind, TickKind};
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn settings(rounds: u32, per_round: u32) -> GameSettings {
        GameSettings {
            rounds,
            players_per_round: per_round,
            names: vec!["A".into(), "B".into(), "C".into()],
            words: vec!["X".into()],
            posing_timer: 3,
            explanation_timer: 2,
            warmup_video: String::new(),
        }
    }

    fn spawn(
        settings: GameSettings,
    ) -> (
        SessionHandle,
        broadcast::Sender<GameEvent>,
        broadcast::Receiver<GameEvent>,
    ) {
        let (events, rx) = broadcast::channel(256);
        let controller = RoundController::with_seed(settings, Some(17)).unwrap();
        let handle = Session::spawn(controller, Pacing::default(), events.clone());
        (handle, events, rx)
    }

    async fn wait_for(
        rx: &mut broadcast::Receiver<GameEvent>,
        matches: impl Fn(&GameEvent) -> bool,
    ) -> GameEvent {
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event stream closed"),
            }
        }
    }

    fn is_phase(event: &GameEvent, want: PhaseKind) -> bool {
        matches!(event, GameEvent::PhaseChanged { phase, .. } if *phase == want)
    }

    #[tokio::test(start_paused = true)]
    async fn test_posing_countdown_timing() {
        let (_handle, _events, mut rx) = spawn(settings(1, 1));

        wait_for(&mut rx, |e| is_phase(e, PhaseKind::Prompt)).await;
        let prompt_at = Instant::now();
        wait_for(&mut rx, |e| is_phase(e, PhaseKind::Posing)).await;
        let posing_at = Instant::now();
        assert_eq!(posing_at - prompt_at, Duration::from_secs(2));

        let mut remaining = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                GameEvent::Tick {
                    kind: TickKind::Posing,
                    seconds_remaining,
                } => remaining.push(seconds_remaining),
                event if is_phase(&event, PhaseKind::PosingComplete) => break,
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(remaining, vec![3, 2, 1, 0]);
        assert_eq!(Instant::now() - posing_at, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_posing_is_silent() {
        let (handle, _events, mut rx) = spawn(settings(1, 1));

        wait_for(&mut rx, |e| {
            matches!(
                e,
                GameEvent::Tick {
                    seconds_remaining: 2,
                    ..
                }
            )
        })
        .await;
        handle.shutdown();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(TryRecvError::Empty | TryRecvError::Closed)
        ));
        assert_eq!(
            handle.send(Command::Snapshot).await,
            Err(GameError::SessionClosed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_start_is_silent() {
        let (handle, _events, mut rx) = spawn(settings(1, 1));
        handle.shutdown();
        assert!(handle.is_closed());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(matches!(
            rx.try_recv(),
            Err(TryRecvError::Empty | TryRecvError::Closed)
        ));
        assert_eq!(
            handle.send(Command::Snapshot).await,
            Err(GameError::SessionClosed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_inputs_queued_before_shutdown_are_dropped() {
        let (events, mut rx) = broadcast::channel(16);
        let controller = RoundController::with_seed(settings(1, 1), Some(3)).unwrap();
        let (mut session, handle) = Session::new(controller, Pacing::default(), events.clone());

        // Round 1 is running and its prompt delay has already expired
        let effects = session.controller.start().unwrap();
        session.apply(effects);
        while rx.try_recv().is_ok() {}
        let generation = session.timers.generation;
        handle
            .tx
            .send(SessionInput::TimerFired {
                kind: TimerKind::Prompt,
                generation,
            })
            .unwrap();
        let (reply, response) = oneshot::channel();
        handle
            .tx
            .send(SessionInput::Command {
                command: Command::EndGame,
                reply,
            })
            .unwrap();

        handle.shutdown();
        session.run().await;

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert!(response.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_round_through_session() {
        let (handle, _events, mut rx) = spawn(settings(1, 2));

        wait_for(&mut rx, |e| is_phase(e, PhaseKind::PosingComplete)).await;
        assert_eq!(
            handle.send(Command::BeginExplanations).await,
            Err(GameError::InvalidPhase {
                action: "begin explanations",
                phase: PhaseKind::PosingComplete
            })
        );

        handle.send(Command::BeginSelection).await.unwrap();
        let mut frames = 0;
        let mut progress = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                GameEvent::SpinFrame { .. } => frames += 1,
                GameEvent::SelectionProgress { draw, total } => progress.push((draw, total)),
                event if is_phase(&event, PhaseKind::SelectionComplete) => break,
                _ => {}
            }
        }
        assert!(frames >= 40, "only {frames} spin frames");
        assert_eq!(progress, vec![(1, 2), (2, 2)]);

        let round = handle.send(Command::BeginExplanations).await.unwrap().unwrap();
        assert_eq!(round.phase, PhaseKind::Explaining);
        assert_eq!(round.explanation_index, Some(0));

        for expected_index in 0..2 {
            wait_for(&mut rx, |e| {
                matches!(
                    e,
                    GameEvent::Tick {
                        kind: TickKind::Explanation,
                        seconds_remaining: 0
                    }
                )
            })
            .await;
            let round = handle.send(Command::Snapshot).await.unwrap().unwrap();
            assert_eq!(round.explanation_index, Some(expected_index));
            handle.send(Command::ProceedToNextPlayer).await.unwrap();
        }

        wait_for(&mut rx, |e| is_phase(e, PhaseKind::ExplanationComplete)).await;
        handle.send(Command::AdvanceRound).await.unwrap();
        assert_eq!(
            wait_for(&mut rx, |e| matches!(e, GameEvent::GameEnded)).await,
            GameEvent::GameEnded
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarting_timer_replaces_previous() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx.downgrade(), Pacing::default());

        timers.start(TimerKind::Posing);
        timers.start(TimerKind::Posing);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let mut fired = Vec::new();
        while let Ok(input) = rx.try_recv() {
            if let SessionInput::TimerFired { kind, generation } = input {
                fired.push((kind, generation));
            }
        }
        assert_eq!(fired, vec![(TimerKind::Posing, 2)]);
        assert!(timers.accept(TimerKind::Posing, 2));
        assert!(!timers.accept(TimerKind::Posing, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx.downgrade(), Pacing::default());

        timers.start(TimerKind::Prompt);
        timers.start(TimerKind::Explanation);
        timers.cancel(TimerKind::Prompt);
        timers.cancel_all();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(rx.try_recv().is_err());
        assert!(!timers.accept(TimerKind::Explanation, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_timer_accepted_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx.downgrade(), Pacing::default());

        timers.start(TimerKind::Settle);
        let Some(SessionInput::TimerFired { kind, generation }) = rx.recv().await else {
            panic!("settle timer did not fire");
        };
        assert_eq!(kind, TimerKind::Settle);
        assert!(timers.accept(kind, generation));
        assert!(!timers.accept(kind, generation));
    }
}
