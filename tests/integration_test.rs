use pose_party::protocol::{ClientMessage, GameEvent, ServerMessage};
use pose_party::settings::GameSettings;
use pose_party::state::AppState;
use pose_party::types::{PhaseKind, RoundSnapshot, Role, TickKind};
use pose_party::ws::handlers::handle_message;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

fn party_settings() -> GameSettings {
    GameSettings {
        rounds: 2,
        players_per_round: 2,
        names: vec!["Alice".into(), "Bob".into(), "Charlie".into()],
        words: vec!["a cat".into(), "a robot".into()],
        posing_timer: 2,
        explanation_timer: 1,
        warmup_video: String::new(),
    }
}

async fn next_event(rx: &mut broadcast::Receiver<GameEvent>) -> GameEvent {
    loop {
        match rx.recv().await {
            Ok(event) => return event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("event stream closed"),
        }
    }
}

/// Skip events until the round enters `phase`
async fn wait_for_phase(rx: &mut broadcast::Receiver<GameEvent>, phase: PhaseKind) -> RoundSnapshot {
    loop {
        if let GameEvent::PhaseChanged { phase: p, round } = next_event(rx).await {
            if p == phase {
                return round;
            }
        }
    }
}

async fn host(state: &Arc<AppState>, msg: ClientMessage) -> Option<ServerMessage> {
    handle_message(msg, &Role::Host, state).await
}

fn expect_error(response: Option<ServerMessage>, expected: &str) {
    match response {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, expected),
        other => panic!("expected {expected} error, got {other:?}"),
    }
}

/// Drive one round from its prompt to ExplanationComplete, returning the players
async fn play_round(
    state: &Arc<AppState>,
    rx: &mut broadcast::Receiver<GameEvent>,
    settings: &GameSettings,
    number: u32,
) -> Vec<String> {
    let round = wait_for_phase(rx, PhaseKind::Prompt).await;
    assert_eq!(round.round, number);
    assert_eq!(round.total_rounds, settings.rounds);
    assert!(settings.words.contains(&round.word));
    assert!(round.selected.is_empty());

    // Posing counts down on its own
    wait_for_phase(rx, PhaseKind::Posing).await;
    let mut posing = Vec::new();
    loop {
        match next_event(rx).await {
            GameEvent::Tick {
                kind: TickKind::Posing,
                seconds_remaining,
            } => posing.push(seconds_remaining),
            GameEvent::PhaseChanged {
                phase: PhaseKind::PosingComplete,
                ..
            } => break,
            other => panic!("unexpected event while posing: {other:?}"),
        }
    }
    assert_eq!(posing, vec![2, 1, 0]);

    assert!(host(state, ClientMessage::BeginSelection).await.is_none());
    let mut picked = Vec::new();
    let mut progress = Vec::new();
    let round = loop {
        match next_event(rx).await {
            GameEvent::PlayerSelected { index, name } => {
                assert_eq!(index, picked.len());
                picked.push(name);
            }
            GameEvent::SelectionProgress { draw, total } => progress.push((draw, total)),
            GameEvent::PhaseChanged {
                phase: PhaseKind::SelectionComplete,
                round,
            } => break round,
            _ => {}
        }
    };
    assert_eq!(progress, vec![(1, 2), (2, 2)]);
    assert_eq!(round.selected, picked);
    assert_eq!(picked.iter().collect::<HashSet<_>>().len(), 2);

    assert!(host(state, ClientMessage::BeginExplanations).await.is_none());
    for index in 0..picked.len() {
        let round = wait_for_phase(rx, PhaseKind::Explaining).await;
        assert_eq!(round.explanation_index, Some(index));

        // Still counting down
        expect_error(
            host(state, ClientMessage::ProceedToNextPlayer).await,
            "INVALID_PHASE",
        );

        loop {
            if let GameEvent::Tick {
                kind: TickKind::Explanation,
                seconds_remaining: 0,
            } = next_event(rx).await
            {
                break;
            }
        }
        assert!(host(state, ClientMessage::ProceedToNextPlayer)
            .await
            .is_none());
    }

    let round = wait_for_phase(rx, PhaseKind::ExplanationComplete).await;
    assert_eq!(round.selected, picked);
    picked
}

/// End-to-end integration test for a complete game flow
#[tokio::test(start_paused = true)]
async fn test_full_game_flow() {
    let state = Arc::new(AppState::default());
    let settings = party_settings();

    assert!(host(
        &state,
        ClientMessage::UpdateSettings {
            settings: settings.clone()
        }
    )
    .await
    .is_none());

    let mut rx = state.events.subscribe();
    let game_id = match host(&state, ClientMessage::StartGame).await {
        Some(ServerMessage::GameStarted { game_id }) => game_id,
        other => panic!("Expected GameStarted, got {other:?}"),
    };
    assert_eq!(state.current_game_id().await, Some(game_id));

    // Round 1, then replay it
    let first = play_round(&state, &mut rx, &settings, 1).await;
    assert!(host(&state, ClientMessage::ReplayRound).await.is_none());
    let replayed = play_round(&state, &mut rx, &settings, 1).await;

    // Three names over two rounds: the replay must use the name left over
    let leftover: Vec<_> = settings
        .names
        .iter()
        .filter(|name| !first.contains(name))
        .collect();
    assert_eq!(leftover.len(), 1);
    assert!(replayed.contains(leftover[0]));

    assert!(host(&state, ClientMessage::AdvanceRound).await.is_none());
    play_round(&state, &mut rx, &settings, 2).await;

    // Last round: advancing ends the game
    assert!(host(&state, ClientMessage::AdvanceRound).await.is_none());
    loop {
        if next_event(&mut rx).await == GameEvent::GameEnded {
            break;
        }
    }

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert!(state.current_game_id().await.is_none());
    expect_error(host(&state, ClientMessage::AdvanceRound).await, "NO_GAME");
}

#[tokio::test(start_paused = true)]
async fn test_reroll_flow() {
    let state = Arc::new(AppState::default());
    let settings = party_settings();
    state.update_settings(settings.clone()).await.unwrap();

    let mut rx = state.events.subscribe();
    host(&state, ClientMessage::StartGame).await;
    wait_for_phase(&mut rx, PhaseKind::PosingComplete).await;

    // Selection controls are refused before selection finishes
    expect_error(
        host(&state, ClientMessage::RerollPlayer { index: 0 }).await,
        "INVALID_PHASE",
    );

    host(&state, ClientMessage::BeginSelection).await;
    let round = wait_for_phase(&mut rx, PhaseKind::SelectionComplete).await;

    assert!(host(&state, ClientMessage::RerollPlayer { index: 1 })
        .await
        .is_none());
    match next_event(&mut rx).await {
        GameEvent::PlayerRerolled {
            index,
            previous,
            replacement,
        } => {
            assert_eq!(index, 1);
            assert_eq!(previous, round.selected[1]);
            assert_ne!(replacement, previous);
            assert_ne!(replacement, round.selected[0]);
        }
        other => panic!("expected reroll, got {other:?}"),
    }

    expect_error(
        host(&state, ClientMessage::RerollPlayer { index: 2 }).await,
        "INVALID_INDEX",
    );

    assert!(host(&state, ClientMessage::RerollAllPlayers).await.is_none());
    wait_for_phase(&mut rx, PhaseKind::Selecting).await;
    let round = wait_for_phase(&mut rx, PhaseKind::SelectionComplete).await;
    assert_eq!(round.selected.len(), 2);
    assert_ne!(round.selected[0], round.selected[1]);

    // The host may stop at any point
    assert!(host(&state, ClientMessage::EndGame).await.is_none());
    assert_eq!(next_event(&mut rx).await, GameEvent::GameEnded);
}

#[tokio::test]
async fn test_start_game_with_invalid_settings() {
    let state = Arc::new(AppState::default());
    let mut settings = party_settings();
    settings.players_per_round = 4;
    state.update_settings(settings).await.unwrap();

    expect_error(host(&state, ClientMessage::StartGame).await, "SETUP_INVALID");
    assert!(state.current_game_id().await.is_none());
}

#[tokio::test]
async fn test_display_is_read_only() {
    let state = Arc::new(AppState::default());

    expect_error(
        handle_message(ClientMessage::StartGame, &Role::Display, &state).await,
        "UNAUTHORIZED",
    );
    match handle_message(ClientMessage::GetSettings, &Role::Display, &state).await {
        Some(ServerMessage::Settings { settings }) => {
            assert_eq!(settings, GameSettings::default())
        }
        other => panic!("expected settings, got {other:?}"),
    }
}
