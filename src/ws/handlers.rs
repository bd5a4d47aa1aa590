//! WebSocket message dispatch
//!
//! Authorization is checked here, then host commands go to [`super::host`].

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::Command;
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::host;

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($role:expr, $action:expr) => {
        if *$role != Role::Host {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only host can {}", $action),
            });
        }
    };
}

/// Handle client messages and return optional response
///
/// Game commands answer nothing on success; their effect reaches every
/// client as game events.
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::GetSettings => Some(ServerMessage::Settings {
            settings: state.get_settings().await,
        }),

        ClientMessage::UpdateSettings { settings } => {
            check_host!(role, "change settings");
            host::handle_update_settings(state, settings).await
        }

        ClientMessage::StartGame => {
            check_host!(role, "start the game");
            host::handle_start_game(state).await
        }

        ClientMessage::BeginSelection => {
            check_host!(role, "begin selection");
            host::handle_command(state, Command::BeginSelection).await
        }

        ClientMessage::RerollPlayer { index } => {
            check_host!(role, "reroll players");
            host::handle_command(state, Command::RerollPlayer(index)).await
        }

        ClientMessage::RerollAllPlayers => {
            check_host!(role, "reroll players");
            host::handle_command(state, Command::RerollAllPlayers).await
        }

        ClientMessage::BeginExplanations => {
            check_host!(role, "begin explanations");
            host::handle_command(state, Command::BeginExplanations).await
        }

        ClientMessage::ProceedToNextPlayer => {
            check_host!(role, "proceed to the next player");
            host::handle_command(state, Command::ProceedToNextPlayer).await
        }

        ClientMessage::AdvanceRound => {
            check_host!(role, "advance rounds");
            host::handle_command(state, Command::AdvanceRound).await
        }

        ClientMessage::ReplayRound => {
            check_host!(role, "replay rounds");
            host::handle_command(state, Command::ReplayRound).await
        }

        ClientMessage::EndGame => {
            check_host!(role, "end the game");
            host::handle_command(state, Command::EndGame).await
        }
    }
}
