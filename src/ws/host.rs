//! Host-only command handlers
//!
//! Authorization is checked in the main dispatch layer before calling these.

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::session::Command;
use crate::settings::GameSettings;
use crate::state::AppState;
use std::sync::Arc;

fn game_error(e: &GameError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

pub async fn handle_start_game(state: &Arc<AppState>) -> Option<ServerMessage> {
    tracing::info!("Host starting a new game");
    match state.start_game().await {
        Ok(game_id) => Some(ServerMessage::GameStarted { game_id }),
        Err(e) => {
            tracing::warn!("Cannot start game: {}", e);
            Some(game_error(&e))
        }
    }
}

pub async fn handle_command(state: &Arc<AppState>, command: Command) -> Option<ServerMessage> {
    tracing::info!("Host command: {:?}", command);
    match state.dispatch(command).await {
        Ok(_) => None,
        Err(e) => Some(game_error(&e)),
    }
}

pub async fn handle_update_settings(
    state: &Arc<AppState>,
    settings: GameSettings,
) -> Option<ServerMessage> {
    match state.update_settings(settings).await {
        // Every client, this one included, gets the broadcast
        Ok(_) => None,
        Err(e) => {
            tracing::error!("Failed to save settings: {}", e);
            Some(ServerMessage::Error {
                code: "SETTINGS_ERROR".to_string(),
                msg: e.to_string(),
            })
        }
    }
}
