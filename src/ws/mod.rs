pub mod handlers;
pub mod host;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: role={:?}", params.role);

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Only `role=host` may control the game; everyone else watches
pub fn parse_role(role: Option<&str>) -> Role {
    match role {
        Some("host") => Role::Host,
        _ => Role::Display,
    }
}

pub async fn welcome(role: Role, state: &AppState) -> ServerMessage {
    ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        role,
        game_id: state.current_game_id().await,
        round: state.snapshot().await,
        settings: state.get_settings().await,
        server_now: chrono::Utc::now().to_rfc3339(),
    }
}

fn to_text<T: Serialize>(msg: &T) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            None
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let role = parse_role(params.role.as_deref());

    tracing::info!("WebSocket connected with role: {:?}", role);

    // Subscribe before the welcome so no event falls in between
    let mut broadcast_rx = state.broadcast.subscribe();
    let mut events_rx = state.events.subscribe();

    if let Some(msg) = to_text(&welcome(role, &state).await) {
        if sender.send(msg).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    loop {
        tokio::select! {
            // Settings and other messages for all clients
            broadcast_msg = broadcast_rx.recv() => {
                match broadcast_msg {
                    Ok(msg) => {
                        if let Some(text) = to_text(&msg) {
                            if sender.send(text).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Client lagging, skipped {} messages", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // Events of the running game
            event = events_rx.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(text) = to_text(&ServerMessage::GameEvent { event }) {
                            if sender.send(text).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Client lagging, skipped {} game events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &role, &state).await,
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(text) = response.as_ref().and_then(to_text) {
                            if sender.send(text).await.is_err() {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection closed for role: {:?}", role);
}
