//! HTTP endpoints for the host's settings form, plus the router.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::settings::GameSettings;
use crate::state::AppState;
use crate::types::{GameId, RoundSnapshot};
use crate::ws;

#[derive(Debug, Clone, Serialize)]
pub struct CurrentGame {
    pub game_id: GameId,
    pub round: Option<RoundSnapshot>,
}

/// All routes served by the game
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .route("/api/settings", get(get_settings).put(put_settings))
        .route("/api/game", get(current_game))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

/// GET /api/settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<GameSettings> {
    Json(state.get_settings().await)
}

/// PUT /api/settings
///
/// Saves the settings and broadcasts them to connected clients. They are
/// validated when the next game starts.
pub async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<GameSettings>,
) -> Response {
    match state.update_settings(settings).await {
        Ok(saved) => Json(saved).into_response(),
        Err(e) => {
            tracing::error!("Saving settings failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Saving settings failed: {}", e),
            )
                .into_response()
        }
    }
}

/// GET /api/game
pub async fn current_game(State(state): State<Arc<AppState>>) -> Response {
    match state.current_game_id().await {
        Some(game_id) => Json(CurrentGame {
            game_id,
            round: state.snapshot().await,
        })
        .into_response(),
        None => (StatusCode::NOT_FOUND, "No game running").into_response(),
    }
}
