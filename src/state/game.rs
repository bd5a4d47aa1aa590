use super::AppState;
use crate::error::{GameError, GameResult};
use crate::round::RoundController;
use crate::session::{Command, Session};
use crate::types::{GameId, RoundSnapshot};

impl AppState {
    /// Validate the current settings and start a new game at round 1
    ///
    /// A game that is still running is shut down first.
    pub async fn start_game(&self) -> GameResult<GameId> {
        let settings = self.get_settings().await;
        let controller = RoundController::with_seed(settings, self.seed)?;

        let mut session = self.session.write().await;
        if let Some(previous) = session.take() {
            tracing::info!("Replacing game {}", previous.id());
            previous.shutdown();
        }

        let handle = Session::spawn(controller, self.pacing, self.events.clone());
        let game_id = handle.id().clone();
        tracing::info!("Started game {}", game_id);
        *session = Some(handle);
        Ok(game_id)
    }

    /// Forward a host command to the running game
    pub async fn dispatch(&self, command: Command) -> GameResult<Option<RoundSnapshot>> {
        let handle = self
            .session
            .read()
            .await
            .clone()
            .ok_or(GameError::NoActiveGame)?;
        handle.send(command).await
    }

    /// Current round of the running game, if any
    pub async fn snapshot(&self) -> Option<RoundSnapshot> {
        self.dispatch(Command::Snapshot).await.ok().flatten()
    }

    /// Id of the running game; a finished game no longer counts
    pub async fn current_game_id(&self) -> Option<GameId> {
        self.session
            .read()
            .await
            .as_ref()
            .filter(|handle| !handle.is_closed())
            .map(|handle| handle.id().clone())
    }
}
