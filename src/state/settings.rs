use super::AppState;
use crate::error::SettingsError;
use crate::protocol::ServerMessage;
use crate::settings::GameSettings;

impl AppState {
    pub async fn get_settings(&self) -> GameSettings {
        self.settings.read().await.clone()
    }

    /// Persist new settings and push them to every client
    ///
    /// A running game keeps the settings it started with.
    pub async fn update_settings(
        &self,
        settings: GameSettings,
    ) -> Result<GameSettings, SettingsError> {
        {
            let mut store = self.store.lock().await;
            settings.save(&mut **store)?;
        }

        *self.settings.write().await = settings.clone();
        tracing::info!(
            "Settings updated: {} rounds, {} per round, {} names, {} words",
            settings.rounds,
            settings.players_per_round,
            settings.names.len(),
            settings.words.len()
        );

        self.broadcast_to_all(ServerMessage::Settings {
            settings: settings.clone(),
        });
        Ok(settings)
    }
}
