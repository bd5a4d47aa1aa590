mod game;
mod settings;

use crate::protocol::{GameEvent, ServerMessage};
use crate::session::{Pacing, SessionHandle};
use crate::settings::{GameSettings, MemoryStore, SettingsStore};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Box<dyn SettingsStore>>>,
    /// Settings as last loaded or saved; a game copies them when it starts
    pub settings: Arc<RwLock<GameSettings>>,
    pub session: Arc<RwLock<Option<SessionHandle>>>,
    /// Messages for every connected client
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Events of the running game, shared by all sessions
    pub events: broadcast::Sender<GameEvent>,
    pub pacing: Pacing,
    pub seed: Option<u64>,
}

impl AppState {
    pub fn new(store: Box<dyn SettingsStore>, pacing: Pacing, seed: Option<u64>) -> Self {
        let settings = GameSettings::load(store.as_ref());
        let (tx, _rx) = broadcast::channel(100);
        // Spin frames arrive every 100ms, leave room for slow clients
        let (events, _rx) = broadcast::channel(256);

        Self {
            store: Arc::new(Mutex::new(store)),
            settings: Arc::new(RwLock::new(settings)),
            session: Arc::new(RwLock::new(None)),
            broadcast: tx,
            events,
            pacing,
            seed,
        }
    }

    /// Broadcast a message to all connected clients
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        let _ = self.broadcast.send(msg);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Box::new(MemoryStore::new()), Pacing::default(), None)
    }
}
