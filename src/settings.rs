//! Game settings and the key-value store they persist to
//!
//! Every value is stored as a string under a fixed key. Lists are stored as
//! JSON arrays. A missing or unparseable value falls back to its default.

use crate::error::{SettingsError, SetupError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const KEY_NAMES: &str = "gameNames";
pub const KEY_WORDS: &str = "gameWords";
pub const KEY_WARMUP_VIDEO: &str = "warmupVideo";
pub const KEY_ROUNDS: &str = "gameRounds";
pub const KEY_PLAYERS_PER_ROUND: &str = "playersPerRound";
pub const KEY_POSING_TIMER: &str = "posingTimer";
pub const KEY_EXPLANATION_TIMER: &str = "explanationTimer";

const DEFAULT_NAMES: [&str; 4] = ["Alice", "Bob", "Charlie", "Diana"];
const DEFAULT_WORDS: [&str; 5] = [
    "a superhero",
    "a cat",
    "someone famous",
    "a robot",
    "a dancer",
];

/// Configuration snapshot a game is played with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSettings {
    pub rounds: u32,
    pub players_per_round: u32,
    pub names: Vec<String>,
    pub words: Vec<String>,
    /// Seconds players have to strike their pose
    pub posing_timer: u32,
    /// Seconds each selected player has to explain
    pub explanation_timer: u32,
    #[serde(default)]
    pub warmup_video: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            rounds: 10,
            players_per_round: 1,
            names: DEFAULT_NAMES.iter().map(|s| s.to_string()).collect(),
            words: DEFAULT_WORDS.iter().map(|s| s.to_string()).collect(),
            posing_timer: 10,
            explanation_timer: 20,
            warmup_video: String::new(),
        }
    }
}

impl GameSettings {
    /// Read settings from a store, using defaults for anything missing
    pub fn load(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        Self {
            names: read_list(store, KEY_NAMES).unwrap_or(defaults.names),
            words: read_list(store, KEY_WORDS).unwrap_or(defaults.words),
            warmup_video: store.get(KEY_WARMUP_VIDEO).unwrap_or_default(),
            rounds: read_number(store, KEY_ROUNDS).unwrap_or(defaults.rounds),
            players_per_round: read_number(store, KEY_PLAYERS_PER_ROUND)
                .unwrap_or(defaults.players_per_round),
            posing_timer: read_number(store, KEY_POSING_TIMER).unwrap_or(defaults.posing_timer),
            explanation_timer: read_number(store, KEY_EXPLANATION_TIMER)
                .unwrap_or(defaults.explanation_timer),
        }
    }

    /// Write every setting back to the store in one batch
    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        store.set_all(vec![
            (KEY_NAMES, serde_json::to_string(&self.names)?),
            (KEY_WORDS, serde_json::to_string(&self.words)?),
            (KEY_WARMUP_VIDEO, self.warmup_video.clone()),
            (KEY_ROUNDS, self.rounds.to_string()),
            (KEY_PLAYERS_PER_ROUND, self.players_per_round.to_string()),
            (KEY_POSING_TIMER, self.posing_timer.to_string()),
            (KEY_EXPLANATION_TIMER, self.explanation_timer.to_string()),
        ])
    }

    /// Check the preconditions for starting a game
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.names.is_empty() {
            return Err(SetupError::NoNames);
        }
        if self.words.is_empty() {
            return Err(SetupError::NoWords);
        }
        if self.rounds == 0 {
            return Err(SetupError::NoRounds);
        }
        if self.players_per_round == 0 {
            return Err(SetupError::NoPlayersPerRound);
        }

        let available = self.names.iter().collect::<HashSet<_>>().len();
        if self.players_per_round as usize > available {
            return Err(SetupError::TooManyPlayersPerRound {
                per_round: self.players_per_round,
                available,
            });
        }
        Ok(())
    }
}

fn read_list(store: &dyn SettingsStore, key: &str) -> Option<Vec<String>> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(list) => Some(list),
        Err(e) => {
            tracing::warn!("Ignoring malformed {} setting: {}", key, e);
            None
        }
    }
}

fn read_number(store: &dyn SettingsStore, key: &str) -> Option<u32> {
    let raw = store.get(key)?;
    match raw.trim().parse() {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!("Ignoring malformed {} setting {:?}: {}", key, raw, e);
            None
        }
    }
}

/// Named string values that survive restarts
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<(), SettingsError> {
        self.set_all(vec![(key, value)])
    }

    /// Write several values at once; on error the store is left unchanged
    fn set_all(&mut self, values: Vec<(&str, String)>) -> Result<(), SettingsError>;
}

/// Store that forgets everything on restart
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_all(&mut self, values: Vec<(&str, String)>) -> Result<(), SettingsError> {
        self.values
            .extend(values.into_iter().map(|(key, value)| (key.to_string(), value)));
        Ok(())
    }
}

/// Store backed by a flat JSON object on disk, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store, starting empty if the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values: BTreeMap<String, String> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No settings file at {}, starting fresh", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set_all(&mut self, values: Vec<(&str, String)>) -> Result<(), SettingsError> {
        let mut staged = self.values.clone();
        staged.extend(values.into_iter().map(|(key, value)| (key.to_string(), value)));

        // Only a successful write changes what `get` returns
        self.write(&staged)?;
        self.values = staged;
        Ok(())
    }
}
