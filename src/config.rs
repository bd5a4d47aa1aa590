//! Server configuration from environment variables

use crate::session::Pacing;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 6574;
pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// JSON file backing the game settings
    pub settings_path: PathBuf,
    /// Fixed RNG seed, for reproducible draws
    pub seed: Option<u64>,
    pub pacing: Pacing,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            seed: None,
            pacing: Pacing::default(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = parse_var("POSE_PARTY_PORT").unwrap_or(defaults.port);

        let settings_path = std::env::var("SETTINGS_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.settings_path);

        let seed = parse_var("GAME_SEED");

        let mut pacing = defaults.pacing;
        if let Some(ms) = parse_var("PROMPT_DELAY_MS") {
            pacing.prompt_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var("SETTLE_PAUSE_MS") {
            pacing.settle_pause = Duration::from_millis(ms);
        }

        tracing::info!(
            port,
            settings_path = %settings_path.display(),
            seeded = seed.is_some(),
            "Server config loaded"
        );

        Self {
            port,
            settings_path,
            seed,
            pacing,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = std::env::var(name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", name, value);
            None
        }
    }
}
