use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pose_party::{
    api,
    config::ServerConfig,
    settings::{JsonFileStore, MemoryStore, SettingsStore},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pose_party=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pose Party...");

    let config = ServerConfig::from_env();

    let store: Box<dyn SettingsStore> = match JsonFileStore::open(&config.settings_path) {
        Ok(store) => {
            tracing::info!("Settings stored in {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to open settings file: {}. Settings will not survive a restart.",
                e
            );
            Box::new(MemoryStore::new())
        }
    };

    let state = Arc::new(AppState::new(store, config.pacing, config.seed));
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
