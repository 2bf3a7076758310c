pub mod api;
pub mod breaks;
pub mod config;
pub mod db;
pub mod sessions;
pub mod settings;
pub mod timer;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use log::{error, info};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use api::AppState;
use config::Config;
use db::Database;
use sessions::SessionService;
use settings::PreferencesStore;
use timer::TimerRegistry;

/// Builds the application state around an open database.
pub fn build_state(config: &Config, database: Database, prefs: PreferencesStore) -> AppState {
    let service = SessionService::new(Arc::new(database));
    let timers = Arc::new(TimerRegistry::new(
        service.clone(),
        Arc::new(prefs),
        config.controller_options(),
    ));
    AppState::new(service, timers, &config.user_header)
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("CodePulse starting up...");

    let config = Config::from_env();
    let database = Database::new(config.db_path.clone())
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;
    let prefs = PreferencesStore::new(config.prefs_path.clone())?;
    let state = build_state(&config, database, prefs);
    let timers = state.timers.clone();
    let shutdown = state.shutdown.clone();

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    timers.shutdown().await;
    info!("CodePulse stopped");
    Ok(())
}

/// Resolves on Ctrl-C and cancels `shutdown`, so long-lived event streams
/// close and the connection drain can finish.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    shutdown.cancel();
}
