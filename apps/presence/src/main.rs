use presence::error::AppError;
use presence::logger::initialize as LoggerInitialize;
use presence::runner;
use presence::source::StdinPlaybackSource;

use presence_core::config::PresenceConfig;
use presence_core::ipc::start_presence_client;
use presence_core::presence::PresencePublisher;

use common::ErrorLocation;

use std::env;
use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info, warn};
use tokio::signal;

const APP_DIR_NAME: &str = "presence";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let detail = serde_json::to_string(&e).unwrap_or_else(|_| e.to_string());
            error!("Presence stopped with error: {detail}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    // Before anything reads the environment
    let dotenv = dotenvy::dotenv();

    let log_dir = log_directory();
    create_dir_all(&log_dir).map_err(|e| AppError::Logger {
        message: format!("Failed to create log directory {}: {e}", log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("Presence bridge starting");
    info!("Log directory: {}", log_dir.display());
    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {e}"),
    }

    let config = PresenceConfig::from_env()?;
    let client = start_presence_client(config.clone())?;

    let mut source = StdinPlaybackSource::new();
    let mut publisher = PresencePublisher::new(client.clone());

    let polls = runner::run(
        &mut source,
        &mut publisher,
        config.poll_interval(),
        shutdown_signal(),
    )
    .await;
    info!("Poll loop finished after {polls} polls");

    if publisher.tracker().is_showing() {
        let outcome = publisher.sink().clear_activity().await;
        info!("Cleared presence on exit: {outcome:?}");
    }

    client.shutdown().await;
    info!("Presence bridge stopped");
    Ok(())
}

fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(env::temp_dir)
        .join(APP_DIR_NAME)
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
