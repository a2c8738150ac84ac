//! Server binary for the Cubicle simulation.
//!
//! Wires the content catalog, the narrator, and the session API together
//! and serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `cubicle-config.yaml`
//! 3. Validate the calendar
//! 4. Load the content catalog
//! 5. Build the narrator from `LLM_*` environment variables
//! 6. Serve the session API

mod error;

use std::path::Path;
use std::sync::Arc;

use cubicle_api::{AppState, start_server};
use cubicle_core::catalog::Catalog;
use cubicle_core::clock::Calendar;
use cubicle_core::config::EngineConfig;
use cubicle_narrator::config::NarratorConfig;
use cubicle_narrator::narrator::LlmNarrator;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServerAppError;

/// Path of the engine configuration file, relative to the working directory.
const CONFIG_PATH: &str = "cubicle-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> Result<(), ServerAppError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("cubicle-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        host = config.server.host,
        port = config.server.port,
        seed = ?config.simulation.seed,
        survival_week = config.simulation.survival_week,
        narration_timeout_ms = config.narration.timeout_ms,
        "Configuration loaded"
    );

    // 3. Fail fast on a calendar no session could use.
    Calendar::new(&config.simulation)?;

    // 4. Load content.
    let catalog = Arc::new(Catalog::builtin()?);
    info!(projects = catalog.projects.len(), "Catalog loaded");

    // 5. Build the narrator.
    let narrator_config = NarratorConfig::from_env()?;
    let narrator = LlmNarrator::from_config(&narrator_config)?;
    info!(backend = narrator.backend_name(), "Narrator ready");

    // 6. Serve.
    let server = config.server.clone();
    let state = Arc::new(AppState::new(catalog, config, Arc::new(narrator)));
    start_server(&server, state).await?;

    info!("cubicle-server stopped");
    Ok(())
}

/// Load configuration from `cubicle-config.yaml`.
///
/// If the file does not exist, defaults are used. Environment overrides
/// apply only to a loaded file.
fn load_config() -> Result<EngineConfig, ServerAppError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(EngineConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(EngineConfig::default())
    }
}
