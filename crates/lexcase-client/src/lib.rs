pub mod commands;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod state;

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use lexcase_store::Database;
use lexcase_sync::offline::OfflineBackend;
use lexcase_sync::relay::{HttpFileRelay, NoRelay};
use lexcase_sync::script::ScriptBackend;
use lexcase_sync::FileRelay;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::state::AppState;

/// Install the global tracing subscriber. Output goes to stderr so command
/// output on stdout stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("lexcase=info,lexcase_client_lib=info,lexcase_sync=info,lexcase_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Open the local store and wire up the backends `config` points at.
pub fn build_state(config: ClientConfig) -> Result<AppState> {
    let database = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    let relay: Arc<dyn FileRelay> = match &config.relay_url {
        Some(url) => Arc::new(HttpFileRelay::new(url, config.http_timeout)?),
        None => Arc::new(NoRelay),
    };

    let state = match &config.api_url {
        Some(url) => {
            tracing::info!(url = %url, "using script backend");
            let backend = Arc::new(ScriptBackend::new(url.clone(), config.http_timeout)?);
            AppState::new(config, database, backend.clone(), backend, relay)
        }
        None => {
            tracing::info!("no backend configured, working offline");
            let backend = Arc::new(OfflineBackend::new());
            AppState::new(config, database, backend.clone(), backend, relay)
        }
    };
    Ok(state)
}
