//! Application setup and initialization.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use bazaar_core::Config;

use crate::state::AppState;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Initialize the entire application. The optional handle owns the
/// background sweeper task.
pub async fn initialize_app(
    config: Config,
) -> Result<(Arc<AppState>, axum::Router, Option<tokio::task::JoinHandle<()>>)> {
    tracing::info!(environment = %config.environment, "Configuration loaded");

    let pool = database::setup_database(&config).await?;

    let (state, sweeper_handle) = services::initialize_services(&config, pool).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router, sweeper_handle))
}
