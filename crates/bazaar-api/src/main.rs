mod api_doc;
mod auth;
mod error;
mod handlers;
mod setup;
mod state;

use bazaar_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    setup::init_tracing();

    let config = Config::from_env()?;

    let (_state, router, sweeper_handle) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    if let Some(handle) = sweeper_handle {
        tracing::info!("stopping expired listing sweeper");
        handle.abort();
    }

    Ok(())
}
