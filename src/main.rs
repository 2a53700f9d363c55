//! Site chat API server
//!

use site_chat_api::app::{Realtime, build_app, build_provider};
use site_chat_api::config::Config;
use site_chat_api::infrastructure::database::DatabaseConnection;

use log::info;
use tokio::runtime::{Builder, Runtime};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(web_server_task(config))
}

async fn web_server_task(config: Config) -> anyhow::Result<()> {
    let database =
        DatabaseConnection::connect(&config.database_url, config.database_max_connections).await?;

    let realtime = Realtime::from_driver(&config.realtime)?;
    let bind_address = config.bind_address.clone();
    let local_events = realtime.is_local();

    let provider = build_provider(config.clone(), database, &realtime)?;
    let app = build_app(&config, provider, local_events)?;

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(
        "listening on {} (realtime: {})",
        listener.local_addr()?,
        if local_events { "local hub" } else { "pusher" }
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
    }
}
