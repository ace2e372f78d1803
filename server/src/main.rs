//! Tertulia Server - relay process for real-time chat.
//!
//! Reads its port from the environment (default 6969), accepts WebSocket
//! clients on any path and fans every chat message out to all of them.

use tertulia_engine::Relay;
use tertulia_server::{serve, AppState, Config, ServerError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tertulia_server=debug,tertulia_engine=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Tertulia relay on {}:{}", config.host, config.port);

    // Start the relay loop
    let (relay, relay_task) = Relay::spawn();
    let state = AppState::new(relay, config.clone());

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    serve(listener, state, shutdown_signal()).await?;

    // Open sessions still hold relay handles; they are dropped with the runtime
    if relay_task.is_finished() {
        tracing::info!("Relay stopped");
    } else {
        tracing::info!("Relay stopping with open sessions");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal, shutting down...");
}
