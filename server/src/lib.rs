//! Tertulia Server - relay process for real-time chat.
//!
//! Accepts WebSocket connections from any origin and rebroadcasts every
//! chat message to every connected client through the tertulia-engine relay.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use axum::Router;
use tertulia_engine::RelayHandle;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use crate::config::{Config, ConfigError};
pub use crate::error::ServerError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayHandle,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(relay: RelayHandle, config: Config) -> Self {
        Self {
            relay,
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the relay on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
