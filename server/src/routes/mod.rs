//! HTTP route definitions.

mod health;
mod relay;

use crate::AppState;
use axum::Router;

/// Create all application routes.
///
/// The relay has no path of its own: any request that is not a known route
/// falls through to it, and any WebSocket upgrade there joins the chat.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .fallback(relay::relay_entry)
}
