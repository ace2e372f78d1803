//! Relay entry point.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};

use crate::handlers::handle_websocket_connection;
use crate::AppState;

/// Upgrade to a relay session, or answer plain HTTP with a banner.
pub async fn relay_entry(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(_) => return "Tertulia Relay Server".into_response(),
    };

    let ws = match state.config.max_message_size {
        Some(limit) => ws.max_message_size(limit).max_frame_size(limit),
        None => ws,
    };

    let relay = state.relay.clone();
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, relay))
}
