//! WebSocket handler for relay sessions.
//!
//! Each connection becomes one relay session: inbound `mensaje` frames are
//! handed to the relay, and everything the relay broadcasts is written back
//! out as JSON text frames.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tertulia_engine::{ClientFrame, Error, RelayHandle, ServerFrame, SessionId};

/// Unregisters a session when dropped, whichever way the connection ends.
struct SessionGuard {
    relay: RelayHandle,
    session: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // Relay already gone means there is nothing left to unregister from
        let _ = self.relay.disconnect(&self.session);
    }
}

/// Handle an established WebSocket connection.
///
/// This function:
/// 1. Registers a fresh session with the relay
/// 2. Spawns a task to forward broadcasts to the WebSocket
/// 3. Processes incoming frames until either the reader or the writer stops
/// 4. Unregisters on disconnect
pub async fn handle_websocket_connection(socket: WebSocket, relay: RelayHandle) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let session = SessionId::generate();
    let mut inbox = match relay.connect(session.clone()) {
        Ok(inbox) => inbox,
        Err(e) => {
            tracing::warn!(session = %session, "Refusing connection: {}", e);
            return;
        }
    };
    let guard = SessionGuard {
        relay: relay.clone(),
        session: session.clone(),
    };

    tracing::info!(session = %session, "Client connected");

    // Spawn task to forward broadcasts from the inbox to the WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = inbox.recv().await {
            match serde_json::to_string(&ServerFrame::Mensaje(msg)) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    // Process incoming frames
    let recv_loop = async {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => process_frame(text.as_str(), &relay, &session),
                Ok(Message::Binary(_)) => {
                    tracing::warn!(session = %session, "Binary messages not supported");
                }
                Ok(Message::Ping(data)) => {
                    tracing::trace!("Received ping: {} bytes", data.len());
                }
                Ok(Message::Pong(_)) => {
                    tracing::trace!("Received pong");
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(session = %session, "WebSocket close frame received");
                    break;
                }
                Err(e) => {
                    tracing::warn!(session = %session, "WebSocket error: {}", e);
                    break;
                }
            }
        }
    };

    // Either half ending ends the session
    tokio::select! {
        _ = recv_loop => {}
        _ = &mut send_task => {
            tracing::debug!(session = %session, "Writer stopped, closing session");
        }
    }

    // Clean up
    drop(guard);
    send_task.abort();

    let active = relay.session_count().await.unwrap_or_default();
    tracing::info!(
        session = %session,
        active_sessions = active,
        "Client disconnected"
    );
}

/// Hand one inbound text frame to the relay.
///
/// Nothing is ever sent back: unreadable frames and unknown events are
/// dropped and logged.
fn process_frame(text: &str, relay: &RelayHandle, session: &SessionId) {
    match ClientFrame::decode(text) {
        Ok(ClientFrame::Mensaje(payload)) => {
            if let Err(e) = relay.message(session, payload) {
                tracing::warn!(session = %session, "Failed to relay message: {}", e);
            }
        }
        Err(Error::UnknownEvent(event)) => {
            tracing::debug!(session = %session, event = %event, "Ignoring unknown event");
        }
        Err(e) => {
            tracing::warn!(session = %session, "Dropping unreadable frame: {}", e);
        }
    }
}
