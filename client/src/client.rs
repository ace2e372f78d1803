//! Client session handler.
//!
//! Bridges a chat front-end to a relay: one WebSocket connection, a list of
//! receive callbacks, and a fire-and-forget send.
//!
//! States are simply `Disconnected -> Connected -> Disconnected`. There is
//! no reconnecting state; a dropped transport leaves the client disconnected
//! until [`ChatClient::connect`] is called again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tertulia_engine::{ChatMessage, ChatPayload, ClientFrame, ServerFrame};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::composer;
use crate::error::{ClientError, Result};

/// Display name a fresh client starts with.
pub const DEFAULT_NAME: &str = "Guest";

/// How long [`ChatClient::disconnect`] waits for the close frame to go out.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Callback invoked once per received broadcast.
pub type ReceiveHandler = Box<dyn Fn(&ChatMessage) + Send + 'static>;

type Handlers = Arc<Mutex<Vec<ReceiveHandler>>>;

/// Connection state as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// What happened to a send request.
///
/// Sending is fire-and-forget; this only says whether the message was
/// handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for the relay.
    Sent,
    /// Nothing visible to send; the relay was not contacted.
    Empty,
    /// No live connection; silently dropped.
    NotConnected,
}

/// One open WebSocket connection and the tasks pumping it.
struct Connection {
    outgoing: mpsc::UnboundedSender<Message>,
    live: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Send a close frame and wait briefly for it to be written.
    async fn close(&mut self) {
        let _ = self.outgoing.send(Message::Close(None));
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut self.writer)
            .await
            .is_err()
        {
            tracing::debug!("Timed out waiting for close frame");
            self.writer.abort();
        }
        self.reader.abort();
        self.live.store(false, Ordering::Release);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The writer exits on its own once the close frame is out
        let _ = self.outgoing.send(Message::Close(None));
        self.reader.abort();
        self.live.store(false, Ordering::Release);
    }
}

/// A chat participant's connection to a relay.
///
/// Dropping the client closes its connection.
pub struct ChatClient {
    name: String,
    name_locked: bool,
    handlers: Handlers,
    connection: Option<Connection>,
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new(DEFAULT_NAME)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("name", &self.name)
            .field("name_locked", &self.name_locked)
            .field("state", &self.state())
            .finish()
    }
}

impl ChatClient {
    /// Create a disconnected client with the given display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_locked: false,
            handlers: Arc::new(Mutex::new(Vec::new())),
            connection: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match &self.connection {
            Some(conn) if conn.is_live() => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Current display name, as typed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the display name can no longer change.
    pub fn is_name_locked(&self) -> bool {
        self.name_locked
    }

    /// Change the display name. Fails once a message has been sent.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        if self.name_locked {
            return Err(ClientError::NameLocked);
        }
        self.name = name.into();
        Ok(())
    }

    /// Open the connection to a relay.
    ///
    /// `address` may be a `ws://`/`wss://` URL, an `http://`/`https://` URL,
    /// or a bare `host:port`. Only one connection is allowed at a time.
    pub async fn connect(&mut self, address: &str) -> Result<()> {
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }
        // Whatever is left of a dropped transport goes first
        self.connection = None;

        let url = normalize_address(address);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Connect {
                address: url.clone(),
                source: Box::new(e),
            })?;

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let live = Arc::new(AtomicBool::new(true));

        let writer = tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = ws_write.send(msg).await {
                    tracing::debug!("Failed to write to relay: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let handlers = Arc::clone(&self.handlers);
        let reader_live = Arc::clone(&live);
        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match ServerFrame::decode(text.as_str()) {
                        Ok(ServerFrame::Mensaje(msg)) => dispatch(&handlers, &msg),
                        Err(e) => tracing::debug!("Ignoring frame from relay: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        tracing::debug!("Relay closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Connection to relay lost: {}", e);
                        break;
                    }
                }
            }
            reader_live.store(false, Ordering::Release);
        });

        tracing::info!(server = %url, "Connected to relay");
        self.connection = Some(Connection {
            outgoing,
            live,
            reader,
            writer,
        });

        Ok(())
    }

    /// Register a callback for every broadcast, the client's own echoes
    /// included. Callbacks run in arrival order on the connection's reader
    /// task and must not register further callbacks.
    pub fn on_receive<F>(&self, handler: F)
    where
        F: Fn(&ChatMessage) + Send + 'static,
    {
        lock_handlers(&self.handlers).push(Box::new(handler));
    }

    /// Send `text` under the current display name.
    ///
    /// The first message that actually goes out locks the display name.
    pub fn send(&mut self, text: &str) -> SendOutcome {
        let name = composer::display_name(&self.name);
        let outcome = self.send_as(&name, text);

        if outcome == SendOutcome::Sent && !self.name_locked {
            self.name_locked = true;
            tracing::debug!(name = %name, "Display name locked");
        }

        outcome
    }

    /// Send `text` under an explicit name.
    ///
    /// Does nothing when disconnected or when `text` has neither visible
    /// text nor an embedded image.
    pub fn send_as(&self, name: &str, text: &str) -> SendOutcome {
        let Some(conn) = self.connection.as_ref().filter(|c| c.is_live()) else {
            return SendOutcome::NotConnected;
        };
        if !composer::is_sendable(text) {
            return SendOutcome::Empty;
        }

        let frame = ClientFrame::Mensaje(ChatPayload::new(name, text));
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize message: {}", e);
                return SendOutcome::NotConnected;
            }
        };

        match conn.outgoing.send(Message::Text(json.into())) {
            Ok(()) => SendOutcome::Sent,
            Err(_) => SendOutcome::NotConnected,
        }
    }

    /// Close the connection, if any.
    pub async fn disconnect(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            conn.close().await;
            tracing::info!("Disconnected from relay");
        }
    }
}

fn lock_handlers(handlers: &Handlers) -> std::sync::MutexGuard<'_, Vec<ReceiveHandler>> {
    match handlers.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn dispatch(handlers: &Handlers, msg: &ChatMessage) {
    for handler in lock_handlers(handlers).iter() {
        handler(msg);
    }
}

/// Turn a user-supplied address into a WebSocket URL.
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if let Some(rest) = address.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else if let Some(rest) = address.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if address.contains("://") {
        address.to_string()
    } else {
        format!("ws://{}", address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("localhost:6969"), "ws://localhost:6969");
        assert_eq!(
            normalize_address("http://localhost:6969"),
            "ws://localhost:6969"
        );
        assert_eq!(normalize_address("https://chat.example"), "wss://chat.example");
        assert_eq!(normalize_address("ws://10.0.0.1:80/"), "ws://10.0.0.1:80/");
    }

    #[test]
    fn test_new_client_is_disconnected() {
        let client = ChatClient::default();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.name(), DEFAULT_NAME);
        assert!(!client.is_name_locked());
    }

    #[test]
    fn test_send_while_disconnected_is_noop() {
        let mut client = ChatClient::new("Alice");
        assert_eq!(client.send("hi"), SendOutcome::NotConnected);
        assert!(!client.is_name_locked());
        assert!(client.set_name("Alicia").is_ok());
        assert_eq!(client.name(), "Alicia");
    }

    #[tokio::test]
    async fn test_connect_failure_stays_disconnected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut client = ChatClient::new("Alice");
        let err = client.connect(&addr.to_string()).await.unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_transport_drop_moves_to_disconnected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept one WebSocket, then drop it without a close handshake
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            drop(ws);
        });

        let mut client = ChatClient::new("Alice");
        client.connect(&addr.to_string()).await.unwrap();
        server.await.unwrap();

        for _ in 0..500 {
            if client.state() == ConnectionState::Disconnected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.send("hi"), SendOutcome::NotConnected);
        assert!(!client.is_name_locked());
    }

    #[tokio::test]
    async fn test_disconnect_without_connection() {
        let mut client = ChatClient::default();
        client.disconnect().await;
        assert!(!client.is_connected());
    }
}
