//! The relay: session registry and broadcast loop.
//!
//! All registry mutation happens inside one [`Relay`] value driven by a
//! single loop over [`RelayEvent`]s. Connection handlers never touch the
//! registry directly; they talk to the loop through a [`RelayHandle`].
//!
//! Each session gets an unbounded outbox, so queuing a broadcast never
//! waits on a slow reader and one stalled session cannot hold up the rest.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::protocol::{ChatMessage, ChatPayload};
use crate::session::SessionId;

/// Sending half of a session's outbox.
pub type Outbox = mpsc::UnboundedSender<ChatMessage>;

/// Receiving half of a session's outbox, held by the connection.
pub type Inbox = mpsc::UnboundedReceiver<ChatMessage>;

/// A registered session.
#[derive(Debug)]
pub struct Session {
    /// Connection identifier
    pub id: SessionId,
    /// Channel that delivers broadcasts to this connection
    pub outbox: Outbox,
}

/// Events consumed by the relay loop.
#[derive(Debug)]
pub enum RelayEvent {
    /// A connection was opened.
    Connect { session: SessionId, outbox: Outbox },
    /// A connection sent a chat event.
    Message {
        session: SessionId,
        payload: ChatPayload,
    },
    /// A connection was closed.
    Disconnect { session: SessionId },
    /// Report the number of registered sessions.
    SessionCount { reply: oneshot::Sender<usize> },
}

/// Owns the live session registry and fans out every chat event.
///
/// Sessions are kept in registration order, which is also broadcast order.
#[derive(Debug, Default)]
pub struct Relay {
    sessions: Vec<Session>,
}

impl Relay {
    /// Create a relay with an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
        }
    }

    /// Start the relay loop on the current tokio runtime.
    ///
    /// The loop runs until every [`RelayHandle`] clone has been dropped.
    pub fn spawn() -> (RelayHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Relay::new().run(rx));
        (RelayHandle { events: tx }, task)
    }

    /// Consume events until the channel closes, then tear down the registry.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<RelayEvent>) {
        tracing::debug!("Relay loop started");

        while let Some(event) = events.recv().await {
            self.handle(event);
        }

        let dropped = self.sessions.len();
        self.sessions.clear();
        tracing::info!(sessions = dropped, "Relay loop stopped");
    }

    /// Apply a single event.
    ///
    /// Returns the number of sessions a broadcast was queued to; zero for
    /// every event other than [`RelayEvent::Message`].
    pub fn handle(&mut self, event: RelayEvent) -> usize {
        match event {
            RelayEvent::Connect { session, outbox } => {
                self.connect(session, outbox);
                0
            }
            RelayEvent::Message { session, payload } => self.broadcast(&session, payload),
            RelayEvent::Disconnect { session } => {
                self.disconnect(&session);
                0
            }
            RelayEvent::SessionCount { reply } => {
                let _ = reply.send(self.sessions.len());
                0
            }
        }
    }

    /// Register a session.
    ///
    /// Re-registering an existing id swaps its outbox but keeps its position.
    pub fn connect(&mut self, id: SessionId, outbox: Outbox) {
        if let Some(existing) = self.sessions.iter_mut().find(|s| s.id == id) {
            existing.outbox = outbox;
            tracing::debug!(session = %id, "Session re-registered");
            return;
        }

        tracing::info!(session = %id, "Session registered");
        self.sessions.push(Session { id, outbox });
    }

    /// Remove a session. Returns whether it was registered.
    pub fn disconnect(&mut self, id: &SessionId) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| &s.id != id);
        let removed = self.sessions.len() != before;

        if removed {
            tracing::info!(
                session = %id,
                active_sessions = self.sessions.len(),
                "Session unregistered"
            );
        }

        removed
    }

    /// Broadcast a payload from `sender` to every registered session,
    /// the sender included.
    ///
    /// No validation happens here: empty strings and markup pass through,
    /// and a sender that is not registered is still relayed. Sessions whose
    /// outbox is closed are skipped and pruned.
    ///
    /// Returns the number of sessions the message was queued to.
    pub fn broadcast(&mut self, sender: &SessionId, payload: ChatPayload) -> usize {
        let message = ChatMessage::from_payload(payload, sender);
        let mut sent_count = 0;

        self.sessions.retain(|session| {
            if session.outbox.send(message.clone()).is_ok() {
                sent_count += 1;
                true
            } else {
                tracing::debug!(session = %session.id, "Dropping session with closed outbox");
                false
            }
        });

        tracing::debug!(
            sender = %sender,
            recipients = sent_count,
            "Broadcast message to sessions"
        );

        sent_count
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_connected(&self, id: &SessionId) -> bool {
        self.sessions.iter().any(|s| &s.id == id)
    }

    /// Registered session ids in broadcast order.
    pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.iter().map(|s| &s.id)
    }
}

/// Cloneable front door to a running relay loop.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    events: mpsc::UnboundedSender<RelayEvent>,
}

impl RelayHandle {
    /// Wrap the sending side of an event channel whose receiver is passed
    /// to [`Relay::run`].
    pub fn new(events: mpsc::UnboundedSender<RelayEvent>) -> Self {
        Self { events }
    }

    /// Register a session and return the inbox its broadcasts arrive on.
    ///
    /// The session receives everything broadcast after the relay processes
    /// the registration; nothing earlier is replayed.
    pub fn connect(&self, session: SessionId) -> Result<Inbox> {
        let (outbox, inbox) = mpsc::unbounded_channel();
        self.send(RelayEvent::Connect { session, outbox })?;
        Ok(inbox)
    }

    /// Hand a chat event from `session` to the relay for broadcast.
    pub fn message(&self, session: &SessionId, payload: ChatPayload) -> Result<()> {
        self.send(RelayEvent::Message {
            session: session.clone(),
            payload,
        })
    }

    pub fn disconnect(&self, session: &SessionId) -> Result<()> {
        self.send(RelayEvent::Disconnect {
            session: session.clone(),
        })
    }

    /// Ask the relay how many sessions are registered.
    pub async fn session_count(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayEvent::SessionCount { reply })?;
        rx.await.map_err(|_| Error::RelayStopped)
    }

    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }

    fn send(&self, event: RelayEvent) -> Result<()> {
        self.events.send(event).map_err(|_| Error::RelayStopped)
    }
}
