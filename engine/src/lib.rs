//! # Tertulia Engine
//!
//! The message relay at the heart of Tertulia, a small real-time chat.
//!
//! A relay holds the set of connected sessions. Every chat event received
//! from any session is stamped with a short sender tag and broadcast,
//! verbatim, to every connected session, the sender included. There is no
//! persistence, no authentication, no acknowledgement and no replay.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine knows nothing about sockets; connections are
//!   represented by channels
//! - **One owner**: the registry lives inside a single [`Relay`] value driven
//!   by one loop, never behind a global
//! - **Testable**: [`Relay::handle`] applies one event synchronously, so any
//!   event sequence can be replayed deterministically
//!
//! ## Core Concepts
//!
//! ### Sessions
//!
//! A [`SessionId`] is an opaque connection identifier. Its first five
//! characters form the sender tag attached to broadcasts. Tags are not
//! unique and must not be relied on for anything beyond display.
//!
//! ### Events
//!
//! Connection handlers feed [`RelayEvent`]s (`Connect`, `Message`,
//! `Disconnect`) into the relay loop through a cloneable [`RelayHandle`].
//!
//! ### Wire frames
//!
//! [`ClientFrame`] and [`ServerFrame`] are the JSON frames exchanged with
//! clients. Both carry a single event, `mensaje`.
//!
//! ## Quick Start
//!
//! ```rust
//! use tertulia_engine::{ChatPayload, Relay, SessionId};
//! use tokio::sync::mpsc;
//!
//! let mut relay = Relay::new();
//!
//! let alice = SessionId::new("a1b2c3d4e5");
//! let (tx, mut inbox) = mpsc::unbounded_channel();
//! relay.connect(alice.clone(), tx);
//!
//! let delivered = relay.broadcast(&alice, ChatPayload::new("Alice", "hi"));
//! assert_eq!(delivered, 1);
//!
//! let echo = inbox.try_recv().unwrap();
//! assert_eq!(echo.text, "hi");
//! assert_eq!(echo.sender_tag, "a1b2c");
//! ```

pub mod error;
pub mod protocol;
pub mod relay;
pub mod session;

// Re-export main types at crate root
pub use error::{Error, Result};
pub use protocol::{ChatMessage, ChatPayload, ClientFrame, ServerFrame, EVENT_MESSAGE};
pub use relay::{Inbox, Outbox, Relay, RelayEvent, RelayHandle, Session};
pub use session::{SessionId, SENDER_TAG_LEN};
