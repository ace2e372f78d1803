//! # Tertulia Client
//!
//! Client side of a Tertulia chat: a [`ChatClient`] that holds one
//! connection to a relay, and [`composer`] helpers a front-end uses to
//! decide what to send and how to show what arrives.
//!
//! ```no_run
//! use tertulia_client::ChatClient;
//!
//! # async fn demo() -> tertulia_client::Result<()> {
//! let mut client = ChatClient::new("Alice");
//! client.on_receive(|msg| println!("{} says: {}", msg.name, msg.text));
//! client.connect("ws://localhost:6969").await?;
//! client.send("<b>hola</b> everyone");
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod composer;
pub mod error;

pub use client::{
    normalize_address, ChatClient, ConnectionState, ReceiveHandler, SendOutcome, DEFAULT_NAME,
};
pub use error::{ClientError, Result};
pub use tertulia_engine::ChatMessage;
