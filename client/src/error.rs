//! Error types for the chat client.

use tokio_tungstenite::tungstenite;

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: Box<tungstenite::Error>,
    },

    #[error("already connected")]
    AlreadyConnected,

    #[error("display name is locked after the first message")]
    NameLocked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
