//! Error types for the Tertulia engine.

use thiserror::Error;

/// All possible errors from the Tertulia engine.
///
/// The chat path itself has no recoverable errors: missing payload fields are
/// tolerated and undeliverable sessions are skipped. What is left is a relay
/// loop that is no longer running and frames that cannot be read at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("relay is not running")]
    RelayStopped,

    // Wire errors
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::RelayStopped;
        assert_eq!(err.to_string(), "relay is not running");

        let err = Error::UnknownEvent("typing".into());
        assert_eq!(err.to_string(), "unknown event: typing");
    }
}
