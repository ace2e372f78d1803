//! Session identity.
//!
//! A session is one live client connection. Its identifier is opaque; the
//! only thing derived from it is the short sender tag stamped on broadcasts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of leading characters of a session id that form its sender tag.
pub const SENDER_TAG_LEN: usize = 5;

/// Opaque connection identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier (32 lowercase hex characters).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short, non-unique tag attached to every message this session sends.
    ///
    /// Takes the first [`SENDER_TAG_LEN`] characters. Two sessions may share
    /// a tag; nothing may rely on it being unique.
    pub fn sender_tag(&self) -> String {
        self.0.chars().take(SENDER_TAG_LEN).collect()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
