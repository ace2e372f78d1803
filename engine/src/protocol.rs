//! Wire protocol definitions.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "mensaje", "data": {...}}`. Field names on the wire keep the
//! short Spanish names (`nombre`, `texto`, `id`) that chat front-ends expect.
//!
//! Decoding is lenient: absent or `null` fields become empty strings,
//! non-string values are coerced to their JSON text, and unknown fields are
//! ignored. Only frames that are not JSON at all, or that name an unknown
//! event, fail to decode.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::session::SessionId;

/// Name of the only event carried in either direction.
pub const EVENT_MESSAGE: &str = "mensaje";

/// Chat event sent by a client: who is speaking and what they said.
///
/// `text` may contain inline markup produced by the sending UI; it is
/// relayed verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    #[serde(rename = "nombre", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "texto", default, deserialize_with = "lenient_string")]
    pub text: String,
}

impl ChatPayload {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Chat event broadcast by the relay, stamped with the sender's tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "nombre", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "texto", default, deserialize_with = "lenient_string")]
    pub text: String,
    /// First characters of the originating session id. Not unique.
    #[serde(rename = "id", default, deserialize_with = "lenient_string")]
    pub sender_tag: String,
}

impl ChatMessage {
    /// Build the outbound event for a payload received from `sender`.
    pub fn from_payload(payload: ChatPayload, sender: &SessionId) -> Self {
        Self {
            name: payload.name,
            text: payload.text,
            sender_tag: sender.sender_tag(),
        }
    }
}

/// Frames sent from client to relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    Mensaje(ChatPayload),
}

/// Frames sent from relay to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    Mensaje(ChatMessage),
}

impl ClientFrame {
    pub fn decode(text: &str) -> Result<Self> {
        let (event, data) = split_frame(text)?;
        match event.as_str() {
            EVENT_MESSAGE => Ok(ClientFrame::Mensaje(decode_data(data)?)),
            _ => Err(Error::UnknownEvent(event)),
        }
    }
}

impl ServerFrame {
    pub fn decode(text: &str) -> Result<Self> {
        let (event, data) = split_frame(text)?;
        match event.as_str() {
            EVENT_MESSAGE => Ok(ServerFrame::Mensaje(decode_data(data)?)),
            _ => Err(Error::UnknownEvent(event)),
        }
    }
}

#[derive(Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

fn split_frame(text: &str) -> Result<(String, Value)> {
    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| Error::MalformedFrame(e.to_string()))?;
    Ok((raw.event, raw.data))
}

/// A `data` value that is not an object carries no fields at all.
fn decode_data<T>(data: Value) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match data {
        Value::Object(_) => {
            serde_json::from_value(data).map_err(|e| Error::MalformedFrame(e.to_string()))
        }
        _ => Ok(T::default()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_deserialization() {
        let json = r#"{"event": "mensaje", "data": {"nombre": "Alice", "texto": "hi"}}"#;
        let frame = ClientFrame::decode(json).unwrap();
        assert_eq!(frame, ClientFrame::Mensaje(ChatPayload::new("Alice", "hi")));
    }

    #[test]
    fn test_server_frame_serialization() {
        let frame = ServerFrame::Mensaje(ChatMessage {
            name: "Alice".into(),
            text: "hi".into(),
            sender_tag: "3f9a1".into(),
        });
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(
            json,
            r#"{"event":"mensaje","data":{"nombre":"Alice","texto":"hi","id":"3f9a1"}}"#
        );
    }

    #[test]
    fn test_client_frame_serialization() {
        let frame = ClientFrame::Mensaje(ChatPayload::new("Bob", "<b>yo</b>"));
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(
            json,
            r#"{"event":"mensaje","data":{"nombre":"Bob","texto":"<b>yo</b>"}}"#
        );
    }

    #[test]
    fn missing_fields_become_empty() {
        let frame = ClientFrame::decode(r#"{"event":"mensaje","data":{"texto":"hi"}}"#).unwrap();
        assert_eq!(frame, ClientFrame::Mensaje(ChatPayload::new("", "hi")));

        let frame = ClientFrame::decode(r#"{"event":"mensaje","data":{}}"#).unwrap();
        assert_eq!(frame, ClientFrame::Mensaje(ChatPayload::default()));
    }

    #[test]
    fn missing_or_non_object_data_is_empty_payload() {
        let frame = ClientFrame::decode(r#"{"event":"mensaje"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Mensaje(ChatPayload::default()));

        let frame = ClientFrame::decode(r#"{"event":"mensaje","data":"hello"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Mensaje(ChatPayload::default()));
    }

    #[test]
    fn null_and_non_string_values_are_coerced() {
        let json = r#"{"event":"mensaje","data":{"nombre":null,"texto":42}}"#;
        let frame = ClientFrame::decode(json).unwrap();
        assert_eq!(frame, ClientFrame::Mensaje(ChatPayload::new("", "42")));

        let json = r#"{"event":"mensaje","data":{"nombre":true,"texto":["a",1]}}"#;
        let frame = ClientFrame::decode(json).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Mensaje(ChatPayload::new("true", r#"["a",1]"#))
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"event":"mensaje","data":{"nombre":"A","texto":"b","avatar":3},"x":1}"#;
        let frame = ClientFrame::decode(json).unwrap();
        assert_eq!(frame, ClientFrame::Mensaje(ChatPayload::new("A", "b")));
    }

    #[test]
    fn unknown_event_is_reported() {
        let err = ClientFrame::decode(r#"{"event":"typing","data":{}}"#).unwrap_err();
        assert_eq!(err, Error::UnknownEvent("typing".into()));
    }

    #[test]
    fn non_json_is_malformed() {
        let err = ClientFrame::decode("hello there").unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(_)));

        let err = ClientFrame::decode(r#"{"data":{}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(_)));
    }

    #[test]
    fn server_frame_decodes_with_tag() {
        let json = r#"{"event":"mensaje","data":{"nombre":"Alice","texto":"hi","id":"abcde"}}"#;
        let ServerFrame::Mensaje(msg) = ServerFrame::decode(json).unwrap();
        assert_eq!(msg.name, "Alice");
        assert_eq!(msg.text, "hi");
        assert_eq!(msg.sender_tag, "abcde");
    }

    #[test]
    fn message_from_payload_stamps_tag() {
        let sender = SessionId::new("0123456789");
        let msg = ChatMessage::from_payload(ChatPayload::new("Alice", "hi"), &sender);
        assert_eq!(msg.sender_tag, "01234");
        assert_eq!(msg.name, "Alice");
        assert_eq!(msg.text, "hi");
    }
}
