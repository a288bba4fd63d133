//! Message protocol definitions
//!
//! JSON wire shapes exchanged with clients and returned by queries.
//! Field names are snake_case on the wire.

use serde::{Deserialize, Serialize};

/// Origin name stamped on broker-generated notices
pub const SYSTEM_ORIGIN: &str = "Manager";

/// A chat message, in either direction
///
/// Inbound, only `broadcast`, `room`, `destination_id` and `content` are
/// meaningful; any origin fields a client sends are overwritten before the
/// message is delivered anywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// true: room message; false: direct message
    #[serde(default)]
    pub broadcast: bool,
    /// Room name (broadcast only)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,
    /// Target client id (direct only)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination_id: String,
    /// Message body
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin_name: String,
}

impl ChatMessage {
    /// Broker notice fanned out to every connected session
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            broadcast: true,
            content: content.into(),
            origin_name: SYSTEM_ORIGIN.to_string(),
            ..Self::default()
        }
    }
}

/// Signal kinds pushed outside of chat payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// The recipient's inbox changed and should be re-fetched
    InboxUpdate,
}

/// Lightweight signal with no message body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InboxSignal {
    pub kind: SignalKind,
}

impl InboxSignal {
    pub fn update() -> Self {
        Self {
            kind: SignalKind::InboxUpdate,
        }
    }
}

/// Broker → Client payload
///
/// Serialized untagged: chat messages and signals are told apart by shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Chat(ChatMessage),
    Signal(InboxSignal),
}

/// Conversation kind of an inbox thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
    Private,
    Group,
}

/// Inbox entry for one conversation of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadPreview {
    /// `u:<peer>` or `g:<room>`
    pub thread_id: String,
    pub kind: ThreadKind,
    /// Peer name or room name
    pub title: String,
    pub last_body: String,
    /// Unix seconds of the last message
    pub last_ts: i64,
    pub unread: u32,
}

/// Connected client as listed by queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub id: String,
    pub name: String,
}

/// Room with the caller's subscription state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomListing {
    pub room: String,
    pub subscribed: bool,
    /// Empty for ownerless rooms
    pub owner: String,
    pub is_owner: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_deserialize_partial() {
        let json = r#"{"broadcast": true, "room": "team", "content": "hi"}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert!(msg.broadcast);
        assert_eq!(msg.room, "team");
        assert_eq!(msg.content, "hi");
        assert!(msg.destination_id.is_empty());
        assert!(msg.origin_id.is_empty());
    }

    #[test]
    fn test_chat_message_serialize_omits_empty() {
        let msg = ChatMessage {
            broadcast: false,
            destination_id: "abc".to_string(),
            content: "yo".to_string(),
            origin_id: "me".to_string(),
            origin_name: "Alice".to_string(),
            ..ChatMessage::default()
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"broadcast\":false"));
        assert!(json.contains("\"destination_id\":\"abc\""));
        assert!(json.contains("\"origin_name\":\"Alice\""));
        assert!(!json.contains("\"room\""));
    }

    #[test]
    fn test_system_message_shape() {
        let msg = ChatMessage::system("alice joined");
        assert!(msg.broadcast);
        assert_eq!(msg.origin_name, SYSTEM_ORIGIN);
        assert!(msg.origin_id.is_empty());
    }

    #[test]
    fn test_inbox_signal_serialize() {
        let json = serde_json::to_string(&ServerMessage::Signal(InboxSignal::update())).unwrap();
        assert_eq!(json, r#"{"kind":"inbox_update"}"#);
    }

    #[test]
    fn test_thread_preview_serialize() {
        let preview = ThreadPreview {
            thread_id: "g:team".to_string(),
            kind: ThreadKind::Group,
            title: "team".to_string(),
            last_body: "hi".to_string(),
            last_ts: 42,
            unread: 1,
        };
        let json = serde_json::to_string(&preview).unwrap();
        assert!(json.contains("\"kind\":\"group\""));
        assert!(json.contains("\"thread_id\":\"g:team\""));
        assert!(json.contains("\"last_ts\":42"));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        assert!(serde_json::from_str::<ChatMessage>("not json").is_err());
        assert!(serde_json::from_str::<ChatMessage>(r#"{"broadcast": "yes"}"#).is_err());
    }
}
