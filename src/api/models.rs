use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One party of a two-party conversation, as the backend snapshots it.
/// Read-only on the client; profile changes arrive via a fresh fetch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PartyRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl PartyRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MessageContent {
    #[serde(default)]
    pub text: String,
}

impl MessageContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A single message as delivered by the backend, either in a fetched thread
/// or as the payload of a push frame. Exactly one of sender/recipient is the
/// local user on every message the client keeps.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: PartyRef,
    pub recipient: PartyRef,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The party that is not `local_user_id`, resolved the way the backend
    /// orders it: a message we sent points at its recipient.
    pub fn counterpart_of(&self, local_user_id: &str) -> Option<&PartyRef> {
        if self.sender.id == local_user_id {
            Some(&self.recipient)
        } else if self.recipient.id == local_user_id {
            Some(&self.sender)
        } else {
            None
        }
    }
}

/// Per-counterpart summary row shown in the conversation list.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub chat_with: PartyRef,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub unread_count: u32,
}

/// Envelope of one push-channel frame. Frames whose `data` does not decode
/// to a `Message` are dropped by the listener.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingEvent {
    pub event_type: String,
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counterpart_resolves_against_local_user() {
        let msg = Message {
            id: "m1".into(),
            sender: PartyRef::new("u1", "Ana"),
            recipient: PartyRef::new("b7", "Broker"),
            content: MessageContent::new("hi"),
            created_at: Utc::now(),
        };
        assert_eq!(msg.counterpart_of("u1").map(|p| p.id.as_str()), Some("b7"));
        assert_eq!(msg.counterpart_of("b7").map(|p| p.id.as_str()), Some("u1"));
        assert_eq!(msg.counterpart_of("stranger"), None);
    }

    #[test]
    fn message_decodes_from_camel_case_wire_json() {
        let json = r#"{
            "id": "m9",
            "sender": {"id": "u1", "name": "Ana"},
            "recipient": {"id": "b7", "name": "Broker", "avatar": "https://cdn.homevista.example/a.png"},
            "content": {"text": "is the flat still listed?"},
            "createdAt": "2026-08-01T10:15:00Z"
        }"#;
        let msg: Message = serde_json::from_str(json).expect("valid message");
        assert_eq!(msg.sender.id, "u1");
        assert_eq!(
            msg.recipient.avatar.as_deref(),
            Some("https://cdn.homevista.example/a.png")
        );
        assert_eq!(msg.content.text, "is the flat still listed?");
    }

    #[test]
    fn message_without_parties_fails_to_decode() {
        let json = r#"{"id": "m9", "content": {"text": "hi"}, "createdAt": "2026-08-01T10:15:00Z"}"#;
        assert!(serde_json::from_str::<Message>(json).is_err());
    }
}
