use chrono::{DateTime, Utc};

use crate::api::models::{Conversation, MessageContent, PartyRef};

use super::store::ConversationStore;

/// What the caller is asking to open: an entry already in the list, or a
/// counterpart (broker) the user wants to start chatting with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Conversation(String),
    Counterpart(String),
}

#[derive(Debug, Clone)]
pub enum Selection {
    /// A conversation already present in the store.
    Existing(Conversation),
    /// A transient new-chat placeholder; nothing was written to the store.
    Draft(Conversation),
    /// An explicit id with no match; the caller renders an empty state.
    NotFound,
}

/// Derive the conversation to render. Pure: reads the store, never mutates
/// it, and is recomputed whenever the target, list, or counterpart profile
/// changes.
///
/// An explicit conversation id either matches or is `NotFound`. A
/// counterpart id falls back to a draft placeholder whose name stays empty
/// until `profile` resolves; re-deriving with the resolved profile refreshes
/// the draft in place without changing its identity.
pub fn select_conversation(
    store: &ConversationStore,
    target: &Target,
    profile: Option<&PartyRef>,
    now: DateTime<Utc>,
) -> Selection {
    match target {
        Target::Conversation(id) => match store.get(id) {
            Some(conversation) => Selection::Existing(conversation.clone()),
            None => Selection::NotFound,
        },
        Target::Counterpart(id) => {
            if let Some(conversation) = store.get(id) {
                return Selection::Existing(conversation.clone());
            }
            let chat_with = profile
                .filter(|p| p.id == *id)
                .cloned()
                .unwrap_or_else(|| PartyRef::new(id.clone(), ""));
            Selection::Draft(Conversation {
                chat_with,
                content: MessageContent::default(),
                created_at: now,
                updated_at: now,
                unread_count: 0,
            })
        }
    }
}
