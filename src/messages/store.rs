use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::{debug, warn};

use crate::api::models::{Conversation, Message};

/// Per-user conversation list. Owned exclusively by the messaging service;
/// every mutation funnels through `admit` or `replace_all`, so fetch results
/// and live push events can arrive in any order and still produce one
/// consistent view.
///
/// Lookup is by counterpart id through a map; a parallel id sequence keeps
/// the user-visible most-recently-active order.
#[derive(Debug)]
pub struct ConversationStore {
    local_user_id: String,
    order: Vec<String>,
    by_counterpart: HashMap<String, Conversation>,
    revision: u64,
}

impl ConversationStore {
    pub fn new(local_user_id: impl Into<String>) -> Self {
        Self {
            local_user_id: local_user_id.into(),
            order: Vec::new(),
            by_counterpart: HashMap::new(),
            revision: 0,
        }
    }

    pub fn local_user_id(&self) -> &str {
        &self.local_user_id
    }

    /// Monotonic mutation counter. A fetch captures this before its network
    /// call; `replace_all` refuses a snapshot whose revision has been
    /// overtaken by live events admitted in the meantime.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Incorporate one incoming message into the summary list.
    ///
    /// Messages not involving the local user are rejected without touching
    /// state. An existing conversation gets its preview and recency updated
    /// and moves to the front, leaving the relative order of the others
    /// untouched; an unknown counterpart gets a fresh entry at the front.
    /// Unread count grows only for messages the local user did not send.
    /// Returns whether the message was admitted.
    pub fn admit(&mut self, message: &Message) -> bool {
        let Some(counterpart) = message.counterpart_of(&self.local_user_id) else {
            debug!(
                "dropping message {} not involving local user {}",
                message.id, self.local_user_id
            );
            return false;
        };
        let counterpart = counterpart.clone();
        let from_local = message.sender.id == self.local_user_id;

        match self.by_counterpart.entry(counterpart.id.clone()) {
            Entry::Occupied(mut slot) => {
                let conversation = slot.get_mut();
                conversation.content = message.content.clone();
                conversation.updated_at = message.created_at;
                if !from_local {
                    conversation.unread_count += 1;
                }
                // Stable move-to-front: everything else keeps its order.
                self.order.retain(|id| id != &counterpart.id);
                self.order.insert(0, counterpart.id);
            }
            Entry::Vacant(slot) => {
                self.order.insert(0, counterpart.id.clone());
                slot.insert(Conversation {
                    content: message.content.clone(),
                    created_at: message.created_at,
                    updated_at: message.created_at,
                    unread_count: if from_local { 0 } else { 1 },
                    chat_with: counterpart,
                });
            }
        }

        self.revision += 1;
        true
    }

    /// Replace the whole list with a fetched snapshot, in server order.
    ///
    /// `observed_revision` must be the value of `revision()` at the moment
    /// the fetch started; if live events were admitted while the fetch was
    /// in flight the snapshot is stale and is refused, keeping the newer
    /// in-memory state. Returns whether the snapshot was applied.
    pub fn replace_all(&mut self, snapshot: Vec<Conversation>, observed_revision: u64) -> bool {
        if observed_revision != self.revision {
            warn!(
                "discarding stale conversation snapshot (observed revision {}, now {})",
                observed_revision, self.revision
            );
            return false;
        }

        self.order.clear();
        self.by_counterpart.clear();
        for conversation in snapshot {
            let id = conversation.chat_with.id.clone();
            // First occurrence wins; the server already sorts by recency.
            if self.by_counterpart.contains_key(&id) {
                continue;
            }
            self.order.push(id.clone());
            self.by_counterpart.insert(id, conversation);
        }

        self.revision += 1;
        true
    }

    pub fn get(&self, counterpart_id: &str) -> Option<&Conversation> {
        self.by_counterpart.get(counterpart_id)
    }

    /// Snapshot of the list in most-recently-active order.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.order
            .iter()
            .filter_map(|id| self.by_counterpart.get(id))
            .cloned()
            .collect()
    }

    /// Zero the unread counter for one counterpart, as done when its thread
    /// is opened. Returns whether the conversation existed.
    pub fn mark_read(&mut self, counterpart_id: &str) -> bool {
        match self.by_counterpart.get_mut(counterpart_id) {
            Some(conversation) => {
                if conversation.unread_count != 0 {
                    conversation.unread_count = 0;
                    self.revision += 1;
                }
                true
            }
            None => false,
        }
    }

    /// Drop everything, as on logout. The next session starts from a fetch.
    pub fn clear(&mut self) {
        self.order.clear();
        self.by_counterpart.clear();
        self.revision += 1;
    }
}
