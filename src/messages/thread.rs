use std::collections::HashSet;

use log::debug;

use crate::api::models::Message;

/// Message history for the one open conversation: a fetched segment
/// followed by live messages appended while the thread stays open.
///
/// Append-only and keyed by message id, so a send echoed locally and then
/// pushed back by the channel lands exactly once. Switching counterparts
/// discards the cache wholesale (the service builds a fresh one); a
/// discarded live segment is only recoverable through a new fetch.
#[derive(Debug)]
pub struct ThreadCache {
    counterpart_id: String,
    messages: Vec<Message>,
    seen: HashSet<String>,
    history_loaded: bool,
}

impl ThreadCache {
    pub fn new(counterpart_id: impl Into<String>) -> Self {
        Self {
            counterpart_id: counterpart_id.into(),
            messages: Vec::new(),
            seen: HashSet::new(),
            history_loaded: false,
        }
    }

    pub fn counterpart_id(&self) -> &str {
        &self.counterpart_id
    }

    pub fn history_loaded(&self) -> bool {
        self.history_loaded
    }

    /// Install the fetched history segment. Live messages admitted before
    /// the fetch resolved keep their position after the fetched ones they
    /// don't duplicate.
    pub fn load_history(&mut self, history: Vec<Message>) {
        let live_tail = std::mem::take(&mut self.messages);
        self.seen.clear();
        for message in history.into_iter().chain(live_tail) {
            self.insert_if_absent(message);
        }
        self.history_loaded = true;
    }

    /// Append one live message if it belongs to this thread and has not
    /// been seen. Returns whether it was appended.
    pub fn append_live(&mut self, message: &Message, local_user_id: &str) -> bool {
        let belongs = message
            .counterpart_of(local_user_id)
            .is_some_and(|p| p.id == self.counterpart_id);
        if !belongs {
            return false;
        }
        self.insert_if_absent(message.clone())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn insert_if_absent(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            debug!("thread {} already holds message {}", self.counterpart_id, message.id);
            return false;
        }
        self.messages.push(message);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{MessageContent, PartyRef};
    use chrono::{TimeZone, Utc};

    const LOCAL: &str = "user-1";

    fn message(id: &str, from: &str, to: &str, text: &str) -> Message {
        Message {
            id: id.into(),
            sender: PartyRef::new(from, from),
            recipient: PartyRef::new(to, to),
            content: MessageContent::new(text),
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn history_then_live_keeps_segment_order() {
        let mut thread = ThreadCache::new("b1");
        thread.load_history(vec![
            message("m1", "b1", LOCAL, "one"),
            message("m2", LOCAL, "b1", "two"),
        ]);
        assert!(thread.append_live(&message("m3", "b1", LOCAL, "three"), LOCAL));

        let texts: Vec<_> = thread.messages().iter().map(|m| m.content.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }

    #[test]
    fn echoed_send_and_push_round_trip_land_once() {
        let mut thread = ThreadCache::new("b1");
        thread.load_history(Vec::new());

        let sent = message("m7", LOCAL, "b1", "offer accepted");
        assert!(thread.append_live(&sent, LOCAL));
        assert!(!thread.append_live(&sent, LOCAL));
        assert_eq!(thread.messages().len(), 1);
    }

    #[test]
    fn live_message_for_other_counterpart_is_ignored() {
        let mut thread = ThreadCache::new("b1");
        thread.load_history(Vec::new());

        assert!(!thread.append_live(&message("m1", "b2", LOCAL, "elsewhere"), LOCAL));
        assert!(thread.messages().is_empty());
    }

    #[test]
    fn history_dedupes_against_live_messages_admitted_first() {
        let mut thread = ThreadCache::new("b1");
        // Push frame raced ahead of the history fetch.
        assert!(thread.append_live(&message("m2", "b1", LOCAL, "late push"), LOCAL));

        thread.load_history(vec![
            message("m1", "b1", LOCAL, "old"),
            message("m2", "b1", LOCAL, "late push"),
        ]);

        let ids: Vec<_> = thread.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert!(thread.history_loaded());
    }

    #[test]
    fn switching_counterparts_discards_live_segment() {
        let mut thread = ThreadCache::new("b1");
        thread.load_history(Vec::new());
        thread.append_live(&message("m1", "b1", LOCAL, "live"), LOCAL);

        // The service swaps in a fresh cache on switch; the old segment is gone.
        thread = ThreadCache::new("b2");
        assert!(thread.messages().is_empty());
        assert!(!thread.history_loaded());

        thread = ThreadCache::new("b1");
        assert!(thread.messages().is_empty());
    }
}
