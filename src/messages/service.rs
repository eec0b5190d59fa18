use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use log::{debug, warn};

use crate::api::client::ApiClient;
use crate::api::events::{LiveChannel, LiveSubscription};
use crate::api::models::{Conversation, Message, PartyRef};
use crate::error::Result;

use super::selector::{select_conversation, Selection, Target};
use super::store::ConversationStore;
use super::thread::ThreadCache;

#[derive(Debug)]
struct Inner {
    store: Mutex<ConversationStore>,
    thread: Mutex<Option<ThreadCache>>,
    local_user_id: String,
}

/// The messaging subsystem's service boundary. UI collaborators hold this
/// (cheaply cloneable) handle and only ever see derived snapshots; the store
/// itself is reachable solely through the operations below, so the fetch
/// path and the push path cannot interleave partial mutations.
#[derive(Debug, Clone)]
pub struct MessagingService {
    api: ApiClient,
    inner: Arc<Inner>,
}

impl MessagingService {
    pub fn new(api: ApiClient, local_user_id: impl Into<String>) -> Self {
        let local_user_id = local_user_id.into();
        Self {
            api,
            inner: Arc::new(Inner {
                store: Mutex::new(ConversationStore::new(local_user_id.clone())),
                thread: Mutex::new(None),
                local_user_id,
            }),
        }
    }

    pub fn local_user_id(&self) -> &str {
        &self.inner.local_user_id
    }

    fn store(&self) -> MutexGuard<'_, ConversationStore> {
        self.inner.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn thread(&self) -> MutexGuard<'_, Option<ThreadCache>> {
        self.inner.thread.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-fetch the authoritative conversation list and install it as the
    /// new baseline. A failed fetch degrades to an empty baseline rather
    /// than surfacing an error; a fetch that resolves after live events
    /// already moved the store is discarded as stale. Returns the list as
    /// now visible.
    pub async fn refresh(&self) -> Vec<Conversation> {
        let observed = self.store().revision();
        let snapshot = match self.api.conversations().await {
            Ok(list) => list,
            Err(e) => {
                warn!("conversation fetch failed, starting from empty: {}", e);
                Vec::new()
            }
        };
        let mut store = self.store();
        store.replace_all(snapshot, observed);
        store.conversations()
    }

    /// Current conversation list, most-recently-active first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.store().conversations()
    }

    /// Single mutation entry point for incoming messages: updates the
    /// summary list and, when the message belongs to the open thread,
    /// appends it there too. Both the push listener and the send echo land
    /// here. Returns whether the store changed.
    pub fn admit(&self, message: &Message) -> bool {
        let admitted = self.store().admit(message);
        if admitted {
            if let Some(thread) = self.thread().as_mut() {
                thread.append_live(message, &self.inner.local_user_id);
            }
        }
        admitted
    }

    /// Derive the conversation to render for `target`. `profile` is the
    /// counterpart's resolved profile, if any, used to fill a new-chat
    /// placeholder.
    pub fn select(&self, target: &Target, profile: Option<&PartyRef>) -> Selection {
        select_conversation(&self.store(), target, profile, Utc::now())
    }

    /// Open (or switch to) the thread with one counterpart: the previous
    /// thread's live segment is discarded, the history is fetched once, and
    /// the conversation's unread counter is zeroed. A failed history fetch
    /// degrades to an empty thread that live messages still append to.
    pub async fn open_thread(&self, counterpart_id: &str) -> Vec<Message> {
        // Install the cache before awaiting the fetch so frames that arrive
        // mid-flight are kept and deduplicated against the history.
        *self.thread() = Some(ThreadCache::new(counterpart_id));

        let history = match self.api.thread(counterpart_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("thread fetch for {} failed: {}", counterpart_id, e);
                Vec::new()
            }
        };

        let mut guard = self.thread();
        match guard.as_mut() {
            // Only load if the user has not already switched away.
            Some(thread) if thread.counterpart_id() == counterpart_id => {
                thread.load_history(history);
                self.store().mark_read(counterpart_id);
                thread.messages().to_vec()
            }
            _ => {
                debug!("thread {} was switched away before its fetch resolved", counterpart_id);
                Vec::new()
            }
        }
    }

    /// Messages of the open thread, or empty when `counterpart_id` is not
    /// the open one (a discarded thread needs a fresh `open_thread`).
    pub fn thread_messages(&self, counterpart_id: &str) -> Vec<Message> {
        match self.thread().as_ref() {
            Some(thread) if thread.counterpart_id() == counterpart_id => {
                thread.messages().to_vec()
            }
            _ => Vec::new(),
        }
    }

    /// Send one message and admit the backend's echo locally, so the
    /// sender's own view updates without waiting for the push round-trip.
    pub async fn send(&self, recipient_id: &str, text: &str) -> Result<Message> {
        let echo = self.api.send_message(recipient_id, text).await?;
        self.admit(&echo);
        Ok(echo)
    }

    /// Subscribe this service to the push channel. Dropping the returned
    /// handle stops delivery; admit-side state is untouched.
    pub fn connect_live(&self, channel: &LiveChannel) -> Result<LiveSubscription> {
        let service = self.clone();
        channel.subscribe(&self.inner.local_user_id, move |message| {
            service.admit(&message);
        })
    }

    /// Tear down session state: conversation list and open thread are
    /// dropped. The caller drops its `LiveSubscription` alongside.
    pub fn logout(&self) {
        self.store().clear();
        *self.thread() = None;
    }
}
