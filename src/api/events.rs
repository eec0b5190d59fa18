use std::time::Duration;

use futures::StreamExt;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsFrame;
use url::Url;

use crate::api::models::{IncomingEvent, Message};
use crate::error::{Error, Result};

/// Frame type carrying a `Message` payload; everything else on the channel
/// (presence, typing, keepalive) is ignored here.
pub const MESSAGE_EVENT: &str = "message";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Adapter over the push transport. Subscribing opens a websocket scoped to
/// the local user and hands every decoded `Message` to the callback; the
/// returned handle stops delivery when unsubscribed or dropped, so a closed
/// session cannot leak frames into the next one.
#[derive(Debug, Clone)]
pub struct LiveChannel {
    push_url: String,
}

impl LiveChannel {
    pub fn new(push_url: impl Into<String>) -> Self {
        Self {
            push_url: push_url.into(),
        }
    }

    pub fn subscribe<F>(&self, user_id: &str, on_message: F) -> Result<LiveSubscription>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        if user_id.is_empty() {
            return Err(Error::NotSignedIn);
        }
        let mut url = Url::parse(&self.push_url)?;
        url.query_pairs_mut().append_pair("user", user_id);

        let user = user_id.to_string();
        let task = tokio::spawn(async move {
            let mut backoff = INITIAL_BACKOFF;
            loop {
                let (mut ws, _) = match connect_async(url.clone()).await {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("push connect failed for {}: {}", user, e);
                        tokio::time::sleep(backoff).await;
                        backoff = next_backoff(backoff);
                        continue;
                    }
                };
                info!("push channel connected for {}", user);
                backoff = INITIAL_BACKOFF;

                while let Some(frame) = ws.next().await {
                    match frame {
                        Ok(WsFrame::Text(text)) => {
                            if let Some(message) = decode_frame(&text) {
                                on_message(message);
                            }
                        }
                        Ok(WsFrame::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            warn!("push channel read error: {}", e);
                            break;
                        }
                    }
                }

                debug!("push channel for {} closed, reconnecting", user);
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
            }
        });

        Ok(LiveSubscription { task })
    }
}

/// Handle to a running subscription; delivery stops when this is dropped.
#[derive(Debug)]
pub struct LiveSubscription {
    task: JoinHandle<()>,
}

impl LiveSubscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

fn decode_frame(text: &str) -> Option<Message> {
    let event: IncomingEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("dropping undecodable push frame: {}", e);
            return None;
        }
    };
    if event.event_type != MESSAGE_EVENT {
        debug!("ignoring push event of type {}", event.event_type);
        return None;
    }
    match serde_json::from_value::<Message>(event.data) {
        Ok(message) => Some(message),
        Err(e) => {
            warn!("dropping malformed message event: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_message_frames() {
        let frame = r#"{
            "eventType": "message",
            "data": {
                "id": "m1",
                "sender": {"id": "b1", "name": "Broker"},
                "recipient": {"id": "u1", "name": "Ana"},
                "content": {"text": "viewing confirmed"},
                "createdAt": "2026-08-01T10:00:00Z"
            }
        }"#;
        let message = decode_frame(frame).expect("message frame");
        assert_eq!(message.id, "m1");
        assert_eq!(message.content.text, "viewing confirmed");
    }

    #[test]
    fn ignores_non_message_events() {
        let frame = r#"{"eventType": "typing", "data": {"user": "b1"}}"#;
        assert!(decode_frame(frame).is_none());
    }

    #[test]
    fn drops_message_events_missing_parties() {
        let frame = r#"{
            "eventType": "message",
            "data": {"id": "m1", "content": {"text": "hi"}, "createdAt": "2026-08-01T10:00:00Z"}
        }"#;
        assert!(decode_frame(frame).is_none());
    }

    #[test]
    fn drops_unparseable_frames() {
        assert!(decode_frame("not json").is_none());
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = INITIAL_BACKOFF;
        for _ in 0..10 {
            backoff = next_backoff(backoff);
        }
        assert_eq!(backoff, MAX_BACKOFF);
        assert_eq!(next_backoff(Duration::from_secs(3)), Duration::from_secs(6));
    }

    #[test]
    fn empty_user_id_is_refused() {
        let channel = LiveChannel::new("wss://push.homevista.example/ws");
        assert!(matches!(channel.subscribe("", |_| {}), Err(Error::NotSignedIn)));
    }
}
