use log::warn;
use once_cell::sync::Lazy;
use reqwest::Client as HttpClient;
use serde_json::Value;

use crate::api::models::{Conversation, Message, PartyRef};
use crate::config::Settings;
use crate::error::{Error, Result};

// One connection pool for every client instance.
static HTTP: Lazy<HttpClient> = Lazy::new(HttpClient::new);

/// HTTP client for the marketplace messaging backend. Every call goes
/// through the same-origin proxy, which expects the session's bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: HTTP.clone(),
            base_url: base_url.into(),
            token,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.base_url.clone(), settings.token.clone())
    }

    fn with_auth(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        req
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Pull the list payload out of the response body, whether the backend
    /// answered with a bare array or wrapped it under a named key or `data`.
    fn extract_items(json: &Value, key: &str) -> Vec<Value> {
        if let Some(arr) = json.as_array() {
            arr.clone()
        } else if let Some(arr) = json.get(key).and_then(|v| v.as_array()) {
            arr.clone()
        } else if let Some(arr) = json.get("data").and_then(|v| v.as_array()) {
            arr.clone()
        } else {
            Vec::new()
        }
    }

    fn decode_items<T: serde::de::DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value::<T>(item) {
                Ok(value) => out.push(value),
                Err(e) => warn!("skipping malformed {} in response: {}", what, e),
            }
        }
        out
    }

    /// Fetch the authoritative conversation list, in server recency order.
    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        let req = self.with_auth(self.http.get(self.endpoint("conversations")));
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let json: Value = resp.json().await?;
        let items = Self::extract_items(&json, "conversations");
        Ok(Self::decode_items(items, "conversation"))
    }

    /// Fetch the message history with one counterpart, oldest first.
    pub async fn thread(&self, counterpart_id: &str) -> Result<Vec<Message>> {
        let req = self.with_auth(
            self.http
                .get(self.endpoint("messages"))
                .query(&[("with", counterpart_id)]),
        );
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let json: Value = resp.json().await?;
        let items = Self::extract_items(&json, "messages");
        Ok(Self::decode_items(items, "message"))
    }

    /// Resolve a broker profile, used to fill in a new-chat placeholder.
    pub async fn broker_profile(&self, broker_id: &str) -> Result<PartyRef> {
        let req = self.with_auth(self.http.get(self.endpoint(&format!("brokers/{}", broker_id))));
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let json: Value = resp.json().await?;
        let profile = json.get("data").cloned().unwrap_or(json);
        Ok(serde_json::from_value(profile)?)
    }

    /// Post one outgoing message. The backend answers with the stored
    /// message, which the service admits locally as the sender's echo.
    pub async fn send_message(&self, recipient_id: &str, text: &str) -> Result<Message> {
        let body = serde_json::json!({
            "recipient": recipient_id,
            "content": { "text": text },
        });
        let req = self.with_auth(self.http.post(self.endpoint("messages")).json(&body));
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let json: Value = resp.json().await?;
        let message = json.get("data").cloned().unwrap_or(json);
        Ok(serde_json::from_value(message)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_items_handles_bare_and_wrapped_arrays() {
        let bare = json!([{"a": 1}]);
        assert_eq!(ApiClient::extract_items(&bare, "conversations").len(), 1);

        let named = json!({"conversations": [{"a": 1}, {"a": 2}]});
        assert_eq!(ApiClient::extract_items(&named, "conversations").len(), 2);

        let data = json!({"data": [{"a": 1}]});
        assert_eq!(ApiClient::extract_items(&data, "conversations").len(), 1);

        let neither = json!({"total": 0});
        assert!(ApiClient::extract_items(&neither, "conversations").is_empty());
    }

    #[test]
    fn decode_items_skips_malformed_rows() {
        let items = vec![
            json!({
                "chatWith": {"id": "b1", "name": "Broker"},
                "content": {"text": "hi"},
                "createdAt": "2026-08-01T10:00:00Z",
                "updatedAt": "2026-08-01T10:00:00Z",
                "unreadCount": 2
            }),
            json!({"garbage": true}),
        ];
        let decoded: Vec<Conversation> = ApiClient::decode_items(items, "conversation");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].chat_with.id, "b1");
        assert_eq!(decoded[0].unread_count, 2);
    }

    #[test]
    fn endpoint_joins_against_trimmed_base() {
        let client = ApiClient::new("https://api.homevista.example/", None);
        assert_eq!(
            client.endpoint("conversations"),
            "https://api.homevista.example/api/v1/conversations"
        );
    }
}
