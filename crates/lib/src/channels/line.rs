//! LINE channel: webhook payload types and the reply API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ReplyClient;

const LINE_API_BASE: &str = "https://api.line.me";

/// Webhook POST body. Events stay raw so one malformed event does not reject the batch.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// One webhook event. Only the fields the relay reads are typed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: Option<EventMessage>,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub webhook_event_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A text message event that can be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMessageEvent<'a> {
    pub reply_token: &'a str,
    pub text: &'a str,
}

impl WebhookEvent {
    /// Some when this is a text message with a reply token; None for everything else.
    pub fn text_message(&self) -> Option<TextMessageEvent<'_>> {
        if self.kind != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.kind != "text" {
            return None;
        }
        Some(TextMessageEvent {
            reply_token: self.reply_token.as_deref()?,
            text: message.text.as_deref()?,
        })
    }
}

/// Outbound message object for the reply API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Text { text: String },
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundMessage::Text { text: text.into() }
    }
}

/// Reply API acknowledgement. Older API versions answer `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    #[serde(default)]
    pub sent_messages: Vec<SentMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: &'a [OutboundMessage],
    notification_disabled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("line request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("line api error: {0}")]
    Api(String),
}

/// LINE Messaging API client (reply only).
#[derive(Clone)]
pub struct LineClient {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl LineClient {
    pub fn new(access_token: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_API_BASE.to_string());
        Self {
            base_url,
            access_token: access_token.into(),
            client: reqwest::Client::new(),
        }
    }

    /// POST /v2/bot/message/reply. The reply token is single-use; the platform rejects reuse.
    pub async fn reply_message(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<ReplyResponse, LineError> {
        let url = format!("{}/v2/bot/message/reply", self.base_url);
        let body = ReplyRequest {
            reply_token,
            messages,
            notification_disabled: false,
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(LineError::Api(format!("{} {}", status, body)));
        }
        let text = res.text().await?;
        if text.trim().is_empty() {
            return Ok(ReplyResponse::default());
        }
        match serde_json::from_str(&text) {
            Ok(ack) => Ok(ack),
            Err(e) => {
                log::debug!("line reply: unrecognized acknowledgement body: {}", e);
                Ok(ReplyResponse::default())
            }
        }
    }
}

#[async_trait]
impl ReplyClient for LineClient {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<ReplyResponse, LineError> {
        self.reply_message(reply_token, messages).await
    }
}
