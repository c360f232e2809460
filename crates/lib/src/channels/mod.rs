//! Messaging channel (LINE).
//!
//! Webhook payload types, the reply client, and the signature check that guards the webhook.

use async_trait::async_trait;

mod line;
mod signature;

pub use line::{
    EventMessage, LineClient, LineError, OutboundMessage, ReplyResponse, SentMessage,
    TextMessageEvent, WebhookEvent, WebhookPayload,
};
pub use signature::{
    sign, verify_line_signature, verify_signature, ChannelSecret, SignatureError,
    MAX_BODY_BYTES, SIGNATURE_HEADER,
};

/// Sends replies to a conversation turn identified by a reply token.
#[async_trait]
pub trait ReplyClient: Send + Sync {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<ReplyResponse, LineError>;
}
