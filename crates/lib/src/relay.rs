//! Per-event relay: text message -> model -> reply.
//!
//! Only text messages are answered. Generation failures are answered with the configured
//! apology; reply failures are returned to the caller, since the token is spent either way.

use crate::channels::{LineError, OutboundMessage, ReplyClient, ReplyResponse, WebhookEvent};
use crate::llm::TextGenerator;

/// Handle one event. `Ok(None)` means the event was ignored and nothing was sent.
pub async fn handle_event(
    generator: &dyn TextGenerator,
    replier: &dyn ReplyClient,
    error_message: &str,
    event: &WebhookEvent,
) -> Result<Option<ReplyResponse>, LineError> {
    let Some(msg) = event.text_message() else {
        log::debug!("relay: ignoring {} event", event.kind);
        return Ok(None);
    };
    log::debug!(
        "relay: answering event {}",
        event.webhook_event_id.as_deref().unwrap_or("-")
    );

    let reply = match generator.generate(msg.text).await {
        Ok(text) => OutboundMessage::text(text),
        Err(e) => {
            log::error!("relay: generation failed: {}", e);
            OutboundMessage::text(error_message)
        }
    };

    let ack = replier
        .reply(msg.reply_token, std::slice::from_ref(&reply))
        .await?;
    Ok(Some(ack))
}

/// Handle one raw event from the webhook body. Events that do not parse are ignored.
pub async fn handle_raw_event(
    generator: &dyn TextGenerator,
    replier: &dyn ReplyClient,
    error_message: &str,
    raw: &serde_json::Value,
) -> Result<Option<ReplyResponse>, LineError> {
    let event: WebhookEvent = match serde_json::from_value(raw.clone()) {
        Ok(ev) => ev,
        Err(e) => {
            log::debug!("relay: ignoring malformed event: {}", e);
            return Ok(None);
        }
    };
    handle_event(generator, replier, error_message, &event).await
}
