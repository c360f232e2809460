//! In-memory generator and reply client for unit tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::channels::{LineError, OutboundMessage, ReplyClient, ReplyResponse, SentMessage};
use crate::llm::{GeminiError, TextGenerator};

/// Answers with a fixed text, or fails every call when `fail` is set.
pub struct FixedGenerator {
    pub answer: String,
    pub fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl FixedGenerator {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: String::new(),
            fail: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            Err(GeminiError::Api("503 Service Unavailable network down".to_string()))
        } else {
            Ok(self.answer.clone())
        }
    }
}

/// Records every reply; rejects tokens listed in `rejected_tokens`.
#[derive(Default)]
pub struct RecordingReplier {
    pub rejected_tokens: Vec<String>,
    pub calls: Mutex<Vec<(String, Vec<OutboundMessage>)>>,
}

impl RecordingReplier {
    pub fn rejecting(tokens: &[&str]) -> Self {
        Self {
            rejected_tokens: tokens.iter().map(|t| t.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<OutboundMessage>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyClient for RecordingReplier {
    async fn reply(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<ReplyResponse, LineError> {
        self.calls
            .lock()
            .unwrap()
            .push((reply_token.to_string(), messages.to_vec()));
        if self.rejected_tokens.iter().any(|t| t == reply_token) {
            return Err(LineError::Api(
                "400 Bad Request {\"message\":\"Invalid reply token\"}".to_string(),
            ));
        }
        Ok(ReplyResponse {
            sent_messages: vec![SentMessage {
                id: format!("sent-{}", reply_token),
                quote_token: None,
            }],
        })
    }
}
