//! Generative model abstraction and Gemini client.
//!
//! The relay only needs one operation: submit text, get generated text back.

use async_trait::async_trait;

mod gemini;

pub use gemini::{
    Candidate, Content, GeminiClient, GeminiError, GenerateContentResponse, Part, PromptFeedback,
};

/// Turns a prompt into generated text. Implementations must be safe to call concurrently.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError>;
}
