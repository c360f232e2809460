//! Gemini API client (generateContent, non-streaming).
//! https://generativelanguage.googleapis.com/v1beta by default.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::TextGenerator;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Finish reasons that mean the candidate text must not be used. Newer block reasons
/// are treated like SAFETY.
const BAD_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "LANGUAGE",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "OTHER",
];

/// Client for the Gemini HTTP API, bound to one model.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("gemini request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gemini api error: {0}")]
    Api(String),
    #[error("gemini response blocked: {0}")]
    Blocked(String),
    #[error("gemini returned no candidates")]
    Empty,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: &str, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model).to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            model,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST /models/{model}:generateContent with a single user turn.
    pub async fn generate_content(
        &self,
        prompt: &str,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };
        let res = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GeminiError::Api(format!("{} {}", status, body)));
        }
        let data: GenerateContentResponse = res.json().await?;
        Ok(data)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let response = self.generate_content(prompt).await?;
        response.text()
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate (all parts joined). Errors when the prompt or the
    /// candidate was blocked, or when there is no candidate at all.
    pub fn text(&self) -> Result<String, GeminiError> {
        let Some(first) = self.candidates.first() else {
            return match self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
            {
                Some(reason) => Err(GeminiError::Blocked(reason)),
                None => Err(GeminiError::Empty),
            };
        };
        if let Some(reason) = first.finish_reason.as_deref() {
            if BAD_FINISH_REASONS.contains(&reason) {
                return Err(GeminiError::Blocked(reason.to_string()));
            }
        }
        Ok(first
            .content
            .as_ref()
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn joins_parts_of_first_candidate() {
        let res = parse(
            r#"{"candidates":[
                {"content":{"role":"model","parts":[{"text":"hi "},{"text":"there"}]},"finishReason":"STOP"},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        );
        assert_eq!(res.text().unwrap(), "hi there");
    }

    #[test]
    fn blocked_prompt_is_error() {
        let res = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert!(matches!(res.text(), Err(GeminiError::Blocked(r)) if r == "SAFETY"));
    }

    #[test]
    fn no_candidates_is_empty_error() {
        let res = parse("{}");
        assert!(matches!(res.text(), Err(GeminiError::Empty)));
    }

    #[test]
    fn bad_finish_reason_is_error() {
        let res = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"partial"}]},"finishReason":"RECITATION"}]}"#,
        );
        assert!(matches!(res.text(), Err(GeminiError::Blocked(r)) if r == "RECITATION"));
    }

    #[test]
    fn unsupported_language_finish_is_error() {
        let res = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"partial"}]},"finishReason":"LANGUAGE"}]}"#,
        );
        assert!(matches!(res.text(), Err(GeminiError::Blocked(r)) if r == "LANGUAGE"));
    }

    #[test]
    fn max_tokens_keeps_partial_text() {
        let res = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"partial"}]},"finishReason":"MAX_TOKENS"}]}"#,
        );
        assert_eq!(res.text().unwrap(), "partial");
    }

    #[test]
    fn model_prefix_and_trailing_slash_are_normalized() {
        let client = GeminiClient::new("k", "models/gemini-pro", Some("http://x/v1beta/".into()));
        assert_eq!(client.model(), "gemini-pro");
        assert_eq!(client.base_url, "http://x/v1beta");
    }
}
