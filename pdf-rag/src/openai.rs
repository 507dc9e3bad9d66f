//! OpenAI-compatible chat completion client.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::CompletionConfig;
use crate::error::{RagError, Result};
use crate::synthesis::{CompletionClient, CompletionRequest};

const PROVIDER: &str = "OpenAI";

/// A [`CompletionClient`] backed by the `/chat/completions` endpoint.
///
/// Uses `reqwest` directly. Any OpenAI-compatible server works through
/// [`CompletionConfig::base_url`].
///
/// # Example
///
/// ```rust,ignore
/// use pdf_rag::{CompletionConfig, OpenAICompletionClient};
///
/// let client = OpenAICompletionClient::new(CompletionConfig::new("sk-..."))?;
/// ```
pub struct OpenAICompletionClient {
    client: reqwest::Client,
    config: CompletionConfig,
    endpoint: String,
}

impl OpenAICompletionClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: CompletionConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(RagError::generation(PROVIDER, "API key must not be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                RagError::generation(PROVIDER, format!("failed to build HTTP client: {e}"))
            })?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self { client, config, endpoint })
    }
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── CompletionClient implementation ────────────────────────────────

#[async_trait]
impl CompletionClient for OpenAICompletionClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.config.model,
            prompt_len = request.prompt.len(),
            max_tokens = request.max_tokens,
            "sending completion request"
        );

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                RagError::generation(PROVIDER, format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            return Err(RagError::generation(PROVIDER, format!("API returned {status}: {detail}")));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::generation(PROVIDER, format!("failed to parse response: {e}"))
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::generation(PROVIDER, "response contained no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_the_chat_api() {
        let body = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            max_tokens: 256,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 256,
                "temperature": 0.0
            })
        );
    }

    #[test]
    fn parses_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"30 days."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("30 days."));
    }

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let mut config = CompletionConfig::new("sk-test");
        config.base_url = "http://localhost:1234/v1/".into();
        let client = OpenAICompletionClient::new(config).unwrap();
        assert_eq!(client.endpoint, "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            OpenAICompletionClient::new(CompletionConfig::new("")),
            Err(RagError::Generation { .. })
        ));
    }
}
