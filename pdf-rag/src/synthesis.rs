//! Answer synthesis from retrieved passages.
//!
//! [`AnswerSynthesizer`] joins passages into a context block and either asks a
//! [`CompletionClient`] to answer from it or, without a client, returns the
//! context block itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::{CompletionConfig, RagConfig};
use crate::error::{RagError, Result};

/// Answer returned when retrieval finds nothing.
pub const NO_RELEVANT_DOCUMENTS: &str = "No relevant documents found in the database.";

/// Separator placed between passages in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Decoding temperature for every completion request.
pub const TEMPERATURE: f32 = 0.0;

/// A single, non-streaming completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// Full user prompt, context included.
    pub prompt: String,
    /// Output-length cap.
    pub max_tokens: u32,
    /// Decoding temperature.
    pub temperature: f32,
}

/// A completion service that turns a prompt into answer text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// Send one request and return the generated text.
    ///
    /// Failures must surface as [`RagError::Generation`].
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Build the prompt sent to the completion service.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Context:\n{context}\n\nQuestion:\n{question}\n\n\
         Provide a concise answer citing parts of the context. \
         If the answer is not in the context, say you don't know."
    )
}

/// Composes retrieved passages into an answer.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    client: Option<Arc<dyn CompletionClient>>,
    max_tokens: u32,
}

impl AnswerSynthesizer {
    /// A synthesizer that always answers with the raw context block.
    pub fn raw_context() -> Self {
        Self { client: None, max_tokens: 0 }
    }

    /// A synthesizer that asks `client` to answer, capped at `max_tokens`.
    pub fn with_client(client: Arc<dyn CompletionClient>, max_tokens: u32) -> Self {
        Self { client: Some(client), max_tokens }
    }

    /// Pick the synthesis mode from `config.completion`.
    ///
    /// With a credential configured this builds an OpenAI-compatible client;
    /// without one, or without the `openai` feature, it falls back to the raw
    /// context.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the HTTP client cannot be built.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let Some(completion) = &config.completion else {
            return Ok(Self::raw_context());
        };

        client_for(completion)
    }

    /// Whether answers go through a completion service.
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Answer `question` from `passages`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the completion service fails or
    /// returns empty text. No retry is attempted.
    pub async fn synthesize(&self, passages: &[String], question: &str) -> Result<String> {
        if passages.is_empty() {
            debug!(state = "no_results", "no passages to synthesize from");
            return Ok(NO_RELEVANT_DOCUMENTS.to_string());
        }

        let context = passages.join(CONTEXT_SEPARATOR);
        debug!(
            state = "context_assembled",
            passage_count = passages.len(),
            context_len = context.len()
        );

        let Some(client) = &self.client else {
            debug!(state = "fallback_raw", "no completion service configured");
            return Ok(raw_answer(passages.len(), &context));
        };

        let request = CompletionRequest {
            prompt: build_prompt(&context, question),
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
        };

        let answer = client.complete(&request).await.map_err(|e| {
            error!(provider = client.name(), error = %e, "completion failed");
            match e {
                RagError::Generation { .. } => e,
                other => RagError::generation(client.name(), other.to_string()),
            }
        })?;

        if answer.trim().is_empty() {
            warn!(provider = client.name(), "completion returned empty text");
            return Err(RagError::generation(client.name(), "completion returned empty text"));
        }

        debug!(state = "synthesized", provider = client.name(), answer_len = answer.len());
        Ok(answer)
    }
}

#[cfg(feature = "openai")]
fn client_for(completion: &CompletionConfig) -> Result<AnswerSynthesizer> {
    let client = crate::openai::OpenAICompletionClient::new(completion.clone())?;
    Ok(AnswerSynthesizer::with_client(Arc::new(client), completion.max_tokens))
}

#[cfg(not(feature = "openai"))]
fn client_for(completion: &CompletionConfig) -> Result<AnswerSynthesizer> {
    warn!(model = %completion.model, "completion key set but the `openai` feature is disabled; answering with raw context");
    Ok(AnswerSynthesizer::raw_context())
}

fn raw_answer(count: usize, context: &str) -> String {
    format!("Retrieved {count} passages (no completion service configured):\n\n{context}")
}
