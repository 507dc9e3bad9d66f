//! Local sentence-transformer embeddings through `fastembed`.
//!
//! This module is only available when the `fastembed` feature is enabled.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use parking_lot::Mutex;
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "fastembed";

/// An [`EmbeddingProvider`] backed by a locally loaded ONNX model.
///
/// The model is loaded once in [`try_new`](FastEmbedProvider::try_new) and kept
/// for the provider's lifetime behind a mutex. Inference runs on tokio's
/// blocking pool. Inputs longer than the model's sequence limit are truncated
/// by the tokenizer.
pub struct FastEmbedProvider {
    model_label: String,
    dimensions: usize,
    inner: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedProvider {
    /// Load the named model (for example `all-MiniLM-L6-v2` or `BAAI/bge-small-en-v1.5`).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the name is unknown or the model
    /// cannot be downloaded or initialised.
    pub fn try_new(model_name: &str) -> Result<Self> {
        let label = model_name.trim();
        if label.is_empty() {
            return Err(RagError::embedding(PROVIDER, "model name cannot be empty"));
        }

        let embedding_model = parse_model(label)?;

        let model_info = TextEmbedding::get_model_info(&embedding_model).map_err(|err| {
            RagError::embedding(PROVIDER, format!("unable to read metadata for `{label}`: {err}"))
        })?;
        let dimensions = model_info.dim;

        let text_embedding = TextEmbedding::try_new(TextInitOptions::new(embedding_model))
            .map_err(|err| {
                RagError::embedding(PROVIDER, format!("failed to initialise `{label}`: {err}"))
            })?;

        Ok(Self {
            model_label: label.to_string(),
            dimensions,
            inner: Arc::new(Mutex::new(text_embedding)),
        })
    }
}

fn parse_model(label: &str) -> Result<EmbeddingModel> {
    match label {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Ok(EmbeddingModel::AllMiniLML6V2)
        }
        other => EmbeddingModel::from_str(other).map_err(|err| {
            RagError::embedding(PROVIDER, format!("unknown model `{other}`: {err}"))
        }),
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_batch(&[text]).await?;
        results.pop().ok_or_else(|| RagError::embedding(PROVIDER, "model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model_label,
            "embedding batch"
        );

        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let inner = Arc::clone(&self.inner);
        let embeddings = tokio::task::spawn_blocking(move || inner.lock().embed(owned, None))
            .await
            .map_err(|e| RagError::embedding(PROVIDER, format!("inference task failed: {e}")))?
            .map_err(|e| RagError::embedding(PROVIDER, format!("inference failed: {e}")))?;

        if let Some(bad) = embeddings.iter().find(|v| v.len() != self.dimensions) {
            return Err(RagError::embedding(
                PROVIDER,
                format!(
                    "unexpected embedding dimension (expected {}, got {})",
                    self.dimensions,
                    bad.len()
                ),
            ));
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_label
    }
}
