//! Embedding provider trait and factory.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::RagConfig;
#[cfg(not(feature = "fastembed"))]
use crate::error::RagError;
use crate::error::Result;
use crate::hash_embed::HashEmbeddingProvider;

/// A provider that generates vector embeddings from text input.
///
/// Implementations must be deterministic for a fixed model: the same text
/// always yields the same vector, whether it is embedded alone or as part of a
/// batch. Input longer than the model accepts is truncated, never rejected.
///
/// The default [`embed_batch`](EmbeddingProvider::embed_batch) implementation
/// calls [`embed`](EmbeddingProvider::embed) sequentially; backends that
/// support native batching should override it.
///
/// # Example
///
/// ```rust,ignore
/// use pdf_rag::{EmbeddingProvider, HashEmbeddingProvider};
///
/// let provider = HashEmbeddingProvider::new(384)?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// Output order matches input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Return the model name, as configured.
    fn model_name(&self) -> &str;
}

/// Create the embedder named by `config.embedding_model`.
///
/// `hash-<dims>` selects [`HashEmbeddingProvider`]. Any other name is loaded
/// through fastembed when the `fastembed` feature is enabled.
///
/// # Errors
///
/// Returns [`RagError::Embedding`](crate::RagError::Embedding) if the model is unknown or
/// cannot be loaded.
pub fn embedder_from_config(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let model = config.embedding_model.trim();

    if let Some(provider) = HashEmbeddingProvider::from_model_name(model)? {
        info!(model, dimensions = provider.dimensions(), "using hash embedder");
        return Ok(Arc::new(provider));
    }

    load_model(model)
}

#[cfg(feature = "fastembed")]
fn load_model(model: &str) -> Result<Arc<dyn EmbeddingProvider>> {
    info!(model, "loading fastembed model");
    let provider = crate::fastembed_engine::FastEmbedProvider::try_new(model)?;
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "fastembed"))]
fn load_model(model: &str) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(RagError::embedding(
        model,
        "model unavailable: only `hash-<dims>` models are built in; enable the `fastembed` feature for sentence-transformer models",
    ))
}
