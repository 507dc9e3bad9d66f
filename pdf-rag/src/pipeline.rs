//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] ties the stages together. Ingestion runs
//! extract → chunk → embed → store; answering runs
//! embed → search → synthesize.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdf_rag::{RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::from_config(RagConfig::from_env()?)?;
//! let stored = pipeline.ingest_with_defaults("handbook.pdf", "handbook").await?;
//! let answer = pipeline.answer_with_defaults("handbook", "What is the refund policy?").await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::embedding::{EmbeddingProvider, embedder_from_config};
use crate::error::{RagError, Result};
use crate::extract::{PdfExtractor, TextExtractor};
use crate::retriever::Retriever;
use crate::sled_store::SledVectorStore;
use crate::synthesis::AnswerSynthesizer;
use crate::vectorstore::VectorStore;

/// The RAG pipeline orchestrator.
///
/// Construct one with [`RagPipeline::from_config`] for the persistent default
/// stack, or with [`RagPipeline::builder()`] to swap components.
pub struct RagPipeline {
    config: RagConfig,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Build the default stack from `config`: PDF extraction, the configured
    /// embedder, a sled store at `persist_dir` and the configured synthesizer.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be opened, the embedding model cannot be
    /// loaded, or the completion client cannot be built.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let store = SledVectorStore::open(&config.persist_dir)?;
        let embedder = embedder_from_config(&config)?;
        let synthesizer = AnswerSynthesizer::from_config(&config)?;

        info!(
            persist_dir = %config.persist_dir.display(),
            embedding_model = %config.embedding_model,
            completion = synthesizer.has_client(),
            "pipeline ready"
        );

        Self::builder()
            .config(config)
            .extractor(Arc::new(PdfExtractor::new()))
            .embedder(embedder)
            .vector_store(Arc::new(store))
            .synthesizer(synthesizer)
            .build()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Extract, chunk, embed and store one PDF into `collection`.
    ///
    /// Returns the number of passages stored. A PDF without extractable text
    /// stores nothing and returns `0`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidChunkConfig`] before touching the file if
    /// `chunk_overlap >= chunk_size`, [`RagError::Extraction`] if the PDF
    /// cannot be read, and embedding or store errors otherwise.
    pub async fn ingest(
        &self,
        pdf_path: impl AsRef<Path>,
        collection: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<usize> {
        let chunker = RecursiveChunker::new(chunk_size, chunk_overlap)?;
        let path = pdf_path.as_ref();

        info!(state = "extracting", path = %path.display(), collection);
        let text = self.extractor.extract(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "extraction failed");
            e
        })?;

        if text.trim().is_empty() {
            warn!(path = %path.display(), "no extractable text found in PDF");
            info!(state = "done", collection, passage_count = 0, "ingested PDF (no text)");
            return Ok(0);
        }

        let stored = self.store_chunks(&chunker, collection, &text).await?;
        info!(
            state = "done",
            path = %path.display(),
            collection,
            passage_count = stored,
            "ingested PDF"
        );
        Ok(stored)
    }

    /// [`ingest`](Self::ingest) with the configured chunk size and overlap.
    pub async fn ingest_with_defaults(
        &self,
        pdf_path: impl AsRef<Path>,
        collection: &str,
    ) -> Result<usize> {
        self.ingest(pdf_path, collection, self.config.chunk_size, self.config.chunk_overlap).await
    }

    /// Chunk, embed and store already-extracted text into `collection`.
    ///
    /// Returns the number of passages stored; whitespace-only text stores
    /// nothing.
    pub async fn ingest_text(
        &self,
        collection: &str,
        text: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<usize> {
        let chunker = RecursiveChunker::new(chunk_size, chunk_overlap)?;
        if text.trim().is_empty() {
            return Ok(0);
        }
        self.store_chunks(&chunker, collection, text).await
    }

    async fn store_chunks(
        &self,
        chunker: &dyn Chunker,
        collection: &str,
        text: &str,
    ) -> Result<usize> {
        let chunks = chunker.split(text);
        info!(state = "chunked", collection, chunk_count = chunks.len(), text_len = text.len());
        if chunks.is_empty() {
            return Ok(0);
        }

        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&refs).await.map_err(|e| {
            error!(collection, error = %e, "embedding failed during ingestion");
            e
        })?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::embedding(
                self.embedder.model_name(),
                format!("expected {} embeddings, got {}", chunks.len(), embeddings.len()),
            ));
        }
        info!(state = "embedded", collection, model = self.embedder.model_name());

        let ids: Vec<String> = chunks.iter().map(|_| uuid::Uuid::new_v4().to_string()).collect();
        let handle = self.store.open_or_create(collection).await?;
        self.store.add(&handle, &ids, &chunks, &embeddings).await.map_err(|e| {
            error!(collection, error = %e, "store write failed during ingestion");
            e
        })?;
        info!(state = "stored", collection, passage_count = ids.len());

        Ok(ids.len())
    }

    /// Return the texts of the `top_k` passages most similar to `question`.
    pub async fn retrieve(
        &self,
        collection: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<String>> {
        self.retriever.retrieve(collection, question, top_k).await
    }

    /// Retrieve passages for `question` and synthesize an answer.
    ///
    /// An empty or never-ingested collection answers with
    /// [`NO_RELEVANT_DOCUMENTS`](crate::NO_RELEVANT_DOCUMENTS).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `top_k` is zero and
    /// [`RagError::Generation`] if the completion service fails.
    pub async fn answer(&self, collection: &str, question: &str, top_k: usize) -> Result<String> {
        let passages = self.retriever.retrieve(collection, question, top_k).await?;
        let answer = self.synthesizer.synthesize(&passages, question).await?;
        info!(
            collection,
            passage_count = passages.len(),
            answer_len = answer.len(),
            "answered question"
        );
        Ok(answer)
    }

    /// [`answer`](Self::answer) with the configured `top_k`.
    pub async fn answer_with_defaults(&self, collection: &str, question: &str) -> Result<String> {
        self.answer(collection, question, self.config.top_k).await
    }

    /// Names of all collections in the store, sorted.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.store.list_collections().await
    }

    /// Number of passages stored in `collection`.
    pub async fn count(&self, collection: &str) -> Result<usize> {
        let handle = self.store.open_or_create(collection).await?;
        self.store.count(&handle).await
    }

    /// Delete `collection` and all its passages.
    pub async fn delete_collection(&self, collection: &str) -> Result<()> {
        self.store.delete_collection(collection).await.map_err(|e| {
            error!(collection, error = %e, "failed to delete collection");
            e
        })?;
        info!(collection, "deleted collection");
        Ok(())
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedder` and `vector_store` are required. The config defaults to
/// [`RagConfig::default()`], the extractor to [`PdfExtractor`] and the
/// synthesizer to [`AnswerSynthesizer::raw_context()`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .embedder(Arc::new(HashEmbeddingProvider::new(384)?))
///     .vector_store(Arc::new(InMemoryVectorStore::new()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    extractor: Option<Arc<dyn TextExtractor>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    synthesizer: Option<AnswerSynthesizer>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the embedding provider.
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the answer synthesizer.
    pub fn synthesizer(mut self, synthesizer: AnswerSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let embedder =
            self.embedder.ok_or_else(|| RagError::Config("embedder is required".to_string()))?;
        let store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;

        Ok(RagPipeline {
            config: self.config.unwrap_or_default(),
            extractor: self.extractor.unwrap_or_else(|| Arc::new(PdfExtractor::new())),
            retriever: Retriever::new(Arc::clone(&embedder), Arc::clone(&store)),
            embedder,
            store,
            synthesizer: self.synthesizer.unwrap_or_else(AnswerSynthesizer::raw_context),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_embed::HashEmbeddingProvider;
    use crate::inmemory::InMemoryVectorStore;

    fn pipeline() -> RagPipeline {
        RagPipeline::builder()
            .embedder(Arc::new(HashEmbeddingProvider::new(64).unwrap()))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_embedder_and_store() {
        assert!(matches!(RagPipeline::builder().build(), Err(RagError::Config(_))));
        assert!(matches!(
            RagPipeline::builder()
                .embedder(Arc::new(HashEmbeddingProvider::new(8).unwrap()))
                .build(),
            Err(RagError::Config(_))
        ));
    }

    #[tokio::test]
    async fn bad_chunk_config_fails_before_extraction() {
        let err = pipeline().ingest("/does/not/exist.pdf", "docs", 100, 100).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidChunkConfig(_)));
    }

    #[tokio::test]
    async fn whitespace_text_stores_nothing() {
        let pipeline = pipeline();
        assert_eq!(pipeline.ingest_text("docs", " \n\t ", 500, 100).await.unwrap(), 0);
        assert!(pipeline.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ingested_text_is_counted_and_retrievable() {
        let pipeline = pipeline();
        let stored = pipeline
            .ingest_text("docs", "Refund policy: refunds within 30 days.", 500, 100)
            .await
            .unwrap();
        assert_eq!(stored, 1);
        assert_eq!(pipeline.count("docs").await.unwrap(), 1);

        let hits = pipeline.retrieve("docs", "refund policy", 3).await.unwrap();
        assert_eq!(hits, vec!["Refund policy: refunds within 30 days.".to_string()]);
    }
}
