//! Vector store trait for storing and searching passage embeddings.

use async_trait::async_trait;

use crate::document::{CollectionHandle, SearchResult};
use crate::error::{RagError, Result};

/// A storage backend for passage embeddings with similarity search.
///
/// Implementations manage named collections of [`Passage`](crate::Passage)s.
/// Passages are append-only: an id that already exists in the collection is a
/// [`RagError::DuplicateId`], never an overwrite. Similarity is cosine.
///
/// Every passage in a collection is expected to come from the same embedding
/// model; stores do not check this on write.
///
/// # Example
///
/// ```rust,ignore
/// use pdf_rag::{SledVectorStore, VectorStore};
///
/// let store = SledVectorStore::open("data/chroma")?;
/// let docs = store.open_or_create("docs").await?;
/// store.add(&docs, &ids, &texts, &embeddings).await?;
/// let results = store.query(&docs, &query_embedding, 3).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Open a named collection, creating it empty if it does not exist.
    ///
    /// Repeated calls with the same name return handles to the same data.
    async fn open_or_create(&self, name: &str) -> Result<CollectionHandle>;

    /// Append passages given as parallel slices of equal length.
    ///
    /// The write is all-or-nothing and durable once this returns.
    async fn add(
        &self,
        handle: &CollectionHandle,
        ids: &[String],
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()>;

    /// Return up to `top_k` passages ordered by descending similarity.
    ///
    /// Ties keep the store's internal order. An empty collection yields an
    /// empty `Vec`.
    async fn query(
        &self,
        handle: &CollectionHandle,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of passages stored in the collection.
    async fn count(&self, handle: &CollectionHandle) -> Result<usize>;

    /// Names of all collections, sorted.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Delete a named collection and all its passages. No-op if it is absent.
    async fn delete_collection(&self, name: &str) -> Result<()>;
}

/// Check that the parallel slices given to [`VectorStore::add`] line up.
pub(crate) fn check_parallel(
    backend: &str,
    ids: &[String],
    texts: &[String],
    embeddings: &[Vec<f32>],
) -> Result<()> {
    if ids.len() != texts.len() || ids.len() != embeddings.len() {
        return Err(RagError::vector_store(
            backend,
            format!(
                "ids ({}), texts ({}) and embeddings ({}) must have equal length",
                ids.len(),
                texts.len(),
                embeddings.len()
            ),
        ));
    }
    Ok(())
}

/// Find the first id that repeats within one `add` call.
pub(crate) fn first_repeated(ids: &[String]) -> Option<&String> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().find(|id| !seen.insert(id.as_str()))
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
///
/// # Errors
///
/// Returns [`RagError::VectorStore`] if the dimensions differ.
pub(crate) fn cosine_similarity(backend: &str, a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::vector_store(
            backend,
            format!("embedding dimension mismatch: query {} vs stored {}", a.len(), b.len()),
        ));
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Sort by descending score, keeping input order for ties, and keep `top_k`.
pub(crate) fn rank(mut scored: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    scored
}
