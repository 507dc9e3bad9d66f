//! Query-time retrieval: embed the question, search the collection.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::SearchResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Embeds a query and returns the most similar passages of a collection.
///
/// The embedder must be the one the collection was ingested with.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// Create a retriever over `store` using `embedder` for queries.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Return the texts of the `top_k` passages most similar to `query`, most
    /// similar first.
    ///
    /// A collection that was never ingested yields an empty `Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `top_k` is zero, and propagates
    /// embedding and store errors.
    pub async fn retrieve(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<String>> {
        let results = self.search(collection, query, top_k).await?;
        Ok(results.into_iter().map(|r| r.passage.text).collect())
    }

    /// Like [`retrieve`](Self::retrieve) but keeps ids and scores.
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(RagError::Config("top_k must be at least 1".to_string()));
        }

        debug!(state = "embedding_query", collection, query_len = query.len());
        let embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(collection, error = %e, "query embedding failed");
            e
        })?;

        debug!(state = "vector_search", collection, top_k);
        let handle = self.store.open_or_create(collection).await?;
        let results = self.store.query(&handle, &embedding, top_k).await.map_err(|e| {
            error!(collection, error = %e, "vector search failed");
            e
        })?;

        debug!(state = "retrieved", collection, result_count = results.len());
        Ok(results)
    }
}
