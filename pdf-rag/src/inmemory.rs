//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps every collection in a `Vec` behind a
//! `tokio::sync::RwLock`. Nothing is persisted; use it for tests and demos.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{CollectionHandle, Passage, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, check_parallel, cosine_similarity, first_repeated, rank};

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct MemoryCollection {
    ids: HashSet<String>,
    passages: Vec<Passage>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Passages are kept in insertion order, which is also the tie-break order.
///
/// # Example
///
/// ```rust,ignore
/// use pdf_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// let docs = store.open_or_create("docs").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(name: &str) -> RagError {
    RagError::vector_store(BACKEND, format!("collection '{name}' does not exist"))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn open_or_create(&self, name: &str) -> Result<CollectionHandle> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(CollectionHandle::new(name))
    }

    async fn add(
        &self,
        handle: &CollectionHandle,
        ids: &[String],
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        check_parallel(BACKEND, ids, texts, embeddings)?;

        let mut collections = self.collections.write().await;
        let store = collections.get_mut(handle.name()).ok_or_else(|| missing(handle.name()))?;

        let duplicate =
            first_repeated(ids).or_else(|| ids.iter().find(|id| store.ids.contains(*id)));
        if let Some(id) = duplicate {
            return Err(RagError::DuplicateId {
                collection: handle.name().to_string(),
                id: id.clone(),
            });
        }

        for ((id, text), embedding) in ids.iter().zip(texts).zip(embeddings) {
            store.ids.insert(id.clone());
            store.passages.push(Passage {
                id: id.clone(),
                text: text.clone(),
                embedding: embedding.clone(),
                collection: handle.name().to_string(),
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        handle: &CollectionHandle,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(handle.name()).ok_or_else(|| missing(handle.name()))?;

        let scored = store
            .passages
            .iter()
            .map(|passage| {
                let score = cosine_similarity(BACKEND, embedding, &passage.embedding)?;
                Ok(SearchResult { passage: passage.clone(), score })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(rank(scored, top_k))
    }

    async fn count(&self, handle: &CollectionHandle) -> Result<usize> {
        let collections = self.collections.read().await;
        Ok(collections.get(handle.name()).map_or(0, |c| c.passages.len()))
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }
}
