//! Data types for passages, collections and search results.

use serde::{Deserialize, Serialize};

/// One chunk of source text stored with its embedding.
///
/// Passages are immutable once written: the vector store never updates them
/// in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    /// Unique identifier within the collection.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The vector embedding for `text`.
    pub embedding: Vec<f32>,
    /// Name of the owning collection.
    pub collection: String,
}

/// A retrieved [`Passage`] paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved passage.
    pub passage: Passage,
    /// Cosine similarity to the query embedding (higher is more relevant).
    pub score: f32,
}

/// A handle to an opened collection.
///
/// Obtained from [`VectorStore::open_or_create`](crate::VectorStore::open_or_create).
/// The handle only names the collection; it holds no locks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionHandle {
    name: String,
}

impl CollectionHandle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
