//! Error types for the `pdf-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// The PDF could not be opened or parsed (missing, corrupt or encrypted file).
    #[error("Extraction error ({path}): {message}")]
    Extraction {
        /// Path of the file that failed.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// Chunk size and overlap are inconsistent.
    #[error("Invalid chunk configuration: {0}")]
    InvalidChunkConfig(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A passage id collided with one already stored in the collection.
    #[error("Duplicate passage id '{id}' in collection '{collection}'")]
    DuplicateId {
        /// The collection being written.
        collection: String,
        /// The colliding id.
        id: String,
    },

    /// The completion service failed. Callers may fall back to the raw context.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    pub(crate) fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction { path: path.into(), message: message.into() }
    }

    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn vector_store(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VectorStore { backend: backend.into(), message: message.into() }
    }

    /// Whether the caller can reasonably degrade instead of failing.
    ///
    /// Only completion failures qualify: the retrieved context is still valid
    /// and can be shown as-is.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Generation { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
