//! Retrieval-augmented question answering over PDF documents.
//!
//! This crate provides:
//! - PDF text extraction and hierarchical, overlapping chunking
//! - Deterministic embedding (built-in hash embedder, fastembed behind a feature)
//! - A persistent, sled-backed vector store with named collections
//! - Cosine-similarity retrieval and answer synthesis through an
//!   OpenAI-compatible completion API, with a raw-context fallback
//!
//! # Feature flags
//!
//! | Feature     | Enables                                   |
//! |-------------|-------------------------------------------|
//! | `openai`    | [`OpenAICompletionClient`] (default)      |
//! | `fastembed` | [`FastEmbedProvider`] (local ONNX models) |
//! | `full`      | everything                                |

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod hash_embed;
pub mod inmemory;
pub mod pipeline;
pub mod retriever;
pub mod sled_store;
pub mod synthesis;
pub mod vectorstore;

#[cfg(feature = "fastembed")]
pub mod fastembed_engine;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, RecursiveChunker, chunk_text};
pub use config::{CompletionConfig, RagConfig, RagConfigBuilder};
pub use document::{CollectionHandle, Passage, SearchResult};
pub use embedding::{EmbeddingProvider, embedder_from_config};
pub use error::{RagError, Result};
pub use extract::{PdfExtractor, TextExtractor};
pub use hash_embed::HashEmbeddingProvider;
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use sled_store::SledVectorStore;
pub use synthesis::{
    AnswerSynthesizer, CONTEXT_SEPARATOR, CompletionClient, CompletionRequest,
    NO_RELEVANT_DOCUMENTS, build_prompt,
};
pub use vectorstore::VectorStore;

#[cfg(feature = "fastembed")]
pub use fastembed_engine::FastEmbedProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAICompletionClient;
