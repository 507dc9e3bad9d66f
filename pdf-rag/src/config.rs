//! Configuration for the RAG pipeline.
//!
//! [`RagConfig`] is passed explicitly into every component constructor; nothing
//! in this crate reads process-wide state except [`RagConfig::from_env`].

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default root directory for all collections.
pub const DEFAULT_PERSIST_DIR: &str = "data/chroma";

/// Default embedding model.
///
/// With the `fastembed` feature this is the sentence-transformers MiniLM model;
/// without it the offline hash embedder is the only model available.
#[cfg(feature = "fastembed")]
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
/// Default embedding model.
///
/// With the `fastembed` feature this is the sentence-transformers MiniLM model;
/// without it the offline hash embedder is the only model available.
#[cfg(not(feature = "fastembed"))]
pub const DEFAULT_EMBEDDING_MODEL: &str = "hash-384";

/// Default chat completion model.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";

/// Default base URL of the OpenAI-compatible completion API.
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variables recognised by [`RagConfig::from_env`].
pub mod env {
    /// Root directory of the persistent store.
    pub const PERSIST_DIR: &str = "PERSIST_DIR";
    /// Credential for the completion service; its presence enables synthesis.
    pub const COMPLETION_API_KEY: &str = "COMPLETION_API_KEY";
    /// Accepted when `COMPLETION_API_KEY` is unset.
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    /// Embedding model name.
    pub const EMBEDDING_MODEL_NAME: &str = "EMBEDDING_MODEL_NAME";
    /// Chat completion model name.
    pub const COMPLETION_MODEL: &str = "COMPLETION_MODEL";
    /// Base URL of the completion API.
    pub const COMPLETION_BASE_URL: &str = "COMPLETION_BASE_URL";
    /// Output-length cap for completions.
    pub const COMPLETION_MAX_TOKENS: &str = "COMPLETION_MAX_TOKENS";
    /// HTTP timeout for completion requests, in seconds.
    pub const COMPLETION_TIMEOUT_SECS: &str = "COMPLETION_TIMEOUT_SECS";
}

/// Settings for the external completion service.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionConfig {
    /// API credential. Never serialized.
    #[serde(skip_serializing, default)]
    pub api_key: String,
    /// Chat model name.
    pub model: String,
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,
    /// Maximum number of tokens in the generated answer.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl CompletionConfig {
    /// Create settings for the given credential with default model and limits.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
            max_tokens: 256,
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Root directory holding every collection.
    pub persist_dir: PathBuf,
    /// Embedding model name. Must stay the same across ingest and query of a collection.
    pub embedding_model: String,
    /// Default maximum chunk size in characters.
    pub chunk_size: usize,
    /// Default number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Default number of passages retrieved per question.
    pub top_k: usize,
    /// Completion service settings; `None` selects the raw-context fallback.
    pub completion: Option<CompletionConfig>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from(DEFAULT_PERSIST_DIR),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 3,
            completion: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Build a configuration from the process environment.
    ///
    /// See [`env`] for the recognised variables. Unset variables keep their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a numeric variable does not parse or the
    /// resulting configuration is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut builder = RagConfig::builder();
        if let Some(dir) = get(env::PERSIST_DIR) {
            builder = builder.persist_dir(dir);
        }
        if let Some(model) = get(env::EMBEDDING_MODEL_NAME) {
            builder = builder.embedding_model(model);
        }

        let api_key = get(env::COMPLETION_API_KEY).or_else(|| get(env::OPENAI_API_KEY));
        if let Some(api_key) = api_key {
            let mut completion = CompletionConfig::new(api_key);
            if let Some(model) = get(env::COMPLETION_MODEL) {
                completion.model = model;
            }
            if let Some(url) = get(env::COMPLETION_BASE_URL) {
                completion.base_url = url.trim_end_matches('/').to_string();
            }
            if let Some(raw) = get(env::COMPLETION_MAX_TOKENS) {
                completion.max_tokens = parse_var(env::COMPLETION_MAX_TOKENS, &raw)?;
            }
            if let Some(raw) = get(env::COMPLETION_TIMEOUT_SECS) {
                completion.timeout_secs = parse_var(env::COMPLETION_TIMEOUT_SECS, &raw)?;
            }
            builder = builder.completion(completion);
        }

        builder.build()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e| RagError::Config(format!("{key}={raw:?} is invalid: {e}")))
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the root directory of the persistent store.
    pub fn persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.persist_dir = dir.into();
        self
    }

    /// Set the embedding model name.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the default maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the default overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the default number of passages to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Enable answer synthesis through a completion service.
    pub fn completion(mut self, completion: CompletionConfig) -> Self {
        self.config.completion = Some(completion);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidChunkConfig`] if `chunk_overlap >= chunk_size`,
    /// and [`RagError::Config`] if:
    /// - `top_k == 0`
    /// - the embedding model name is empty
    /// - the completion credential is empty or `max_tokens == 0`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_overlap >= config.chunk_size {
            return Err(RagError::InvalidChunkConfig(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        if config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if config.embedding_model.trim().is_empty() {
            return Err(RagError::Config("embedding model name must not be empty".to_string()));
        }
        if let Some(completion) = &config.completion {
            if completion.api_key.is_empty() {
                return Err(RagError::Config("completion API key must not be empty".to_string()));
            }
            if completion.max_tokens == 0 {
                return Err(RagError::Config("max_tokens must be greater than zero".to_string()));
            }
        }
        Ok(config)
    }
}
