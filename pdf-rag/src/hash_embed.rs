//! Deterministic feature-hashing embedder.
//!
//! Needs no model download and no native runtime, which keeps the pipeline
//! usable offline and in tests. Similarity is lexical rather than semantic.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Token budget matching the sequence limit of small sentence-transformer models.
const DEFAULT_MAX_TOKENS: usize = 256;

const MODEL_PREFIX: &str = "hash-";

/// An [`EmbeddingProvider`] that hashes lowercase word tokens into signed
/// buckets of a fixed-size vector and L2-normalises the result.
///
/// Input beyond `max_tokens` words is truncated.
///
/// Token buckets come from the first eight bytes of the token's SHA-256
/// digest, so a vector is identical across builds, platforms and crate
/// versions. Collections written by one binary stay queryable by another.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    model_name: String,
    dimensions: usize,
    max_tokens: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing `dimensions`-sized vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if `dimensions` is zero.
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::embedding(
                "hash",
                "embedding dimensions must be greater than zero",
            ));
        }
        Ok(Self {
            model_name: format!("{MODEL_PREFIX}{dimensions}"),
            dimensions,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Parse a `hash-<dims>` model name.
    ///
    /// Returns `Ok(None)` for names that do not use the `hash-` prefix.
    pub fn from_model_name(name: &str) -> Result<Option<Self>> {
        let Some(dims) = name.strip_prefix(MODEL_PREFIX) else {
            return Ok(None);
        };
        let dimensions = dims.parse::<usize>().map_err(|_| {
            RagError::embedding("hash", format!("invalid model name `{name}`, expected hash-<dims>"))
        })?;
        Self::new(dimensions).map(Some)
    }

    /// Set the number of word tokens considered before truncation.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
    }

    fn embed_internal(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in Self::tokenize(text).take(self.max_tokens) {
            let hash = token_hash(&token);
            let idx = (hash % self.dimensions as u64) as usize;
            // top bit picks the sign so unrelated tokens tend to cancel
            if hash >> 63 == 0 {
                vector[idx] += 1.0;
            } else {
                vector[idx] -= 1.0;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_internal(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_internal(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn identical_text_identical_vector() {
        let provider = HashEmbeddingProvider::new(128).unwrap();
        let a = provider.embed("Refund policy: refunds within 30 days.").await.unwrap();
        let b = provider.embed("Refund policy: refunds within 30 days.").await.unwrap();
        assert_eq!(a, b);

        let other = HashEmbeddingProvider::new(128).unwrap();
        assert_eq!(a, other.embed("Refund policy: refunds within 30 days.").await.unwrap());
    }

    #[tokio::test]
    async fn batch_matches_single() {
        let provider = HashEmbeddingProvider::new(64).unwrap();
        let texts = ["alpha beta", "gamma", ""];
        let batch = provider.embed_batch(&texts).await.unwrap();
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(&provider.embed(text).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn vectors_are_normalised_and_case_insensitive() {
        let provider = HashEmbeddingProvider::new(256).unwrap();
        let v = provider.embed("What is the REFUND policy?").await.unwrap();
        assert!((dot(&v, &v) - 1.0).abs() < 1e-5);

        let lower = provider.embed("what is the refund policy").await.unwrap();
        assert!((dot(&v, &lower) - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn long_input_is_truncated() {
        let provider = HashEmbeddingProvider::new(64).unwrap().with_max_tokens(3);
        let head = provider.embed("one two three").await.unwrap();
        let long = provider.embed("one two three four five six").await.unwrap();
        assert_eq!(head, long);
    }

    #[tokio::test]
    async fn empty_text_is_zero_vector() {
        let provider = HashEmbeddingProvider::new(16).unwrap();
        assert!(provider.embed("   ").await.unwrap().iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn buckets_are_pinned_to_sha256() {
        // sha256("refund") starts with a little-endian u64 that is 13 mod 16, top bit set
        let provider = HashEmbeddingProvider::new(16).unwrap();
        let v = provider.embed("Refund").await.unwrap();
        for (idx, value) in v.iter().enumerate() {
            if idx == 13 {
                assert!((value + 1.0).abs() < 1e-6, "bucket 13 = {value}");
            } else {
                assert_eq!(*value, 0.0, "bucket {idx} = {value}");
            }
        }
        assert_eq!(token_hash("refund") % 384, 157);
    }

    #[test]
    fn parses_model_names() {
        let provider = HashEmbeddingProvider::from_model_name("hash-32").unwrap().unwrap();
        assert_eq!(provider.dimensions, 32);
        assert!(HashEmbeddingProvider::from_model_name("all-MiniLM-L6-v2").unwrap().is_none());
        assert!(HashEmbeddingProvider::from_model_name("hash-big").is_err());
        assert!(HashEmbeddingProvider::from_model_name("hash-0").is_err());
    }
}
