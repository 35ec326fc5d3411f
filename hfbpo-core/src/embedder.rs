//! Topic embedding for semantic retrieval
//!
//! Provides the `TopicEmbedder` trait that turns a topic sentence into a
//! vector living in the same space as the corpus term embeddings, and
//! `HashingEmbedder`, a deterministic offline implementation.
//!
//! `HashingEmbedder` is not a neural model. It hashes lowercase tokens into
//! signed buckets, which is enough for lexical overlap retrieval when the
//! corpus was built with the same embedder.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Default dimensionality for hashed embeddings
pub const DEFAULT_EMBEDDING_DIM: usize = 64;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("Embedding dimension must be positive")]
    ZeroDimensions,

    #[error("Inference failed: {0}")]
    InferenceError(String),
}

/// Result type for embedder operations
pub type EmbedderResult<T> = Result<T, EmbedderError>;

/// Trait for embedding topic text
///
/// The trait is async so remote embedding APIs fit behind it as well as
/// local inference.
#[async_trait]
pub trait TopicEmbedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> EmbedderResult<Vec<f32>>;

    /// Generate embeddings for multiple texts
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> EmbedderResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Returns the dimensionality of generated embeddings
    fn dimensions(&self) -> usize;
}

/// Deterministic feature-hashing embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimensions` components
    pub fn new(dimensions: usize) -> EmbedderResult<Self> {
        if dimensions == 0 {
            return Err(EmbedderError::ZeroDimensions);
        }
        Ok(Self { dimensions })
    }

    /// Embed synchronously; the async trait method delegates here
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];

        for token in tokenize(&text.to_lowercase()) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = u64::from_le_bytes(bucket_bytes);

            let idx = (bucket % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vec[idx] += sign;
        }

        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl TopicEmbedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> EmbedderResult<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn tokenize(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
}

/// Scale a vector to unit L2 norm in place. Zero vectors are left as-is.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Compute cosine similarity between two embedding vectors
///
/// Returns a value in [-1, 1]; zero vectors have similarity 0 with anything.
/// Callers must ensure equal lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Embedding dimensions must match");

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::default();
        assert_eq!(
            embedder.embed_text("royal castle"),
            embedder.embed_text("royal castle")
        );
    }

    #[test]
    fn test_hashing_embedder_is_case_insensitive() {
        let embedder = HashingEmbedder::default();
        assert_eq!(
            embedder.embed_text("Royal Castle"),
            embedder.embed_text("royal castle")
        );
    }

    #[test]
    fn test_hashing_embedder_respects_dimensions() {
        let embedder = HashingEmbedder::new(13).unwrap();
        assert_eq!(embedder.embed_text("x").len(), 13);
        assert_eq!(embedder.dimensions(), 13);
    }

    #[test]
    fn test_hashing_embedder_rejects_zero_dimensions() {
        assert!(matches!(
            HashingEmbedder::new(0),
            Err(EmbedderError::ZeroDimensions)
        ));
    }

    #[test]
    fn test_hashed_embedding_is_unit_length() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed_text("night river view");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::default();
        assert!(embedder.embed_text("  ,, ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_embed_batch_matches_single() {
        let embedder = HashingEmbedder::default();
        let batch = embedder.embed_batch(&["a cafe", "a park"]).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed("a cafe").await.unwrap());
    }
}
