//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// [`embed`](EmbeddingProvider::embed) is used for questions and
/// [`embed_batch`](EmbeddingProvider::embed_batch) for document chunks, so
/// backends with asymmetric retrieval modes can tell them apart. The default
/// `embed_batch` calls `embed` sequentially; backends that support native
/// batching should override it.
///
/// `embed_batch` must preserve order and arity: the i-th vector belongs to the
/// i-th input.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Short provider name used in logs and errors.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Deterministic, offline embeddings derived from a hash of the text.
///
/// Identical texts always map to the same L2-normalised vector. The vectors
/// carry no semantics; this provider exists for tests and dry runs of the
/// ingestion pipeline without credentials.
#[derive(Debug, Clone, Copy)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    /// Compute the embedding synchronously.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
        let mut emb: Vec<f32> =
            (0..self.dimensions).map(|i| (hash.wrapping_add(i as u64) as f32).sin()).collect();
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        emb
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embeddings_are_deterministic_and_normalised() {
        let provider = HashEmbeddingProvider::new(16);
        let a = provider.embed("apple banana").await.unwrap();
        let b = provider.embed("apple banana").await.unwrap();
        let c = provider.embed("cherry date").await.unwrap();

        assert_eq!(a.len(), 16);
        assert_eq!(a, b);
        assert_ne!(a, c);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn default_batch_preserves_order() {
        let provider = HashEmbeddingProvider::default();
        let texts = ["one", "two", "three"];
        let batch = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.len(), texts.len());
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(vector, &provider.vector_for(text));
        }
    }
}
