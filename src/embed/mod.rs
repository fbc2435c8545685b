//! Embedding generation
//!
//! The embedding model is an external collaborator: deterministic for
//! identical input, fixed dimensionality per deployment, otherwise opaque.
//! This module provides the trait boundary and an HTTP-backed implementation.

mod http_backend;

pub use http_backend::*;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Helper to embed in batches, bounding peak memory and request size
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size.max(1)) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let embeddings = embedder.embed(batch_texts).await?;
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}


#[cfg(test)]
mod tests {
    use super::stub::StubEmbedder;
    use super::*;

    #[tokio::test]
    async fn test_batching_preserves_order_and_count() {
        let embedder = StubEmbedder::new(8);
        let texts: Vec<String> = (0..10).map(|i| format!("text {}", i)).collect();

        let all = embed_in_batches(&embedder, texts.clone(), 3).await.unwrap();
        let direct = embedder.embed(texts).await.unwrap();

        assert_eq!(all.len(), 10);
        assert_eq!(all, direct);
    }

    #[tokio::test]
    async fn test_stub_is_deterministic() {
        let embedder = StubEmbedder::new(16);
        let a = embedder.embed(vec!["same input".to_string()]).await.unwrap();
        let b = embedder.embed(vec!["same input".to_string()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 16);
    }
}
