//! Vector index boundary
//!
//! The index is an external collaborator consumed through [`VectorIndex`]:
//! batched insert, k-nearest-neighbor query returning a normalized distance,
//! and per-document removal. The production implementation is Qdrant.

#[cfg(test)]
pub(crate) mod memory;
mod payload;
mod qdrant;

pub use payload::*;
pub use qdrant::QdrantIndex;

use crate::error::Result;
use crate::models::SourceKind;
use async_trait::async_trait;
use uuid::Uuid;

/// A point ready to be inserted into the index
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// A query hit.
///
/// `distance` is assumed normalized to [0, 1] (0 = identical); the corpus
/// layer converts it to a similarity via `1 - distance`. An implementation
/// backed by an unbounded metric must normalize before returning.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub id: String,
    pub distance: f32,
    pub payload: ChunkPayload,
}

/// Metadata restriction applied to queries and counts
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    pub source_kind: Option<SourceKind>,
    pub collection: Option<String>,
}

impl IndexFilter {
    pub fn for_kind(kind: SourceKind) -> Self {
        Self {
            source_kind: Some(kind),
            collection: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source_kind.is_none() && self.collection.is_none()
    }

    /// Whether a payload satisfies this filter
    pub fn matches(&self, payload: &ChunkPayload) -> bool {
        if let Some(kind) = self.source_kind {
            if payload.source_type != kind.as_str() {
                return false;
            }
        }
        if let Some(ref collection) = self.collection {
            if payload.collection.as_deref() != Some(collection.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Trait for vector index backends
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the backing collection if it does not exist yet
    async fn ensure_ready(&self) -> Result<()>;

    /// Insert or overwrite points by id
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Return the `k` nearest neighbors, closest first
    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<IndexHit>>;

    /// Remove every point belonging to a document
    async fn remove_document(&self, doc_id: &str) -> Result<()>;

    /// Count points, optionally restricted by a filter
    async fn count(&self, filter: Option<IndexFilter>) -> Result<u64>;

    /// Drop all points and recreate the collection
    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(kind: &str, collection: Option<&str>) -> ChunkPayload {
        ChunkPayload {
            source_type: kind.to_string(),
            collection: collection.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_matching() {
        let filter = IndexFilter::for_kind(SourceKind::Web);
        assert!(filter.matches(&payload("web", None)));
        assert!(!filter.matches(&payload("corpus", None)));

        let filter = IndexFilter {
            source_kind: None,
            collection: Some("transcripts".to_string()),
        };
        assert!(filter.matches(&payload("corpus", Some("transcripts"))));
        assert!(!filter.matches(&payload("corpus", Some("other"))));
        assert!(!filter.matches(&payload("corpus", None)));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = IndexFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&payload("web", Some("anything"))));
    }
}
