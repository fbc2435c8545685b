//! Corpus store
//!
//! Owns the chunk lifecycle: documents are chunked, embedded, and upserted
//! into the external vector index; similarity search translates index hits
//! back into unified search results. Embedding and index internals stay
//! behind their trait boundaries.

use crate::chunk::chunk_text;
use crate::config::ChunkConfig;
use crate::embed::{embed_in_batches, Embedder};
use crate::error::Result;
use crate::index::{ChunkPayload, IndexFilter, IndexPoint, VectorIndex};
use crate::models::{Document, Origin, SearchHit, SourceKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Points per index call during insertion, bounding peak request size
const INSERT_BATCH: usize = 100;

/// Payload keys promoted to dedicated payload fields
const PROMOTED_KEYS: [&str; 3] = ["url", "collection", "published"];

/// Chunk counts for the whole store and per source type
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusStats {
    pub total_chunks: u64,
    pub corpus_chunks: u64,
    pub web_chunks: u64,
}

/// The persisted, similarity-searchable document corpus
pub struct CorpusStore {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunking: ChunkConfig,
    embed_batch_size: usize,
}

impl CorpusStore {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chunking: ChunkConfig,
        embed_batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            chunking,
            embed_batch_size,
        }
    }

    /// Chunk, embed, and index a document. Returns the number of chunks added.
    ///
    /// Re-adding a document under the same id supersedes the previous
    /// version: prior points are removed before the new ones are inserted, so
    /// readers see the old version, a gap, or the new version, never a blend.
    /// Any embedding or index failure propagates; ingestion errors must be
    /// visible.
    pub async fn add(&self, doc: &Document) -> Result<usize> {
        let chunks: Vec<String> =
            chunk_text(&doc.text, self.chunking.target_chars, self.chunking.overlap_chars)?
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect();

        self.index.ensure_ready().await?;
        self.index.remove_document(&doc.id).await?;

        if chunks.is_empty() {
            debug!("Document {} produced no chunks", doc.id);
            return Ok(0);
        }

        let total = chunks.len();
        let embeddings =
            embed_in_batches(self.embedder.as_ref(), chunks.clone(), self.embed_batch_size).await?;

        let updated_at = Utc::now().to_rfc3339();
        let mut residual = doc.metadata.clone();
        for key in PROMOTED_KEYS {
            residual.remove(key);
        }

        let points: Vec<IndexPoint> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, vector))| {
                let payload = ChunkPayload {
                    doc_id: doc.id.clone(),
                    title: doc.title.clone(),
                    content_hash: blake3::hash(text.as_bytes()).to_hex().to_string(),
                    text,
                    source_type: doc.kind.as_str().to_string(),
                    url: doc.metadata.get("url").cloned(),
                    collection: doc.metadata.get("collection").cloned(),
                    published: doc.metadata.get("published").cloned(),
                    chunk_index: i as i64,
                    total_chunks: total as i64,
                    updated_at: updated_at.clone(),
                    metadata: residual.clone(),
                };
                IndexPoint {
                    id: point_id(&doc.id, i),
                    vector,
                    payload,
                }
            })
            .collect();

        for batch in points.chunks(INSERT_BATCH) {
            self.index.upsert(batch.to_vec()).await?;
        }

        info!("Indexed {} chunks for document {}", total, doc.id);
        Ok(total)
    }

    /// Search the corpus for the `k` nearest chunks.
    ///
    /// Any embedder or index failure degrades to an empty result set: a
    /// knowledge-base outage must not abort a blended query.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<IndexFilter>,
    ) -> Vec<SearchHit> {
        let vector = match self.embedder.embed(vec![query.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => {
                warn!("Embedder returned no vector for query");
                return Vec::new();
            }
            Err(e) => {
                warn!("Query embedding failed: {}", e);
                return Vec::new();
            }
        };

        let hits = match self.index.query(vector, k, filter).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Vector index query failed: {}", e);
                return Vec::new();
            }
        };

        let mut results: Vec<SearchHit> = hits
            .into_iter()
            .map(|hit| {
                let payload = hit.payload;
                // Assumes a distance normalized to [0, 1]; see VectorIndex.
                let score = (1.0 - hit.distance).clamp(0.0, 1.0);
                let source = payload
                    .collection
                    .clone()
                    .or_else(|| payload.metadata.get("source").cloned())
                    .unwrap_or_else(|| payload.source_type.clone());
                let published = payload
                    .published
                    .as_deref()
                    .and_then(parse_timestamp);

                SearchHit {
                    identity: payload.identity(),
                    title: Some(payload.title),
                    text: payload.text,
                    url: payload.url,
                    origin: Origin::Corpus,
                    source,
                    score,
                    published,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results
    }

    /// Chunk counts, broken down by source type. Never fails: an empty or
    /// unreachable store reports zero counts.
    pub async fn stats(&self) -> CorpusStats {
        let total = self.index.count(None).await;
        let corpus = self
            .index
            .count(Some(IndexFilter::for_kind(SourceKind::Corpus)))
            .await;
        let web = self
            .index
            .count(Some(IndexFilter::for_kind(SourceKind::Web)))
            .await;

        match (total, corpus, web) {
            (Ok(total_chunks), Ok(corpus_chunks), Ok(web_chunks)) => CorpusStats {
                total_chunks,
                corpus_chunks,
                web_chunks,
            },
            _ => {
                warn!("Index stats unavailable, reporting empty store");
                CorpusStats::default()
            }
        }
    }

    /// Drop every chunk. The only removal path besides supersession.
    pub async fn reset(&self) -> Result<()> {
        self.index.clear().await
    }
}

/// Deterministic point id for `doc_id#chunk_index`, making repeated insertion
/// of the same document an overwrite rather than an accumulation.
fn point_id(doc_id: &str, chunk_index: usize) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("{}#{}", doc_id, chunk_index).as_bytes(),
    )
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::stub::StubEmbedder;
    use crate::index::memory::MemoryIndex;
    use std::collections::BTreeMap;

    fn store_with(index: Arc<MemoryIndex>, embedder: Arc<StubEmbedder>) -> CorpusStore {
        CorpusStore::new(
            embedder,
            index,
            ChunkConfig {
                target_chars: 200,
                overlap_chars: 40,
            },
            8,
        )
    }

    fn doc(id: &str, title: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            kind: SourceKind::Corpus,
            metadata: BTreeMap::from([("collection".to_string(), "transcripts".to_string())]),
        }
    }

    #[tokio::test]
    async fn test_add_chunks_and_counts() {
        let index = Arc::new(MemoryIndex::new());
        let store = store_with(index.clone(), Arc::new(StubEmbedder::new(8)));

        let text = "A sentence about inference. ".repeat(30);
        let added = store.add(&doc("doc-1", "Intro", &text)).await.unwrap();

        assert!(added > 1);
        assert_eq!(index.len(), added);

        let stats = store.stats().await;
        assert_eq!(stats.total_chunks, added as u64);
        assert_eq!(stats.corpus_chunks, added as u64);
        assert_eq!(stats.web_chunks, 0);
    }

    #[tokio::test]
    async fn test_insertion_is_batched() {
        let index = Arc::new(MemoryIndex::new());
        let store = store_with(index.clone(), Arc::new(StubEmbedder::new(8)));

        // Enough text to produce well over one insert batch of chunks.
        let text = "A sentence that exists purely to fill the corpus. ".repeat(500);
        let added = store.add(&doc("doc-1", "Bulk", &text)).await.unwrap();
        assert!(added > 100);

        let batches = index.upsert_batch_sizes();
        assert!(batches.len() > 1);
        assert!(batches.iter().all(|&size| size <= 100));
        assert_eq!(batches.iter().sum::<usize>(), added);
    }

    #[tokio::test]
    async fn test_readding_supersedes_previous_version() {
        let index = Arc::new(MemoryIndex::new());
        let store = store_with(index.clone(), Arc::new(StubEmbedder::new(8)));

        let long = "A long sentence for the first version. ".repeat(40);
        let first = store.add(&doc("doc-1", "Intro", &long)).await.unwrap();

        let second = store
            .add(&doc("doc-1", "Intro", "A single short sentence."))
            .await
            .unwrap();

        assert!(first > second);
        assert_eq!(index.len(), second, "older chunks must not accumulate");
    }

    #[tokio::test]
    async fn test_add_propagates_index_failure() {
        let index = Arc::new(MemoryIndex::new());
        index.fail_upserts(true);
        let store = store_with(index.clone(), Arc::new(StubEmbedder::new(8)));

        let result = store.add(&doc("doc-1", "Intro", "Some content here.")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_degrades_to_empty_on_index_failure() {
        let index = Arc::new(MemoryIndex::new());
        let store = store_with(index.clone(), Arc::new(StubEmbedder::new(8)));
        store
            .add(&doc("doc-1", "Intro", "Some content here."))
            .await
            .unwrap();

        index.fail_queries(true);
        let hits = store.search("content", 5, None).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_degrades_to_empty_on_embedder_failure() {
        let index = Arc::new(MemoryIndex::new());
        let embedder = Arc::new(StubEmbedder::new(8));
        let store = store_with(index.clone(), embedder.clone());
        store
            .add(&doc("doc-1", "Intro", "Some content here."))
            .await
            .unwrap();

        embedder.fail_next_calls(true);
        let hits = store.search("content", 5, None).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_returns_identity_keys_and_scores() {
        let index = Arc::new(MemoryIndex::new());
        let store = store_with(index.clone(), Arc::new(StubEmbedder::new(8)));
        store
            .add(&doc("doc-1", "Intro", "Exact phrase to find."))
            .await
            .unwrap();

        let hits = store.search("Exact phrase to find.", 5, None).await;

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identity, "doc-1#0");
        assert_eq!(hits[0].origin, Origin::Corpus);
        assert!(hits[0].score > 0.99, "identical text should score ~1.0");
    }

    #[tokio::test]
    async fn test_stats_never_fail_on_empty_store() {
        let index = Arc::new(MemoryIndex::new());
        let store = store_with(index, Arc::new(StubEmbedder::new(8)));

        let stats = store.stats().await;
        assert_eq!(stats.total_chunks, 0);
    }
}
