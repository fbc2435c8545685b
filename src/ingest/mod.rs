//! Push-driven ingestion pipeline
//!
//! Accepts "new content" events pushed from an external trigger, makes them
//! searchable through the corpus store, and records an auditable, bounded
//! event log. Identity is derived from the canonical URL, so retried pushes
//! supersede rather than duplicate.

mod events;

pub use events::{EventLog, EventOutcome, IngestionEvent};

use crate::corpus::CorpusStore;
use crate::error::{Error, Result};
use crate::feed::ArticleExtractor;
use crate::models::{Document, SourceKind};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// A pushed "new content" event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEvent {
    #[serde(default)]
    pub title: String,

    /// Canonical URL; the document identity is derived from it
    #[serde(default, alias = "link")]
    pub url: String,

    #[serde(default)]
    pub content: String,

    /// Publish timestamp as provided by the pusher, if any
    #[serde(default)]
    pub published: Option<String>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// What the caller gets back from a successful ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub status: String,
    pub message: String,
    pub document_id: String,
    pub chunks_added: usize,
}

/// The ingestion pipeline. Runs outside the query path; shares only the
/// corpus store with it.
pub struct IngestionPipeline {
    corpus: Arc<CorpusStore>,
    extractor: Arc<ArticleExtractor>,
    events: EventLog,
    min_content_chars: usize,
}

impl IngestionPipeline {
    pub fn new(
        corpus: Arc<CorpusStore>,
        extractor: Arc<ArticleExtractor>,
        events: EventLog,
        min_content_chars: usize,
    ) -> Self {
        Self {
            corpus,
            extractor,
            events,
            min_content_chars,
        }
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Ingest one pushed event.
    ///
    /// Validation failures (`InvalidEvent`) occur before any side effect and
    /// are not logged. Enrichment failures are absorbed. Insert failures are
    /// recorded in the event log with an `error` outcome and propagated;
    /// silent data loss during ingestion is unacceptable.
    pub async fn ingest(&self, event: ContentEvent) -> Result<IngestReceipt> {
        let title = event.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidEvent("missing title".to_string()));
        }
        let url = event.url.trim();
        if url.is_empty() {
            return Err(Error::InvalidEvent("missing url".to_string()));
        }
        Url::parse(url).map_err(|e| Error::InvalidEvent(format!("bad url '{}': {}", url, e)))?;

        let mut content = event.content.trim().to_string();

        // Short payloads usually mean the pusher only had a teaser; try the
        // article itself. Enrichment is optional, so failure changes nothing.
        if content.chars().count() < self.min_content_chars {
            info!("Content below {} chars, attempting extraction from {}", self.min_content_chars, url);
            match self.extractor.extract(url).await {
                Some(full_text) if !full_text.is_empty() => content = full_text,
                _ => warn!("Extraction yielded nothing for {}, keeping pushed content", url),
            }
        }

        let mut metadata = event.metadata.clone();
        metadata.insert("url".to_string(), url.to_string());
        metadata
            .entry("source".to_string())
            .or_insert_with(|| source_label(url));
        if let Some(ref published) = event.published {
            metadata.insert("published".to_string(), published.clone());
        }
        metadata.insert("ingested_at".to_string(), Utc::now().to_rfc3339());

        let doc = Document {
            id: Document::id_for_url(url),
            title: title.to_string(),
            text: content,
            kind: SourceKind::Web,
            metadata,
        };

        match self.corpus.add(&doc).await {
            Ok(chunks_added) => {
                self.record(IngestionEvent::success(title, url));
                info!("Ingested '{}' as {} ({} chunks)", title, doc.id, chunks_added);
                Ok(IngestReceipt {
                    status: "success".to_string(),
                    message: format!("Processed content: {}", title),
                    document_id: doc.id,
                    chunks_added,
                })
            }
            Err(e) => {
                self.record(IngestionEvent::error(title, url, &e.to_string()));
                Err(Error::Ingestion(format!("insert failed for {}: {}", url, e)))
            }
        }
    }

    fn record(&self, event: IngestionEvent) {
        // The audit file failing must not change the ingestion outcome.
        if let Err(e) = self.events.append(event) {
            warn!("Failed to record ingestion event: {}", e);
        }
    }
}

/// Human-readable source label from the URL host
fn source_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "web".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkConfig, ExtractConfig};
    use crate::embed::stub::StubEmbedder;
    use crate::index::memory::MemoryIndex;
    use tempfile::TempDir;

    struct Fixture {
        pipeline: IngestionPipeline,
        index: Arc<MemoryIndex>,
        _tmp: TempDir,
    }

    fn fixture() -> Fixture {
        fixture_with_retention(50)
    }

    fn fixture_with_retention(retention: usize) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let index = Arc::new(MemoryIndex::new());
        let corpus = Arc::new(CorpusStore::new(
            Arc::new(StubEmbedder::new(8)),
            index.clone(),
            ChunkConfig {
                target_chars: 200,
                overlap_chars: 40,
            },
            8,
        ));
        let extractor = Arc::new(
            ArticleExtractor::new(&ExtractConfig::default(), "gleaner-test", 2).unwrap(),
        );
        let events = EventLog::new(tmp.path().join("events.json"), retention);

        Fixture {
            pipeline: IngestionPipeline::new(corpus, extractor, events, 200),
            index,
            _tmp: tmp,
        }
    }

    fn event(title: &str, url: &str, content: &str) -> ContentEvent {
        ContentEvent {
            title: title.to_string(),
            url: url.to_string(),
            content: content.to_string(),
            published: None,
            metadata: BTreeMap::new(),
        }
    }

    fn long_content() -> String {
        "A full paragraph of pushed announcement content that is comfortably long. ".repeat(5)
    }

    #[tokio::test]
    async fn test_ingest_success_records_event() {
        let f = fixture();
        let receipt = f
            .pipeline
            .ingest(event(
                "New NIM release",
                "https://example.com/nim",
                &long_content(),
            ))
            .await
            .unwrap();

        assert_eq!(receipt.status, "success");
        assert!(receipt.chunks_added > 0);
        assert_eq!(f.index.len(), receipt.chunks_added);

        let events = f.pipeline.events().read_all().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, EventOutcome::Success);
        assert_eq!(events[0].url, "https://example.com/nim");
    }

    #[tokio::test]
    async fn test_validation_rejects_before_side_effects() {
        let f = fixture();

        let missing_title = f
            .pipeline
            .ingest(event("", "https://example.com/x", "content"))
            .await;
        assert!(matches!(missing_title, Err(Error::InvalidEvent(_))));

        let missing_url = f.pipeline.ingest(event("Title", "", "content")).await;
        assert!(matches!(missing_url, Err(Error::InvalidEvent(_))));

        let bad_url = f
            .pipeline
            .ingest(event("Title", "not a url", "content"))
            .await;
        assert!(matches!(bad_url, Err(Error::InvalidEvent(_))));

        // No side effects: nothing indexed, nothing logged.
        assert_eq!(f.index.len(), 0);
        assert!(f.pipeline.events().read_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_ingestion_is_idempotent() {
        let f = fixture();
        let content = long_content();

        let first = f
            .pipeline
            .ingest(event("Post", "https://example.com/post", &content))
            .await
            .unwrap();
        let second = f
            .pipeline
            .ingest(event("Post", "https://example.com/post", &content))
            .await
            .unwrap();

        assert_eq!(first.document_id, second.document_id);
        // One retained document version: chunk count equals a single pass.
        assert_eq!(f.index.len(), second.chunks_added);

        // Both attempts are in the audit log.
        let events = f.pipeline.events().read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.outcome == EventOutcome::Success));
    }

    #[tokio::test]
    async fn test_insert_failure_is_logged_and_propagated() {
        let f = fixture();
        f.index.fail_upserts(true);

        let result = f
            .pipeline
            .ingest(event(
                "Doomed post",
                "https://example.com/doomed",
                &long_content(),
            ))
            .await;

        assert!(matches!(result, Err(Error::Ingestion(_))));

        let events = f.pipeline.events().read_all().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, EventOutcome::Error);
        assert!(events[0].error.is_some());
    }

    #[tokio::test]
    async fn test_event_log_stays_bounded() {
        let retention = 5;
        let f = fixture_with_retention(retention);

        for i in 0..9 {
            f.pipeline
                .ingest(event(
                    &format!("Post {}", i),
                    &format!("https://example.com/{}", i),
                    &long_content(),
                ))
                .await
                .unwrap();
        }

        let events = f.pipeline.events().read_all().unwrap();
        assert_eq!(events.len(), retention);
        assert_eq!(events.last().unwrap().title, "Post 8");
        assert_eq!(events.first().unwrap().title, "Post 4");
    }

    #[tokio::test]
    async fn test_short_content_enrichment_failure_is_nonfatal() {
        // Unreachable article URL: extraction fails, ingestion proceeds with
        // the pushed teaser.
        let f = fixture();
        let receipt = f
            .pipeline
            .ingest(event(
                "Teaser only",
                "http://127.0.0.1:1/article",
                "Short teaser.",
            ))
            .await
            .unwrap();

        assert_eq!(receipt.status, "success");
        assert!(f.index.len() > 0);
        let payloads = f.index.payloads();
        assert!(payloads.iter().any(|p| p.text.contains("Short teaser.")));
    }

    #[test]
    fn test_source_label_from_host() {
        assert_eq!(
            source_label("https://developer.example.com/blog/post"),
            "developer.example.com"
        );
        assert_eq!(source_label("garbage"), "web");
    }
}
