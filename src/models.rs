//! Shared domain types
//!
//! Both retrieval sources project into [`SearchHit`] before merging, so the
//! aggregator never has to care which side a result came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Where a document (or a search hit) originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Persisted corpus material (e.g. course transcripts ingested from disk)
    Corpus,
    /// Web content pushed through the ingestion pipeline
    Web,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Corpus => "corpus",
            SourceKind::Web => "web",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of source material. Immutable once created; re-ingestion under the
/// same id supersedes the previous version rather than mutating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier. Web documents use the UUIDv5 of their canonical URL
    /// so repeated pushes of the same URL resolve to the same identity.
    pub id: String,

    pub title: String,

    /// Full normalized text
    pub text: String,

    pub kind: SourceKind,

    /// Provenance metadata (collection name, source URL, publish timestamp, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Deterministic document id for web content, derived from the canonical URL.
    pub fn id_for_url(url: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string()
    }
}

/// Which side of the blended search a hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Corpus,
    Feed,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Corpus => f.write_str("corpus"),
            Origin::Feed => f.write_str("feed"),
        }
    }
}

/// The unified search result type.
///
/// `identity` is the deduplication key: `doc_id#chunk_index` for corpus hits,
/// the canonical URL for feed hits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub identity: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Chunk text for corpus hits, entry summary (or extracted body) for feed hits
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub origin: Origin,

    /// Human-readable provenance label (collection or feed name)
    pub source: String,

    /// Relevance score normalized to a shared [0, 1] scale
    pub score: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}
