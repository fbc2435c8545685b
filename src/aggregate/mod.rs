//! Relevance aggregation
//!
//! Decides per query which sources to consult, fans the lookups out
//! concurrently, and folds the heterogeneous results into one ranked,
//! deduplicated, bounded list. The merge is deterministic given the two
//! source lists: it depends only on the routing decision and the declared
//! ordering rules, never on which call returned first.

use crate::corpus::CorpusStore;
use crate::feed::{query_tokens, FeedSearcher};
use crate::models::{Origin, SearchHit};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Rendered to callers when the blended result set is empty; an empty result
/// is a valid state, not an error.
pub const NO_RESULTS_MESSAGE: &str = "No relevant information found.";

/// Tokens that signal the query wants current information
const RECENCY_TERMS: &[&str] = &[
    "latest",
    "recent",
    "new",
    "current",
    "today",
    "now",
    "announcement",
    "announcements",
];

/// Phrases that signal foundational knowledge is wanted
const FOUNDATIONAL_PHRASES: &[&str] = &["what is", "how does"];

/// Single tokens that signal foundational knowledge is wanted
const FOUNDATIONAL_TERMS: &[&str] = &["explain", "basics", "fundamentals", "course", "learn"];

static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(19|20)\d{2}$").expect("static year pattern"));

/// Per-query source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub use_corpus: bool,
    pub use_feeds: bool,
    pub prioritize_feeds: bool,
}

/// Decide which sources to consult for a query.
///
/// A heuristic, not a classifier: the corpus is always consulted, feeds are
/// consulted unless the query reads as purely foundational, and feed results
/// only jump the queue when a recency term appears. Ambiguous queries consult
/// both sources with no priority bias.
pub fn route(query: &str) -> RouteDecision {
    let lowered = query.to_lowercase();
    let tokens: Vec<String> = lowered
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect();

    let wants_recent = tokens
        .iter()
        .any(|t| RECENCY_TERMS.contains(&t.as_str()) || YEAR_TOKEN.is_match(t));

    let wants_foundational = FOUNDATIONAL_PHRASES.iter().any(|p| lowered.contains(p))
        || tokens.iter().any(|t| FOUNDATIONAL_TERMS.contains(&t.as_str()));

    RouteDecision {
        use_corpus: true,
        use_feeds: wants_recent || !wants_foundational,
        prioritize_feeds: wants_recent,
    }
}

/// Merge the two source lists into one ordering, deduplicate by identity key
/// (first occurrence wins), and cap the length.
///
/// Cross-source scores are not assumed numerically comparable. When feeds are
/// prioritized the whole feed block precedes the corpus block; otherwise the
/// two lists, each already in its own internal order, are interleaved by
/// descending score, corpus winning exact ties.
pub fn merge_hits(
    corpus: Vec<SearchHit>,
    feed: Vec<SearchHit>,
    prioritize_feeds: bool,
    max_results: usize,
) -> Vec<SearchHit> {
    let ordered: Vec<SearchHit> = if prioritize_feeds {
        feed.into_iter().chain(corpus).collect()
    } else {
        let mut out = Vec::with_capacity(corpus.len() + feed.len());
        let mut corpus_iter = corpus.into_iter().peekable();
        let mut feed_iter = feed.into_iter().peekable();

        loop {
            let take_feed = match (corpus_iter.peek(), feed_iter.peek()) {
                (Some(c), Some(f)) => f.score > c.score,
                (None, Some(_)) => true,
                (Some(_), None) => false,
                (None, None) => break,
            };
            let next = if take_feed {
                feed_iter.next()
            } else {
                corpus_iter.next()
            };
            out.extend(next);
        }
        out
    };

    let mut seen = HashSet::new();
    let mut merged: Vec<SearchHit> = ordered
        .into_iter()
        .filter(|hit| seen.insert(hit.identity.clone()))
        .collect();
    merged.truncate(max_results);
    merged
}

/// The blended query front door
pub struct Aggregator {
    corpus: Arc<CorpusStore>,
    feeds: Arc<FeedSearcher>,
    corpus_k: usize,
    max_results: usize,
    enrich_top: usize,
}

impl Aggregator {
    pub fn new(
        corpus: Arc<CorpusStore>,
        feeds: Arc<FeedSearcher>,
        corpus_k: usize,
        max_results: usize,
        enrich_top: usize,
    ) -> Self {
        Self {
            corpus,
            feeds,
            corpus_k,
            max_results,
            enrich_top,
        }
    }

    /// Run the blended search. Both source lookups are independent I/O-bound
    /// calls with no shared mutable state, so they run concurrently and the
    /// end-to-end latency is the slower of the two, not their sum. Failures
    /// inside either source have already degraded to empty lists by the time
    /// the merge runs; an empty blended result is a valid outcome.
    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        let decision = route(query);
        debug!(
            "Routing query: corpus={} feeds={} prioritize_feeds={}",
            decision.use_corpus, decision.use_feeds, decision.prioritize_feeds
        );

        let corpus_lookup = async {
            if decision.use_corpus {
                self.corpus.search(query, self.corpus_k, None).await
            } else {
                Vec::new()
            }
        };

        let feed_lookup = async {
            if decision.use_feeds {
                let token_count = query_tokens(query).len();
                let mut entries = self.feeds.search_all(query).await;
                self.feeds.enrich(&mut entries, self.enrich_top).await;
                entries
                    .into_iter()
                    .map(|entry| entry.into_hit(token_count))
                    .collect()
            } else {
                Vec::new()
            }
        };

        let (corpus_hits, feed_hits) = futures::join!(corpus_lookup, feed_lookup);

        merge_hits(
            corpus_hits,
            feed_hits,
            decision.prioritize_feeds,
            self.max_results,
        )
    }
}

/// Format a ranked result list as the context block handed to the
/// answer-generation step.
pub fn render_context(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    let mut out = format!("Relevant information for: {}\n\n", query);
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&format!("{}. ", i + 1));
        if let Some(ref title) = hit.title {
            out.push_str(title);
        }
        out.push_str(&format!("\n   Source: {} ({})\n", hit.source, hit.origin));
        if let Some(ref url) = hit.url {
            out.push_str(&format!("   URL: {}\n", url));
        }
        if let Some(published) = hit.published {
            out.push_str(&format!("   Published: {}\n", published.format("%Y-%m-%d")));
        }
        out.push_str(&format!("   Relevance: {:.3}\n", hit.score));
        out.push_str(&format!("   {}\n\n", hit.text));
    }

    out
}
