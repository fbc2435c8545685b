//! Live syndication feed search
//!
//! Queries configured RSS/Atom feeds at request time, scores entries by
//! keyword overlap with the query, and optionally enriches top entries with
//! extracted article text. Feed entries are ephemeral: they live for one
//! search invocation unless routed through the ingestion pipeline.

mod extract;
mod parser;

pub use extract::ArticleExtractor;
pub use parser::{parse_feed, RawEntry};

use crate::config::{ExtractConfig, FeedConfig, FeedSource};
use crate::error::{Error, Result};
use crate::models::{Origin, SearchHit};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// An item read from a feed at query time
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: String,
    /// Canonical URL, used as the identity key
    pub url: String,
    pub summary: String,
    /// Best-effort parsed; defaults to the time of observation
    pub published: DateTime<Utc>,
    /// Feed source label
    pub source: String,
    /// Count of distinct query tokens matched in title + summary
    pub score: u32,
    /// Extracted article body, when enrichment ran
    pub full_text: Option<String>,
}

impl FeedEntry {
    /// Project into the unified search result type.
    ///
    /// The raw score is a matched-token count; dividing by the number of
    /// distinct query tokens puts it on the same [0, 1] scale as corpus
    /// similarities without claiming the two are calibrated against each
    /// other.
    pub fn into_hit(self, query_token_count: usize) -> SearchHit {
        let normalized = if query_token_count == 0 {
            0.0
        } else {
            (self.score as f32 / query_token_count as f32).min(1.0)
        };

        SearchHit {
            identity: self.url.clone(),
            title: Some(self.title),
            text: self.full_text.unwrap_or(self.summary),
            url: Some(self.url),
            origin: Origin::Feed,
            source: self.source,
            score: normalized,
            published: Some(self.published),
        }
    }
}

/// Distinct lowercase tokens of a query, in first-seen order
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Count how many distinct query tokens appear as substrings in the entry text
pub fn score_entry(tokens: &[String], title: &str, summary: &str) -> u32 {
    let haystack = format!("{} {}", title, summary).to_lowercase();
    tokens.iter().filter(|t| haystack.contains(t.as_str())).count() as u32
}

/// Searches configured syndication feeds
pub struct FeedSearcher {
    client: Client,
    config: FeedConfig,
    extractor: ArticleExtractor,
}

impl FeedSearcher {
    pub fn new(config: FeedConfig, extract: &ExtractConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Feed(format!("Failed to create HTTP client: {}", e)))?;

        let extractor = ArticleExtractor::new(extract, &config.user_agent, config.timeout_secs)?;

        Ok(Self {
            client,
            config,
            extractor,
        })
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.config.sources
    }

    pub fn max_results(&self) -> usize {
        self.config.max_results
    }

    pub fn extractor(&self) -> &ArticleExtractor {
        &self.extractor
    }

    /// Search one feed. Network or parse failures degrade to an empty list so
    /// one broken source never takes down the others.
    pub async fn search(&self, query: &str, source: &FeedSource) -> Vec<FeedEntry> {
        let raw = match self.fetch_feed(source).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Feed {} unavailable: {}", source.name, e);
                return Vec::new();
            }
        };

        let tokens = query_tokens(query);
        let observed_at = Utc::now();

        let mut entries: Vec<FeedEntry> = raw
            .into_iter()
            .take(self.config.scan_per_feed)
            .filter_map(|entry| {
                let score = score_entry(&tokens, &entry.title, &entry.summary);
                if score == 0 {
                    return None;
                }
                Some(FeedEntry {
                    published: entry
                        .published
                        .as_deref()
                        .and_then(parse_published)
                        .unwrap_or(observed_at),
                    title: entry.title,
                    url: entry.link,
                    summary: entry.summary,
                    source: source.name.clone(),
                    score,
                    full_text: None,
                })
            })
            .collect();

        sort_entries(&mut entries);
        debug!(
            "Feed {} matched {} entries for query",
            source.name,
            entries.len()
        );
        entries
    }

    /// Search every configured feed concurrently; merge, deduplicate by
    /// canonical URL (first occurrence wins), and truncate.
    pub async fn search_all(&self, query: &str) -> Vec<FeedEntry> {
        let searches = self
            .config
            .sources
            .iter()
            .map(|source| self.search(query, source));
        let per_feed = futures::future::join_all(searches).await;

        let mut seen = HashSet::new();
        let mut merged: Vec<FeedEntry> = per_feed
            .into_iter()
            .flatten()
            .filter(|entry| seen.insert(entry.url.clone()))
            .collect();

        sort_entries(&mut merged);
        merged.truncate(self.config.max_results);
        merged
    }

    /// Enrich the top `top` entries in place with extracted article text.
    /// Best effort: an entry whose article cannot be fetched keeps its
    /// summary.
    pub async fn enrich(&self, entries: &mut [FeedEntry], top: usize) {
        for entry in entries.iter_mut().take(top) {
            if entry.full_text.is_none() {
                entry.full_text = self.extractor.extract(&entry.url).await;
            }
        }
    }

    /// Entries published within the last `days` days across all feeds,
    /// newest first.
    pub async fn recent(&self, days: i64) -> Vec<FeedEntry> {
        let cutoff = Utc::now() - ChronoDuration::days(days);

        let fetches = self.config.sources.iter().map(|source| async move {
            match self.fetch_feed(source).await {
                Ok(raw) => (source, raw),
                Err(e) => {
                    warn!("Feed {} unavailable: {}", source.name, e);
                    (source, Vec::new())
                }
            }
        });

        let mut seen = HashSet::new();
        let mut entries: Vec<FeedEntry> = futures::future::join_all(fetches)
            .await
            .into_iter()
            .flat_map(|(source, raw)| {
                raw.into_iter()
                    .filter_map(|entry| {
                        let published = entry.published.as_deref().and_then(parse_published)?;
                        if published < cutoff {
                            return None;
                        }
                        Some(FeedEntry {
                            title: entry.title,
                            url: entry.link,
                            summary: entry.summary,
                            published,
                            source: source.name.clone(),
                            score: 1,
                            full_text: None,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|entry| seen.insert(entry.url.clone()))
            .collect();

        entries.sort_by(|a, b| b.published.cmp(&a.published));
        entries.truncate(self.config.max_results);
        entries
    }

    async fn fetch_feed(&self, source: &FeedSource) -> Result<Vec<RawEntry>> {
        debug!("Fetching feed {} ({})", source.name, source.url);

        let response = self.client.get(&source.url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Feed(format!(
                "HTTP {}: {}",
                response.status(),
                source.url
            )));
        }

        let body = response.text().await?;
        Ok(parse_feed(&body))
    }
}

/// Order by score descending, then publish date descending. Stable, so
/// earlier sources win among full ties.
fn sort_entries(entries: &mut [FeedEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.published.cmp(&a.published))
    });
}

/// Best-effort timestamp parsing: RFC 2822 (RSS) then RFC 3339 (Atom)
fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_extract_selectors;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed_xml(items: &[(&str, &str, &str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, desc, date)| {
                format!(
                    "<item><title>{}</title><link>{}</link><description>{}</description><pubDate>{}</pubDate></item>",
                    title, link, desc, date
                )
            })
            .collect();
        format!(
            "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>t</title>{}</channel></rss>",
            body
        )
    }

    fn searcher_with(sources: Vec<FeedSource>) -> FeedSearcher {
        let config = FeedConfig {
            sources,
            scan_per_feed: 20,
            max_results: 5,
            timeout_secs: 5,
            user_agent: "gleaner-test".to_string(),
        };
        FeedSearcher::new(
            config,
            &ExtractConfig {
                selectors: default_extract_selectors(),
                max_chars: 2000,
            },
        )
        .unwrap()
    }

    async fn mount_feed(server: &MockServer, route: &str, xml: String) {
        Mock::given(method("GET"))
            .and(path(route.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_raw(xml.into_bytes(), "application/rss+xml"))
            .mount(server)
            .await;
    }

    #[test]
    fn test_query_tokens_are_distinct_and_lowercase() {
        let tokens = query_tokens("NIM nim Microservices");
        assert_eq!(tokens, vec!["nim".to_string(), "microservices".to_string()]);
    }

    #[test]
    fn test_score_counts_distinct_matches() {
        let tokens = query_tokens("NIM microservices deployment");
        let score = score_entry(
            &tokens,
            "Deploying NIM",
            "Guide to NIM microservices in production",
        );
        // "nim" and "microservices" match; "deployment" does not appear
        assert_eq!(score, 2);
    }

    #[test]
    fn test_zero_score_for_unrelated_text() {
        let tokens = query_tokens("quantum entanglement");
        assert_eq!(score_entry(&tokens, "Cooking tips", "Pasta and sauce"), 0);
    }

    #[tokio::test]
    async fn test_search_scores_filters_and_orders() {
        let server = MockServer::start().await;
        let xml = feed_xml(&[
            (
                "Company Announces New AI Microservices",
                "https://example.com/a",
                "Microservices for inference",
                "Mon, 06 Jan 2025 10:00:00 GMT",
            ),
            (
                "Quarterly results",
                "https://example.com/b",
                "Finance update",
                "Mon, 06 Jan 2025 09:00:00 GMT",
            ),
            (
                "Microservices retrospective",
                "https://example.com/c",
                "One keyword only",
                "Tue, 07 Jan 2025 10:00:00 GMT",
            ),
        ]);
        mount_feed(&server, "/feed", xml).await;

        let source = FeedSource {
            name: "Example".to_string(),
            url: format!("{}/feed", server.uri()),
        };
        let searcher = searcher_with(vec![source.clone()]);

        let entries = searcher.search("AI microservices", &source).await;

        // The finance item scores zero and is dropped.
        assert_eq!(entries.len(), 2);
        // Two matched tokens beats one, despite the newer date.
        assert_eq!(entries[0].url, "https://example.com/a");
        assert_eq!(entries[0].score, 2);
        assert_eq!(entries[1].score, 1);
    }

    #[tokio::test]
    async fn test_search_all_deduplicates_and_isolates_failures() {
        let server = MockServer::start().await;
        let xml_a = feed_xml(&[(
            "Shared story",
            "https://example.com/shared",
            "microservices coverage",
            "Mon, 06 Jan 2025 10:00:00 GMT",
        )]);
        let xml_b = feed_xml(&[
            (
                "Shared story (syndicated)",
                "https://example.com/shared",
                "microservices coverage again",
                "Mon, 06 Jan 2025 11:00:00 GMT",
            ),
            (
                "Unique story",
                "https://example.com/unique",
                "more microservices",
                "Mon, 06 Jan 2025 09:00:00 GMT",
            ),
        ]);
        mount_feed(&server, "/a", xml_a).await;
        mount_feed(&server, "/b", xml_b).await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let searcher = searcher_with(vec![
            FeedSource {
                name: "A".to_string(),
                url: format!("{}/a", server.uri()),
            },
            FeedSource {
                name: "Broken".to_string(),
                url: format!("{}/broken", server.uri()),
            },
            FeedSource {
                name: "B".to_string(),
                url: format!("{}/b", server.uri()),
            },
        ]);

        let entries = searcher.search_all("microservices").await;

        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls.len(), 2, "duplicate URL kept once, broken feed ignored");
        assert!(urls.contains(&"https://example.com/shared"));
        assert!(urls.contains(&"https://example.com/unique"));

        // First occurrence (source A) won the dedup.
        let shared = entries
            .iter()
            .find(|e| e.url == "https://example.com/shared")
            .unwrap();
        assert_eq!(shared.source, "A");
    }

    #[tokio::test]
    async fn test_search_all_respects_max_results() {
        let server = MockServer::start().await;
        let items: Vec<(String, String)> = (0..10)
            .map(|i| {
                (
                    format!("Microservices update {}", i),
                    format!("https://example.com/{}", i),
                )
            })
            .collect();
        let tuples: Vec<(&str, &str, &str, &str)> = items
            .iter()
            .map(|(t, u)| (t.as_str(), u.as_str(), "microservices", "Mon, 06 Jan 2025 10:00:00 GMT"))
            .collect();
        mount_feed(&server, "/feed", feed_xml(&tuples)).await;

        let searcher = searcher_with(vec![FeedSource {
            name: "Example".to_string(),
            url: format!("{}/feed", server.uri()),
        }]);

        let entries = searcher.search_all("microservices").await;
        assert_eq!(entries.len(), 5);
    }

    #[tokio::test]
    async fn test_unreachable_feed_yields_empty() {
        let searcher = searcher_with(vec![FeedSource {
            name: "Dead".to_string(),
            url: "http://127.0.0.1:1/feed".to_string(),
        }]);

        let source = searcher.sources()[0].clone();
        assert!(searcher.search("anything", &source).await.is_empty());
        assert!(searcher.search_all("anything").await.is_empty());
    }

    #[tokio::test]
    async fn test_recent_filters_by_cutoff() {
        let server = MockServer::start().await;
        let fresh = Utc::now() - ChronoDuration::days(1);
        let stale = Utc::now() - ChronoDuration::days(30);
        let xml = feed_xml(&[
            (
                "Fresh item",
                "https://example.com/fresh",
                "summary",
                &fresh.to_rfc2822(),
            ),
            (
                "Stale item",
                "https://example.com/stale",
                "summary",
                &stale.to_rfc2822(),
            ),
        ]);
        mount_feed(&server, "/feed", xml).await;

        let searcher = searcher_with(vec![FeedSource {
            name: "Example".to_string(),
            url: format!("{}/feed", server.uri()),
        }]);

        let entries = searcher.recent(7).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://example.com/fresh");
        assert_eq!(entries[0].score, 1);
    }

    #[tokio::test]
    async fn test_enrich_fills_top_entries_best_effort() {
        let server = MockServer::start().await;
        let xml = feed_xml(&[
            (
                "With article",
                &format!("{}/article", server.uri()),
                "microservices teaser",
                "Mon, 06 Jan 2025 10:00:00 GMT",
            ),
            (
                "Broken article",
                &format!("{}/missing", server.uri()),
                "microservices teaser two",
                "Sun, 05 Jan 2025 10:00:00 GMT",
            ),
        ]);
        mount_feed(&server, "/feed", xml).await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><body><div class="post-content">The whole article body.</div></body></html>"#
                    .as_bytes()
                    .to_vec(),
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let searcher = searcher_with(vec![FeedSource {
            name: "Example".to_string(),
            url: format!("{}/feed", server.uri()),
        }]);

        let mut entries = searcher.search_all("microservices").await;
        assert_eq!(entries.len(), 2);

        searcher.enrich(&mut entries, 2).await;

        assert_eq!(
            entries[0].full_text.as_deref(),
            Some("The whole article body.")
        );
        // Unfetchable article: the entry keeps its summary, nothing fails.
        assert!(entries[1].full_text.is_none());
    }

    #[test]
    fn test_entry_projection_normalizes_score() {
        let entry = FeedEntry {
            title: "T".to_string(),
            url: "https://example.com/x".to_string(),
            summary: "S".to_string(),
            published: Utc::now(),
            source: "Example".to_string(),
            score: 2,
            full_text: None,
        };

        let hit = entry.into_hit(4);
        assert_eq!(hit.identity, "https://example.com/x");
        assert_eq!(hit.origin, Origin::Feed);
        assert!((hit.score - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_published_parsing_variants() {
        assert!(parse_published("Mon, 06 Jan 2025 10:00:00 GMT").is_some());
        assert!(parse_published("2025-01-06T10:00:00Z").is_some());
        assert!(parse_published("not a date").is_none());
    }
}
