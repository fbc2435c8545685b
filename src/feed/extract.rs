//! Best-effort article body extraction
//!
//! Tries an ordered list of content-region selectors (most site-specific
//! first), falling back to concatenating all paragraph text. Every failure
//! (network, status, parse) is absorbed into `None`; extraction is optional
//! enrichment, never a correctness-critical path.

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::parse::normalize_whitespace;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

pub struct ArticleExtractor {
    client: Client,
    selectors: Vec<String>,
    max_chars: usize,
}

impl ArticleExtractor {
    pub fn new(config: &ExtractConfig, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Extract(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            selectors: config.selectors.clone(),
            max_chars: config.max_chars,
        })
    }

    /// Fetch a page and extract its main text content
    pub async fn extract(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Article fetch failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Article fetch for {} returned HTTP {}", url, response.status());
            return None;
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Article body read failed for {}: {}", url, e);
                return None;
            }
        };

        self.extract_from_html(&body)
    }

    /// Selector chain over already-fetched HTML
    pub fn extract_from_html(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        for selector_str in &self.selectors {
            let Ok(selector) = Selector::parse(selector_str) else {
                warn!("Invalid content selector: {}", selector_str);
                continue;
            };
            if let Some(element) = document.select(&selector).next() {
                let text = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty() {
                    debug!("Extracted content via selector {}", selector_str);
                    return Some(self.truncate(text));
                }
            }
        }

        // Fallback: concatenate all paragraph-level text
        let paragraph = Selector::parse("p").ok()?;
        let text = normalize_whitespace(
            &document
                .select(&paragraph)
                .map(|p| p.text().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join(" "),
        );

        if text.is_empty() {
            None
        } else {
            Some(self.truncate(text))
        }
    }

    fn truncate(&self, text: String) -> String {
        if text.chars().count() <= self.max_chars {
            text
        } else {
            text.chars().take(self.max_chars).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor(max_chars: usize) -> ArticleExtractor {
        ArticleExtractor::new(
            &ExtractConfig {
                selectors: crate::config::default_extract_selectors(),
                max_chars,
            },
            "gleaner-test",
            5,
        )
        .unwrap()
    }

    #[test]
    fn test_selector_priority() {
        let html = r#"
            <html><body>
                <div class="content">generic container text</div>
                <div class="post-content">the actual article body</div>
            </body></html>
        "#;

        let text = extractor(2000).extract_from_html(html).unwrap();
        assert_eq!(text, "the actual article body");
    }

    #[test]
    fn test_paragraph_fallback() {
        let html = r#"
            <html><body>
                <p>First paragraph.</p>
                <p>Second paragraph.</p>
            </body></html>
        "#;

        let text = extractor(2000).extract_from_html(html).unwrap();
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));
    }

    #[test]
    fn test_no_content_yields_none() {
        let html = "<html><body><div class='nav'>menu</div></body></html>";
        assert!(extractor(2000).extract_from_html(html).is_none());
    }

    #[test]
    fn test_character_budget() {
        let body = "word ".repeat(1000);
        let html = format!("<html><body><p>{}</p></body></html>", body);

        let text = extractor(100).extract_from_html(&html).unwrap();
        assert_eq!(text.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_extract_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><body><div class="entry-content">Served over HTTP.</div></body></html>"#
                    .as_bytes()
                    .to_vec(),
                "text/html",
            ))
            .mount(&server)
            .await;

        let text = extractor(2000)
            .extract(&format!("{}/article", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "Served over HTTP.");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_absorbed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(extractor(2000)
            .extract(&format!("{}/missing", server.uri()))
            .await
            .is_none());
    }
}
