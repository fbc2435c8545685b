//! Default values for configuration

/// Default Qdrant URL for local development
pub fn default_index_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default environment variable name for the index API key
pub fn default_index_api_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}

/// Default collection name
pub fn default_collection_name() -> String {
    "gleaner_chunks".to_string()
}

/// Default embedding backend URL (any `{model, inputs}` HTTP endpoint)
pub fn default_embedding_url() -> String {
    std::env::var("EMBEDDING_URL").unwrap_or_else(|_| "http://127.0.0.1:8188/embed".to_string())
}

/// Default embedding model identifier
pub fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

/// Default embedding dimension for bge-small-en-v1.5
pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding calls
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default target characters per chunk
pub fn default_chunk_target_chars() -> usize {
    1000
}

/// Default overlap characters between chunks
pub fn default_chunk_overlap() -> usize {
    200
}

/// Default number of newest entries inspected per feed
pub fn default_feed_scan_per_feed() -> usize {
    20
}

/// Default maximum merged feed results
pub fn default_feed_max_results() -> usize {
    5
}

/// Default feed request timeout in seconds
pub fn default_feed_timeout() -> u64 {
    30
}

/// Default user agent
pub fn default_user_agent() -> String {
    format!("gleaner/{} (Feed Aggregator)", env!("CARGO_PKG_VERSION"))
}

/// Default content-region selectors tried in order during article extraction.
/// Most site-specific first; markup changes independently of core logic, so
/// this list is configurable.
pub fn default_extract_selectors() -> Vec<String> {
    [
        ".post-content",
        ".entry-content",
        ".article-content",
        ".content",
        "main article",
        ".post-body",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Default character budget for extracted article text
pub fn default_extract_max_chars() -> usize {
    2000
}

/// Default maximum results returned by the aggregator
pub fn default_query_max_results() -> usize {
    5
}

/// Default number of corpus neighbors requested per query
pub fn default_query_corpus_k() -> usize {
    5
}

/// How many top feed results get full-text enrichment per query
pub fn default_query_enrich_top() -> usize {
    2
}

/// Content shorter than this triggers best-effort extraction enrichment
pub fn default_ingest_min_content_chars() -> usize {
    200
}

/// Default ingestion event log retention
pub fn default_event_retention() -> usize {
    50
}
