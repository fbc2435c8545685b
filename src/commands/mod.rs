//! Command implementations shared by the CLI

use crate::aggregate::{render_context, Aggregator, NO_RESULTS_MESSAGE};
use crate::config::Config;
use crate::corpus::{CorpusStats, CorpusStore};
use crate::error::{Error, Result};
use crate::feed::{FeedEntry, FeedSearcher};
use crate::ingest::{ContentEvent, EventOutcome, IngestReceipt, IngestionEvent, IngestionPipeline};
use crate::models::{Document, SearchHit, SourceKind};
use crate::parse::{is_text_file, load_file};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Statistics from a directory ingestion run
#[derive(Debug, Default, Serialize)]
pub struct AddStats {
    pub docs_processed: usize,
    pub docs_skipped: usize,
    pub chunks_created: usize,
    pub errors: Vec<String>,
}

/// System status snapshot
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub index_url: String,
    pub collection: String,
    pub embedding_model: String,
    pub corpus: CorpusStats,
    pub feed_sources: Vec<String>,
    pub recent_events: usize,
}

/// Initialize configuration on disk
pub async fn cmd_init(base_dir: Option<PathBuf>, force: bool) -> Result<Config> {
    let mut config = Config::default();
    let base = base_dir.unwrap_or_else(Config::default_base_dir);

    let config_file = base.join("config.toml");
    if config_file.exists() && !force {
        return Err(Error::Config(format!(
            "Already initialized at {}",
            config_file.display()
        )));
    }

    std::fs::create_dir_all(&base)?;
    config.paths.base_dir = base.clone();
    config.paths.config_file = config_file;
    config.paths.events_file = base.join("events.json");
    config.save()?;

    Ok(config)
}

/// Ingest every text document under a directory into the corpus
pub async fn cmd_add_dir(
    corpus: &CorpusStore,
    path: &Path,
    collection: Option<String>,
) -> Result<AddStats> {
    let canonical = path
        .canonicalize()
        .map_err(|e| Error::InvalidPath(format!("{}: {}", path.display(), e)))?;

    let collection = collection.unwrap_or_else(|| {
        canonical
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("corpus")
            .to_string()
    });

    info!(
        "Ingesting directory {} as collection '{}'",
        canonical.display(),
        collection
    );

    let mut files: Vec<PathBuf> = Vec::new();
    let walker = WalkBuilder::new(&canonical)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .build();

    for entry in walker {
        match entry {
            Ok(e) if e.file_type().map(|t| t.is_file()).unwrap_or(false) => {
                let p = e.path().to_path_buf();
                if is_text_file(&p) {
                    files.push(p);
                }
            }
            _ => {}
        }
    }
    files.sort();

    info!("Found {} files to process", files.len());

    let mut stats = AddStats::default();

    for file in files {
        match ingest_file(corpus, &file, &collection).await {
            Ok(chunks) => {
                stats.docs_processed += 1;
                stats.chunks_created += chunks;
            }
            Err(e) => {
                let msg = format!("{}: {}", file.display(), e);
                warn!("{}", msg);
                stats.errors.push(msg);
                stats.docs_skipped += 1;
            }
        }
    }

    info!(
        "Directory ingestion complete: {} docs, {} chunks",
        stats.docs_processed, stats.chunks_created
    );

    Ok(stats)
}

async fn ingest_file(corpus: &CorpusStore, path: &Path, collection: &str) -> Result<usize> {
    let loaded = load_file(path)?;
    if loaded.text.is_empty() {
        return Err(Error::Parse(format!("no text content: {}", path.display())));
    }

    let uri = path.display().to_string();
    let doc = Document {
        id: Document::id_for_url(&format!("file://{}", uri)),
        title: loaded.title,
        text: loaded.text,
        kind: SourceKind::Corpus,
        metadata: BTreeMap::from([
            ("collection".to_string(), collection.to_string()),
            ("path".to_string(), uri),
        ]),
    };

    corpus.add(&doc).await
}

/// Run the blended query
pub async fn cmd_query(aggregator: &Aggregator, query: &str) -> Vec<SearchHit> {
    aggregator.search(query).await
}

/// Gather a status snapshot
pub async fn cmd_status(
    config: &Config,
    corpus: &CorpusStore,
    pipeline: &IngestionPipeline,
) -> Result<StatusReport> {
    let stats = corpus.stats().await;
    let recent_events = pipeline.events().read_all()?.len();

    Ok(StatusReport {
        index_url: config.index.url.clone(),
        collection: config.index.collection.clone(),
        embedding_model: config.embedding.model.clone(),
        corpus: stats,
        feed_sources: config
            .feeds
            .sources
            .iter()
            .map(|s| format!("{} ({})", s.name, s.url))
            .collect(),
        recent_events,
    })
}

/// Recent feed entries across all sources
pub async fn cmd_recent(feeds: &FeedSearcher, days: i64) -> Vec<FeedEntry> {
    feeds.recent(days).await
}

/// Newest ingestion events
pub fn cmd_events(pipeline: &IngestionPipeline, limit: usize) -> Result<Vec<IngestionEvent>> {
    pipeline.events().recent(limit)
}

/// Ingest one pushed content event
pub async fn cmd_ingest(
    pipeline: &IngestionPipeline,
    event: ContentEvent,
) -> Result<IngestReceipt> {
    pipeline.ingest(event).await
}

/// Drop every indexed chunk
pub async fn cmd_reset(corpus: &CorpusStore) -> Result<()> {
    corpus.reset().await
}

// ---- plain-text output helpers ----

pub fn print_query_results(query: &str, hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("{}", NO_RESULTS_MESSAGE);
        return;
    }
    print!("{}", render_context(query, hits));
}

pub fn print_add_stats(stats: &AddStats) {
    println!("\n✓ Directory ingestion complete");
    println!("  Documents processed: {}", stats.docs_processed);
    println!("  Documents skipped: {}", stats.docs_skipped);
    println!("  Chunks created: {}", stats.chunks_created);
    for error in &stats.errors {
        println!("  ! {}", error);
    }
}

pub fn print_status(status: &StatusReport) {
    println!("Index: {} (collection {})", status.index_url, status.collection);
    println!("Embedding model: {}", status.embedding_model);
    println!(
        "Chunks: {} total ({} corpus, {} web)",
        status.corpus.total_chunks, status.corpus.corpus_chunks, status.corpus.web_chunks
    );
    println!("Ingestion events retained: {}", status.recent_events);
    if status.feed_sources.is_empty() {
        println!("Feeds: none configured");
    } else {
        println!("Feeds:");
        for source in &status.feed_sources {
            println!("  - {}", source);
        }
    }
}

pub fn print_feed_entries(entries: &[FeedEntry]) {
    if entries.is_empty() {
        println!("No recent entries.");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        println!("{}. {}", i + 1, entry.title);
        println!("   Source: {}", entry.source);
        println!("   Published: {}", entry.published.format("%Y-%m-%d"));
        println!("   URL: {}", entry.url);
        if !entry.summary.is_empty() {
            let summary: String = entry.summary.chars().take(200).collect();
            println!("   {}", summary);
        }
        println!();
    }
}

pub fn print_events(events: &[IngestionEvent]) {
    if events.is_empty() {
        println!("No ingestion events recorded.");
        return;
    }
    for event in events {
        let outcome = match event.outcome {
            EventOutcome::Success => "ok",
            EventOutcome::Error => "ERROR",
        };
        print!(
            "[{}] {} {} ({})",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            outcome,
            event.title,
            event.url
        );
        if let Some(ref detail) = event.error {
            print!(": {}", detail);
        }
        println!();
    }
}
