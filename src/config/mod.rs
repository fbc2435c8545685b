//! Configuration management for gleaner
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Embedding backend configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Syndication feed configuration
    #[serde(default)]
    pub feeds: FeedConfig,

    /// Article extraction configuration
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Query / aggregation configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Ingestion pipeline configuration
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Vector index connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Qdrant connection URL
    #[serde(default = "default_index_url")]
    pub url: String,

    /// Environment variable name holding the index API key
    #[serde(default = "default_index_api_key_env")]
    pub api_key_env: String,

    /// Collection name
    #[serde(default = "default_collection_name")]
    pub collection: String,
}

/// Embedding backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// HTTP endpoint accepting `{model, inputs}` requests
    #[serde(default = "default_embedding_url")]
    pub url: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding calls
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Target characters per chunk
    #[serde(default = "default_chunk_target_chars")]
    pub target_chars: usize,

    /// Overlap characters between adjacent chunks
    #[serde(default = "default_chunk_overlap")]
    pub overlap_chars: usize,
}

/// A single configured syndication feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    /// Human-readable source label
    pub name: String,

    /// RSS/Atom feed URL
    pub url: String,
}

/// Syndication feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Configured feed sources
    #[serde(default)]
    pub sources: Vec<FeedSource>,

    /// Newest entries inspected per feed (feeds are assumed reverse-chronological)
    #[serde(default = "default_feed_scan_per_feed")]
    pub scan_per_feed: usize,

    /// Maximum merged feed results
    #[serde(default = "default_feed_max_results")]
    pub max_results: usize,

    /// Request timeout in seconds
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Article extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Content-region selectors tried in order, most site-specific first
    #[serde(default = "default_extract_selectors")]
    pub selectors: Vec<String>,

    /// Character budget for extracted text
    #[serde(default = "default_extract_max_chars")]
    pub max_chars: usize,
}

/// Query / aggregation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Maximum results returned by the aggregator
    #[serde(default = "default_query_max_results")]
    pub max_results: usize,

    /// Corpus neighbors requested per query
    #[serde(default = "default_query_corpus_k")]
    pub corpus_k: usize,

    /// Top feed results enriched with extracted article text (0 disables)
    #[serde(default = "default_query_enrich_top")]
    pub enrich_top: usize,
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Content shorter than this triggers extraction enrichment
    #[serde(default = "default_ingest_min_content_chars")]
    pub min_content_chars: usize,

    /// Event log retention cap
    #[serde(default = "default_event_retention")]
    pub event_retention: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for gleaner data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to the ingestion event log
    pub events_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            chunk: ChunkConfig::default(),
            feeds: FeedConfig::default(),
            extract: ExtractConfig::default(),
            query: QueryConfig::default(),
            ingest: IngestConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            api_key_env: default_index_api_key_env(),
            collection: default_collection_name(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            target_chars: default_chunk_target_chars(),
            overlap_chars: default_chunk_overlap(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            scan_per_feed: default_feed_scan_per_feed(),
            max_results: default_feed_max_results(),
            timeout_secs: default_feed_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            selectors: default_extract_selectors(),
            max_chars: default_extract_max_chars(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_results: default_query_max_results(),
            corpus_k: default_query_corpus_k(),
            enrich_top: default_query_enrich_top(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_content_chars: default_ingest_min_content_chars(),
            event_retention: default_event_retention(),
        }
    }
}

impl Config {
    /// Get the default base directory for gleaner (~/.gleaner)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gleaner")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            events_file: base.join("events.json"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            events_file: base.join("events.json"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
            config.validate()?;
        } else {
            debug!("No config file found, using defaults");
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Get the index API key from environment
    pub fn index_api_key(&self) -> Option<String> {
        std::env::var(&self.index.api_key_env).ok()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk.overlap_chars >= self.chunk.target_chars {
            return Err(Error::Config(
                "chunk.overlap_chars must be < chunk.target_chars".to_string(),
            ));
        }

        if self.feeds.scan_per_feed == 0 {
            return Err(Error::Config(
                "feeds.scan_per_feed must be positive".to_string(),
            ));
        }

        if self.query.max_results == 0 {
            return Err(Error::Config(
                "query.max_results must be positive".to_string(),
            ));
        }

        if self.ingest.event_retention == 0 {
            return Err(Error::Config(
                "ingest.event_retention must be positive".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
