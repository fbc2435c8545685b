//! gleaner CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use gleaner::{
    aggregate::Aggregator,
    commands::{
        cmd_add_dir, cmd_events, cmd_ingest, cmd_init, cmd_query, cmd_recent, cmd_reset,
        cmd_status, print_add_stats, print_events, print_feed_entries, print_query_results,
        print_status,
    },
    config::Config,
    corpus::CorpusStore,
    embed::HttpEmbedder,
    error::{Error, Result},
    feed::{ArticleExtractor, FeedSearcher},
    index::QdrantIndex,
    ingest::{ContentEvent, EventLog, IngestionPipeline},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gleaner")]
#[command(version, about = "Blended retrieval over a semantic corpus and live feeds", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize gleaner configuration
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Add documents to the corpus
    Add {
        #[command(subcommand)]
        source: AddSource,
    },

    /// Run a blended query across corpus and feeds
    Query {
        /// The search query
        query: String,
    },

    /// Show recent feed entries across all configured feeds
    Recent {
        /// How many days back to look
        #[arg(short, long, default_value = "7")]
        days: i64,
    },

    /// Show system status
    Status,

    /// Show the ingestion event log
    Events {
        /// Maximum events to show, newest first
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Ingest a pushed content event (JSON from file or stdin)
    Ingest {
        /// Path to the event JSON; reads stdin when omitted or "-"
        file: Option<PathBuf>,
    },

    /// Drop every indexed chunk and recreate the collection
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum AddSource {
    /// Ingest a local directory of text/markdown/html documents
    Dir {
        /// Path to directory
        path: PathBuf,

        /// Collection name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Commands that need no existing config
    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config, force).await;
    }
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "gleaner", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    // Shared components
    let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);
    let index = Arc::new(QdrantIndex::connect(&config)?);
    let corpus = Arc::new(CorpusStore::new(
        embedder,
        index,
        config.chunk.clone(),
        config.embedding.batch_size,
    ));
    let feeds = Arc::new(FeedSearcher::new(config.feeds.clone(), &config.extract)?);
    let extractor = Arc::new(ArticleExtractor::new(
        &config.extract,
        &config.feeds.user_agent,
        config.feeds.timeout_secs,
    )?);
    let pipeline = IngestionPipeline::new(
        corpus.clone(),
        extractor,
        EventLog::new(
            config.paths.events_file.clone(),
            config.ingest.event_retention,
        ),
        config.ingest.min_content_chars,
    );

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Add { source } => match source {
            AddSource::Dir { path, name } => {
                let stats = cmd_add_dir(&corpus, &path, name).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    print_add_stats(&stats);
                }
            }
        },

        Commands::Query { query } => {
            let aggregator = Aggregator::new(
                corpus.clone(),
                feeds.clone(),
                config.query.corpus_k,
                config.query.max_results,
                config.query.enrich_top,
            );
            let hits = cmd_query(&aggregator, &query).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_query_results(&query, &hits);
            }
        }

        Commands::Recent { days } => {
            let entries = cmd_recent(&feeds, days).await;
            if cli.json {
                let summaries: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "title": e.title,
                            "url": e.url,
                            "source": e.source,
                            "published": e.published.to_rfc3339(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                print_feed_entries(&entries);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &corpus, &pipeline).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Events { limit } => {
            let events = cmd_events(&pipeline, limit)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                print_events(&events);
            }
        }

        Commands::Ingest { file } => {
            let event = read_event(file.as_deref())?;
            match cmd_ingest(&pipeline, event).await {
                Ok(receipt) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&receipt)?);
                    } else {
                        println!("✓ {}", receipt.message);
                        println!("  Document: {}", receipt.document_id);
                        println!("  Chunks added: {}", receipt.chunks_added);
                    }
                }
                Err(e) => {
                    if cli.json {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&serde_json::json!({
                                "status": "error",
                                "message": e.to_string(),
                            }))?
                        );
                        std::process::exit(1);
                    }
                    return Err(e);
                }
            }
        }

        Commands::Reset { yes } => {
            if !yes {
                eprintln!("This drops every indexed chunk. Re-run with --yes to confirm.");
                std::process::exit(1);
            }
            cmd_reset(&corpus).await?;
            println!("✓ Corpus reset");
        }
    }

    Ok(())
}

async fn handle_init(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let base_dir = config_path
        .as_deref()
        .and_then(|p| {
            if p.extension().map_or(false, |e| e == "toml") {
                p.parent().map(PathBuf::from)
            } else {
                Some(p.to_path_buf())
            }
        })
        .unwrap_or_else(Config::default_base_dir);

    let config = cmd_init(Some(base_dir), force).await?;

    println!("✓ gleaner initialized successfully");
    println!("  Config: {}", config.paths.config_file.display());
    println!("\nNext steps:");
    println!("  1. Edit the config file: add [[feeds.sources]] entries");
    println!("  2. Start Qdrant: docker run -p 6334:6334 qdrant/qdrant");
    println!("  3. Point embedding.url at your embedding service");
    println!("  4. Ingest docs: gleaner add dir /path/to/docs");

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(p) => Config::load(p),
        None => {
            let default = Config::default_config_path();
            if !default.exists() {
                return Err(Error::NotInitialized);
            }
            Config::load(&default)
        }
    }
}

fn read_event(file: Option<&std::path::Path>) -> Result<ContentEvent> {
    let raw = match file {
        Some(p) if p.to_str() != Some("-") => std::fs::read_to_string(p)?,
        _ => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let event: ContentEvent = serde_json::from_str(&raw)?;
    Ok(event)
}
