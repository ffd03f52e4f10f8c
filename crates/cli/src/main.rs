//! AI-OPS knowledge base CLI.

use std::path::{Path, PathBuf};

use aiops_core::{IndexBackend, StoreConfig};
use aiops_knowledge::{
    discover_datasets, format_context, CreateOutcome, DatasetScan, KnowledgeStore, RetrieveOptions,
    DEFAULT_LIMIT, DEFAULT_THRESHOLD,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aiops-kb")]
#[command(about = "Inspect, ingest and query the AI-OPS knowledge base", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct StoreArgs {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory for metadata and datasets (default ~/.aiops)
    #[arg(long, global = true)]
    base_path: Option<PathBuf>,

    /// Keep vectors in memory instead of Qdrant
    #[arg(long, global = true, conflicts_with = "qdrant_url")]
    in_memory: bool,

    /// Qdrant server URL
    #[arg(long, global = true)]
    qdrant_url: Option<String>,

    /// Ollama server URL
    #[arg(long, global = true)]
    ollama_url: Option<String>,

    /// Embedding model name
    #[arg(long, global = true)]
    embedding_model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List tracked collections
    Collections,
    /// Show one collection's documents
    Show {
        /// Collection title
        name: String,
    },
    /// List dataset files as collections
    Datasets {
        /// Delete files that are not JSON datasets
        #[arg(long)]
        cleanup: bool,
    },
    /// Create a collection for each dataset
    Ingest {
        /// Delete files that are not JSON datasets
        #[arg(long)]
        cleanup: bool,
        /// Hide the upload progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Retrieve passages for a query
    Retrieve {
        /// Collection title
        collection: String,
        /// Query text
        query: String,
        /// Maximum number of passages
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        /// Minimum similarity
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = resolve_config(&cli.store)?;

    match cli.command {
        Commands::Collections => {
            if config.index.is_persistent() {
                println!("Metadata: {}", config.knowledge_dir().display());
            }
            let store = open_store(config).await?;
            let collections = store.collections().await;

            println!("Collections ({})", collections.len());
            for collection in collections {
                let topics: Vec<_> = collection.topics.iter().map(|t| t.as_str()).collect();
                println!(
                    "  {} | {} | {} documents | {} points | {}",
                    collection.id,
                    collection.title,
                    collection.documents.len(),
                    collection.size,
                    topics.join(", "),
                );
            }
            for failure in store.metadata_failures() {
                println!("  skipped {}: {}", failure.path.display(), failure.error);
            }
        }
        Commands::Show { name } => {
            let store = open_store(config).await?;
            let Some(collection) = store.get_collection(&name).await else {
                println!("Collection not found");
                return Ok(());
            };

            println!("Collection: {}", collection.title);
            println!("  Id: {}", collection.id);
            println!("  Points: {}", collection.size);
            println!("  Documents:");
            for document in &collection.documents {
                println!(
                    "    [{}] {} ({} chars)",
                    document.topic,
                    document.name,
                    document.content.chars().count()
                );
            }
        }
        Commands::Datasets { cleanup } => {
            let dir = config.datasets_dir();
            let report = discover_datasets(&dir, DatasetScan { cleanup })
                .await
                .with_context(|| format!("Failed to scan {}", dir.display()))?;

            println!("Datasets in {} ({})", dir.display(), report.loaded.len());
            for collection in &report.loaded {
                println!(
                    "  {} | {} | {} documents",
                    collection.id,
                    collection.title,
                    collection.documents.len()
                );
            }
            for failure in &report.failures {
                println!("  skipped {}: {}", failure.path.display(), failure.error);
            }
        }
        Commands::Ingest { cleanup, no_progress } => {
            let dir = config.datasets_dir();
            let report = discover_datasets(&dir, DatasetScan { cleanup })
                .await
                .with_context(|| format!("Failed to scan {}", dir.display()))?;
            let store = open_store(config).await?;

            for collection in report.loaded {
                let title = collection.title.clone();
                match store.create_collection(collection, !no_progress).await {
                    Ok(CreateOutcome::Created { points }) => {
                        println!("  {}: created ({} points)", title, points)
                    }
                    Ok(CreateOutcome::AlreadyTracked) => println!("  {}: already present", title),
                    Ok(CreateOutcome::IndexExists) => {
                        println!("  {}: index has it but metadata is missing, skipped", title)
                    }
                    Err(e) => warn!("Failed to ingest {}: {}", title, e),
                }
            }
            info!("Ingestion finished ({} datasets skipped)", report.failures.len());
        }
        Commands::Retrieve { collection, query, limit, threshold } => {
            let store = open_store(config).await?;
            let passages = store
                .retrieve_passages(&query, &collection, RetrieveOptions { limit, threshold })
                .await?;

            if passages.is_empty() {
                println!("No relevant passages");
            } else {
                for passage in &passages {
                    println!("[{:.3}] {} ({})", passage.score, passage.title, passage.topic);
                }
                println!();
                print!("{}", format_context(&passages));
            }
        }
    }

    Ok(())
}

async fn open_store(config: StoreConfig) -> Result<KnowledgeStore> {
    KnowledgeStore::new(config)
        .await
        .context("Failed to open knowledge store")
}

/// Config file (or defaults) with command-line overrides applied.
fn resolve_config(args: &StoreArgs) -> Result<StoreConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => StoreConfig::default(),
    };

    if let Some(base_path) = &args.base_path {
        config.base_path = base_path.clone();
    }
    if let Some(url) = &args.ollama_url {
        config.embedding.url = url.clone();
    }
    if let Some(model) = &args.embedding_model {
        config.embedding.model = model.clone();
    }
    if args.in_memory {
        config.index = IndexBackend::InMemory;
    } else if let Some(url) = &args.qdrant_url {
        let mut index = match config.index {
            IndexBackend::InMemory => IndexBackend::default(),
            qdrant => qdrant,
        };
        if let IndexBackend::Qdrant { url: current, .. } = &mut index {
            *current = url.clone();
        }
        config.index = index;
    }

    Ok(config)
}

fn load_config(path: &Path) -> Result<StoreConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid config {}", path.display()))
}
