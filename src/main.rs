use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use code_search_core::domain::chunking::subproject::SubprojectDetector;
use code_search_core::domain::chunking::windows::{Chunker, ChunkerConfig};
use code_search_core::domain::ports::embedding::EmbeddingProvider;
use code_search_core::domain::types::JobPriority;
use code_search_core::indexing::{Indexer, IndexingQueue};
use code_search_core::infrastructure::chunk_store::ChunkStore;
use code_search_core::infrastructure::config::ConfigLoader;
use code_search_core::infrastructure::embedding_cache::EmbeddingCache;
use code_search_core::infrastructure::project_registry::ProjectRegistry;
use code_search_core::infrastructure::providers::DeterministicHashProvider;
#[cfg(feature = "fastembed-provider")]
use code_search_core::infrastructure::providers::FastEmbedProvider;
use code_search_core::vector_index::InMemoryVectorIndex;
use code_search_core::RequestDispatcher;

#[derive(Parser, Debug)]
#[command(name = "code-search-core")]
#[command(about = "Semantic code search: indexing, embedding, and vector search core")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file, layered over the embedded defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index every configured project once, then idle until interrupted.
    Serve,
    /// Index a single project directory and exit.
    Index {
        /// Project identifier to register the results under.
        project: String,
        /// Directory to walk and index.
        path: PathBuf,
    },
    /// Run one semantic search against an already-indexed project.
    Search {
        /// Project to search within.
        project: String,
        /// Query text to embed and match against.
        query: String,
        /// Maximum number of results to print.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    code_search_core::telemetry::init_tracing();
    let cli = Cli::parse();

    let loader = ConfigLoader::new();
    let config = match &cli.config {
        Some(path) => loader.load_with_file(path)?,
        None => loader.load()?,
    };

    let cache = Arc::new(EmbeddingCache::new(&config.cache_root)?);
    let chunk_store = Arc::new(ChunkStore::new(&config.cache_root)?);
    let registry = Arc::new(ProjectRegistry::open(&config.cache_root)?);
    let vector_index = Arc::new(InMemoryVectorIndex::new(config.max_memory_bytes));
    let provider = build_provider();

    let preloaded = vector_index.preload(&chunk_store)?;
    tracing::info!(preloaded, "vector index preload complete");

    let chunker = Chunker::new(ChunkerConfig {
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
    });
    let indexer = Arc::new(Indexer::new(
        chunker,
        SubprojectDetector::default(),
        provider.clone(),
        cache,
        chunk_store.clone(),
        registry.clone(),
        vector_index.clone(),
    ));
    let queue = Arc::new(IndexingQueue::new(indexer.clone(), config.max_concurrent_indexers));
    let dispatcher = RequestDispatcher::new(vector_index, chunk_store, registry, queue.clone(), provider);

    match cli.command {
        Command::Serve => {
            for path in &config.project_paths {
                let project = PathBuf::from(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone());
                let job_id = dispatcher.reload_index(&project, &PathBuf::from(path), JobPriority::Normal);
                tracing::info!(project, job_id, "queued startup indexing job");
            }

            for candidate in indexer.legacy_migration_candidates() {
                let job_id = dispatcher.reload_index(
                    &candidate.project,
                    Path::new(&candidate.root_path),
                    JobPriority::High,
                );
                tracing::info!(
                    project = %candidate.project,
                    job_id,
                    "queued high-priority legacy auto-migration re-index"
                );
            }

            tracing::info!("serving; press ctrl-c to stop");
            tokio::signal::ctrl_c().await?;
        }
        Command::Index { project, path } => {
            let job_id = dispatcher.reload_index(&project, &path, JobPriority::High);
            loop {
                match dispatcher.indexing_progress(&job_id) {
                    Some(job) => match job.status {
                        code_search_core::domain::types::JobStatus::Completed { chunks_indexed } => {
                            println!("indexed {chunks_indexed} chunks for project {project}");
                            break;
                        }
                        code_search_core::domain::types::JobStatus::Failed { message } => {
                            eprintln!("indexing failed: {message}");
                            std::process::exit(1);
                        }
                        _ => tokio::time::sleep(std::time::Duration::from_millis(50)).await,
                    },
                    None => tokio::time::sleep(std::time::Duration::from_millis(50)).await,
                }
            }
        }
        Command::Search { project, query, limit } => {
            let results = dispatcher.semantic_search(Some(&project), &query, limit).await?;
            for result in results {
                println!(
                    "{:.4}  {}:{}-{}\n{}\n",
                    result.score, result.file_path, result.start_line, result.end_line, result.content
                );
            }
        }
    }

    Ok(())
}

fn build_provider() -> Arc<dyn EmbeddingProvider> {
    #[cfg(feature = "fastembed-provider")]
    {
        match FastEmbedProvider::new() {
            Ok(provider) => return Arc::new(provider),
            Err(err) => {
                tracing::warn!(error = %err, "fastembed provider unavailable, falling back to deterministic hash provider");
            }
        }
    }
    Arc::new(DeterministicHashProvider::new(384))
}
