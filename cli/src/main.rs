//! `lexrag`: run the generation and validation workflows against a JSON
//! library file.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lexrag_embeddings::{EmbeddingGuard, EmbeddingProvider, EmbeddingRequest};
use lexrag_retrieval::{
    IndexBackend, InMemoryVectorIndex, RpcVectorIndex, SimilaritySearch, VectorIndex,
};
use lexrag_workflows::{
    ClauseExtractor, GenerationRequest, GenerationWorkflow, LibrarySnapshot, MemoryStore,
    ReferenceStore, Retriever, Services, ValidationRequest, ValidationWorkflow,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::LexragConfig;

#[derive(Parser, Debug)]
#[command(
    name = "lexrag",
    version,
    about = "Draft and validate documents against a reference library"
)]
struct Cli {
    /// Config file (defaults to $LEXRAG_CONFIG or ./lexrag.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draft a new document from the best-matching reference.
    Generate(GenerateArgs),
    /// Check a document against requirements or the library's key clauses.
    Validate(ValidateArgs),
    /// Print the key clauses of a text file.
    Clauses {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Library JSON file (references and artifacts)
    #[arg(long)]
    library: PathBuf,

    /// What the document should cover
    #[arg(long)]
    query: String,

    #[arg(long)]
    title: String,

    /// Document type, e.g. nda
    #[arg(long = "type")]
    document_type: String,

    /// Party name; repeat for several
    #[arg(long = "party")]
    parties: Vec<String>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Library JSON file (references and artifacts)
    #[arg(long)]
    library: PathBuf,

    /// Stored artifact to validate
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    artifact: Option<String>,

    /// Text file to validate
    #[arg(long)]
    file: Option<PathBuf>,

    /// Requirements to check against; omit to compare with key clauses
    #[arg(long)]
    requirements: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => {
            let config = LexragConfig::load(cli.config.as_deref())?;
            generate(&config, args).await
        }
        Command::Validate(args) => {
            let config = LexragConfig::load(cli.config.as_deref())?;
            validate(&config, args).await
        }
        Command::Clauses { file } => {
            let config = LexragConfig::load(cli.config.as_deref())?;
            let text = read_text(&file).await?;
            let extractor = ClauseExtractor::new(config.workflow.clauses);
            println!("{}", extractor.extract_key_clauses(&text));
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn generate(config: &LexragConfig, args: GenerateArgs) -> Result<()> {
    let store = Arc::new(load_library(&args.library).await?);
    let services = build_services(config, &store).await?;
    let workflow = GenerationWorkflow::new(services, config.workflow.clone());

    let request = GenerationRequest {
        query: args.query,
        title: args.title,
        document_type: args.document_type,
        parties: args.parties,
    };
    let output = workflow.run(&request).await.context("generation failed")?;

    save_library(&args.library, &store).await?;
    print_json(&output)
}

async fn validate(config: &LexragConfig, args: ValidateArgs) -> Result<()> {
    let store = Arc::new(load_library(&args.library).await?);
    let services = build_services(config, &store).await?;
    let workflow = ValidationWorkflow::new(services, config.workflow.clone());

    let content = match &args.file {
        Some(path) => Some(read_text(path).await?),
        None => None,
    };
    let request = ValidationRequest {
        content,
        artifact_id: args.artifact,
        requirements: args.requirements,
    };
    let output = workflow.run(&request).await.context("validation failed")?;

    if output.status_update.is_some() {
        save_library(&args.library, &store).await?;
    }
    print_json(&output)
}

async fn build_services(config: &LexragConfig, store: &Arc<MemoryStore>) -> Result<Services> {
    let embedder = lexrag_embeddings::provider::from_config(&config.embedding);
    let index: Arc<dyn VectorIndex> = match config.vector_index.backend {
        IndexBackend::Remote => Arc::new(RpcVectorIndex::from_config(&config.vector_index)),
        IndexBackend::Memory => Arc::new(embed_library(embedder.as_ref(), store).await?),
    };
    let guard = EmbeddingGuard::new(embedder, &config.guard);
    let completer = lexrag_llm::from_config(&config.completion);
    info!(
        "Using {} for embeddings and {} ({}) for completions",
        guard.provider_name(),
        completer.name(),
        completer.model()
    );

    Ok(Services {
        retriever: Retriever::new(Arc::new(guard), SimilaritySearch::new(index)),
        references: store.clone(),
        artifacts: store.clone(),
        completer,
    })
}

/// Embed every library reference into an in-memory index.
///
/// Calls the provider directly, so the guard's call budget is left for
/// queries.
async fn embed_library(
    embedder: &dyn EmbeddingProvider,
    store: &MemoryStore,
) -> Result<InMemoryVectorIndex> {
    let index = InMemoryVectorIndex::new(embedder.default_dimension());
    for reference in store.list_all().await? {
        let response = embedder
            .embed(EmbeddingRequest::new(reference.content.as_str()))
            .await
            .with_context(|| format!("failed to embed reference {}", reference.id))?;
        index
            .add(
                reference.id,
                reference.content,
                response.embedding,
                json!({ "title": reference.title }),
            )
            .await?;
    }
    if index.is_empty().await {
        warn!("Library has no references to index");
    } else {
        info!("Indexed {} references in memory", index.len().await);
    }
    Ok(index)
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn load_library(path: &Path) -> Result<MemoryStore> {
    let raw = read_text(path).await?;
    let snapshot: LibrarySnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("invalid library file {}", path.display()))?;
    info!(
        "Loaded {} references and {} artifacts",
        snapshot.references.len(),
        snapshot.artifacts.len()
    );
    Ok(MemoryStore::from_snapshot(snapshot))
}

/// Write the library back atomically next to the original.
async fn save_library(path: &Path, store: &MemoryStore) -> Result<()> {
    let json = serde_json::to_vec_pretty(&store.snapshot().await)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        std::io::Write::write_all(&mut tmp, &json)?;
        tmp.persist(&target)
            .with_context(|| format!("failed to write {}", target.display()))?;
        Ok(())
    })
    .await??;
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
