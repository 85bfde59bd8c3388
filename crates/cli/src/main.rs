//! QuoteMaster CLI
//!
//! Command-line interface and HTTP server for the QuoteMaster
//! retrieval-augmented quoting engine.

mod http;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use quotemaster_core::{DocumentChunk, SourceRef};
use quotemaster_engine::{
    ChatOrchestrator, Embedder, EngineConfig, MemorySessionStore, OllamaClient, PromptBuilder,
    Retriever,
};
use quotemaster_store::{artifacts, EmbeddingStore, KnowledgeGraph};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_SYSTEM_PROMPT: &str = "You are QuoteMaster AI, an expert in business quotes and \
estimates. Respond with properly formatted markdown tables: every table needs a header row, a \
separator row, and consistent column counts. Include Products and Services sections when \
relevant, and a total row at the bottom of each table. When the user asks for a quotation, the \
first table must be the summary table (Client Name, Project Name, Date). Use INR for monetary \
values unless the user requests another currency. Be professional, helpful, and concise.";

/// QuoteMaster - RAG-backed quoting assistant for business estimates
#[derive(Parser)]
#[command(name = "quotemaster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory holding chunks.json and entities.json
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chat API over HTTP
    Serve {
        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        addr: String,
    },

    /// Ask a single question
    Ask {
        /// The question
        message: String,

        /// Session id to continue
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Interactive chat
    Chat,

    /// Build the embedding index from a directory of .txt documents
    BuildIndex {
        /// Directory of quote documents
        #[arg(short, long, default_value = "data/quotes")]
        quotes_dir: PathBuf,
    },

    /// Show artifact statistics
    Stats,

    /// Show the embedding dimension from the active embeddings model
    EmbeddingDim {
        /// Optional text to embed (defaults to "dimension probe")
        text: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = EngineConfig::from_env();

    // Commands that talk to Ollama check it is reachable first
    let needs_ollama = matches!(
        cli.command,
        Commands::Serve { .. }
            | Commands::Ask { .. }
            | Commands::Chat
            | Commands::BuildIndex { .. }
            | Commands::EmbeddingDim { .. }
    );
    if needs_ollama {
        let ollama = OllamaClient::from_config(&config);
        let ok = ollama.health().await.unwrap_or(false);
        if !ok {
            eprintln!("Error: Ollama is not reachable at {}", ollama.base_url());
            eprintln!("Start it with: ollama serve");
            anyhow::bail!("Inference service unavailable");
        }
    }

    match cli.command {
        Commands::Serve { addr } => cmd_serve(&cli.data_dir, config, &addr).await,
        Commands::Ask { message, session } => {
            cmd_ask(&cli.data_dir, config, message, session).await
        }
        Commands::Chat => cmd_chat(&cli.data_dir, config).await,
        Commands::BuildIndex { quotes_dir } => {
            cmd_build_index(&cli.data_dir, config, &quotes_dir).await
        }
        Commands::Stats => cmd_stats(&cli.data_dir),
        Commands::EmbeddingDim { text } => cmd_embedding_dim(config, text).await,
    }
}

fn load_system_prompt(config: &EngineConfig) -> String {
    if let Some(path) = &config.system_prompt_file {
        match std::fs::read_to_string(path) {
            Ok(prompt) => return prompt.trim().to_string(),
            Err(e) => warn!("Failed to load system prompt from {}: {}", path, e),
        }
    }
    DEFAULT_SYSTEM_PROMPT.to_string()
}

/// Load artifacts and wire the pipeline. Missing artifacts degrade
/// (graph-only or empty-context retrieval) rather than failing.
fn build_orchestrator(data_dir: &Path, config: &EngineConfig) -> Result<ChatOrchestrator> {
    let store = Arc::new(EmbeddingStore::new());
    let chunks_path = data_dir.join(artifacts::CHUNKS_FILE);
    if chunks_path.exists() {
        let chunks = artifacts::load_chunks(&chunks_path)?;
        store.build(chunks)?;
    } else {
        warn!(
            "No chunk artifact at {}; retrieval will be graph-only",
            chunks_path.display()
        );
    }

    let entities_path = data_dir.join(artifacts::ENTITIES_FILE);
    let graph = if entities_path.exists() {
        artifacts::load_graph(&entities_path)?
    } else {
        warn!(
            "No entity artifact at {}; knowledge graph is empty",
            entities_path.display()
        );
        KnowledgeGraph::new()
    };

    let ollama = OllamaClient::from_config(config);
    let retriever = Retriever::new(store, Arc::new(graph), Arc::new(ollama.clone()), config);
    let prompt_builder = PromptBuilder::new(load_system_prompt(config), config);
    let sessions = Arc::new(MemorySessionStore::new());

    Ok(ChatOrchestrator::new(
        retriever,
        prompt_builder,
        Arc::new(ollama),
        sessions,
        config,
    ))
}

async fn cmd_serve(data_dir: &Path, config: EngineConfig, addr: &str) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(data_dir, &config)?);
    let router = http::router(http::AppState { orchestrator });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Serving chat API on http://{}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}

async fn cmd_ask(
    data_dir: &Path,
    config: EngineConfig,
    message: String,
    session: Option<String>,
) -> Result<()> {
    let orchestrator = build_orchestrator(data_dir, &config)?;
    let outcome = orchestrator.chat(session, &message).await;

    println!("{}", outcome.content);
    println!();
    println!("Session: {}", outcome.session_id);

    if let Some(quote) = outcome.quote {
        println!("Structured quote:");
        println!("{}", serde_json::to_string_pretty(&quote)?);
    }

    Ok(())
}

async fn cmd_chat(data_dir: &Path, config: EngineConfig) -> Result<()> {
    let orchestrator = build_orchestrator(data_dir, &config)?;

    println!("QuoteMaster - Interactive Mode");
    println!("Type your question, or 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut session_id: Option<String> = None;

    loop {
        print!("quotemaster> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let message = line.trim();
        match message {
            "" => continue,
            "quit" | "q" | "exit" => {
                println!("Goodbye!");
                break;
            }
            _ => {
                let outcome = orchestrator.chat(session_id.clone(), message).await;
                session_id = Some(outcome.session_id.clone());
                println!("{}", outcome.content);
            }
        }

        println!();
    }

    Ok(())
}

async fn cmd_build_index(
    data_dir: &Path,
    config: EngineConfig,
    quotes_dir: &Path,
) -> Result<()> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(quotes_dir)
        .with_context(|| format!("Failed to read {}", quotes_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == "txt").unwrap_or(false))
        .collect();
    paths.sort();

    if paths.is_empty() {
        anyhow::bail!(
            "No .txt documents found in {}. Add quote files first.",
            quotes_dir.display()
        );
    }

    println!("Found {} documents. Creating embeddings...", paths.len());

    let texts: Vec<String> = paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .map(|s| s.trim().to_string())
                .with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect::<Result<_>>()?;

    let ollama = OllamaClient::from_config(&config);
    let embeddings = ollama.embed_batch(&texts).await?;

    let now = Utc::now();
    let chunks: Vec<DocumentChunk> = paths
        .iter()
        .zip(texts.into_iter().zip(embeddings.into_iter()))
        .enumerate()
        .map(|(i, (path, (text, embedding)))| {
            DocumentChunk::new(i as u64, text)
                .with_source(SourceRef::new(path.display().to_string()).with_indexed_at(now))
                .with_embedding(embedding)
        })
        .collect();

    let out = data_dir.join(artifacts::CHUNKS_FILE);
    artifacts::save_chunks(&out, &chunks)?;

    println!("✓ Indexed {} documents to {}", chunks.len(), out.display());

    Ok(())
}

fn cmd_stats(data_dir: &Path) -> Result<()> {
    let chunks_path = data_dir.join(artifacts::CHUNKS_FILE);
    let entities_path = data_dir.join(artifacts::ENTITIES_FILE);

    println!("Artifact statistics:");

    if chunks_path.exists() {
        let chunks = artifacts::load_chunks(&chunks_path)?;
        let dimension = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);
        println!("  • Chunks: {} (dimension {})", chunks.len(), dimension);
    } else {
        println!("  • Chunks: no artifact at {}", chunks_path.display());
    }

    if entities_path.exists() {
        let graph = artifacts::load_graph(&entities_path)?;
        println!("  • Entities: {}", graph.entity_count());
        println!("  • Relations: {}", graph.relation_count());
    } else {
        println!("  • Entities: no artifact at {}", entities_path.display());
    }

    Ok(())
}

async fn cmd_embedding_dim(config: EngineConfig, text: Option<String>) -> Result<()> {
    let ollama = OllamaClient::from_config(&config);
    let probe = text.unwrap_or_else(|| "dimension probe".to_string());
    let embedding = ollama.embed(&probe).await?;
    println!("Embedding dimension: {}", embedding.len());
    Ok(())
}
