use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex as TokioMutex;
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragfolio::config::Config;
use ragfolio::db::Db;
use ragfolio::embedder::download::{all_files_present, download_model_files};
use ragfolio::embedder::SharedEmbedder;
use ragfolio::indexer::Indexer;
use ragfolio::llm::OllamaClient;
use ragfolio::profile::InMemoryProfileStore;
use ragfolio::rag::RagEngine;

#[derive(Parser)]
#[command(name = "ragfolio", about = "Local RAG engine over a personal profile", version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and index a profile JSON file.
    Index {
        /// Path to the profile JSON file.
        profile: String,
    },
    /// Ask a question and stream the answer to stdout.
    Chat {
        /// The question to answer.
        question: String,
    },
    /// Check that the database and the Ollama server are reachable.
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate()?;

    match cli.command {
        Command::Index { profile } => index(&config, &profile).await,
        Command::Chat { question } => chat(&config, &question).await,
        Command::Health => health(&config).await,
    }
}

async fn index(config: &Config, profile_path: &str) -> Result<()> {
    let model_dir = config.model_dir();
    if !all_files_present(&model_dir) {
        info!("model files missing, downloading to {}", model_dir.display());
        let dir = model_dir.clone();
        tokio::task::spawn_blocking(move || download_model_files(&dir))
            .await
            .context("download task failed")??;
    }

    let store = InMemoryProfileStore::load_json(profile_path)?;
    let db = Arc::new(TokioMutex::new(Db::open(&config.db_path)?));
    let embedder = SharedEmbedder::onnx(&model_dir).get().await?;

    let indexer = Indexer::new(db, embedder, &store, config.chunking.clone());
    let stats = indexer.index_all().await?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

async fn chat(config: &Config, question: &str) -> Result<()> {
    let db = Arc::new(TokioMutex::new(Db::open(&config.db_path)?));
    let embedder = Arc::new(SharedEmbedder::onnx(config.model_dir()));
    let llm = OllamaClient::new(&config.ollama)?;
    let engine = RagEngine::new(db, embedder, llm, config.clone());

    let mut reply = engine.chat(question).await?;
    info!(
        language = %reply.language,
        sources = reply.chunk_ids.len(),
        retrieval_ms = reply.retrieval_time.as_millis(),
        "streaming answer"
    );

    use std::io::Write;
    let mut stdout = std::io::stdout();
    while let Some(token) = reply.tokens.next().await {
        print!("{token}");
        stdout.flush()?;
    }
    println!();
    Ok(())
}

async fn health(config: &Config) -> Result<()> {
    let db = Db::open(&config.db_path)?;
    let chunks = db.chunk_count()?;
    println!("database: ok ({chunks} chunks)");

    let llm = OllamaClient::new(&config.ollama)?;
    if llm.health_check().await {
        let models = llm.list_models().await.unwrap_or_default();
        println!("ollama: ok ({} models available)", models.len());
        if !models.iter().any(|m| m == llm.model()) {
            println!("warning: configured model {} not found on server", llm.model());
        }
        Ok(())
    } else {
        bail!("ollama: unreachable at {}", config.ollama.host)
    }
}
