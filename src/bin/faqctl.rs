//! Command-line front end for the FAQ engine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use faq_rocks::config::{EncoderConfig, EngineConfig, FaqConfig};
use faq_rocks::embeddings::{EmbeddingCache, Encoder, HashingEncoder, RemoteEncoder};
use faq_rocks::faq::{self, FaqHandler};
use faq_rocks::storage::{EmbeddingStore, MemoryStore, RocksDbStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "faqctl")]
#[command(about = "Semantic FAQ search over an HNSW index", long_about = None)]
struct Cli {
    /// Engine config file (defaults apply when absent)
    #[arg(long, global = true, default_value = "engine.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a catalog and answer a question
    Ask {
        /// FAQ catalog file
        #[arg(long, short)]
        faq: PathBuf,

        /// The question to ask
        query: String,

        /// Number of answers
        #[arg(long, default_value = "3")]
        count: usize,
    },

    /// Validate a FAQ catalog file
    Check {
        /// FAQ catalog file
        #[arg(long, short)]
        faq: PathBuf,
    },
}

fn build_encoder(config: &EncoderConfig) -> Arc<dyn Encoder> {
    match config {
        EncoderConfig::Hashing { dim } => Arc::new(HashingEncoder::new(*dim)),
        EncoderConfig::Remote { url, model, dim } => {
            Arc::new(RemoteEncoder::new(url.clone(), model.clone(), *dim))
        }
    }
}

fn build_store(config: &EngineConfig) -> anyhow::Result<Arc<dyn EmbeddingStore>> {
    match config.expanded_cache_path()? {
        Some(path) => {
            info!(path = %path.display(), "opening embedding cache");
            Ok(Arc::new(RocksDbStore::open(&path)?))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

async fn ask(engine: EngineConfig, faq_path: &PathBuf, query: &str, count: usize) -> anyhow::Result<()> {
    let catalog = FaqConfig::load(faq_path)
        .with_context(|| format!("loading catalog {}", faq_path.display()))?;

    let encoder = build_encoder(&engine.encoder);
    let store = build_store(&engine)?;
    let cache = Arc::new(EmbeddingCache::new(store, encoder));
    let handler = FaqHandler::new(
        cache,
        engine.hnsw.clone(),
        catalog.average_questions,
        engine.merge_policy,
    );

    handler.load(catalog.faqs, engine.ingest_mode()).await?;
    let answers = handler.query(query, count).await?;

    if answers.is_empty() {
        println!("no answers");
        return Ok(());
    }
    for answer in answers {
        println!("[{:>3}] {}", answer.relevance, answer.title);
        println!("      matched: {}", answer.matched_question);
        println!("      {}", answer.answer);
    }
    Ok(())
}

fn check(engine: &EngineConfig, faq_path: &PathBuf) -> anyhow::Result<()> {
    let catalog = FaqConfig::load(faq_path)
        .with_context(|| format!("loading catalog {}", faq_path.display()))?;
    faq::validate_entries(&catalog.faqs, engine.ingest_mode())?;

    let questions: usize = catalog.faqs.iter().map(|e| e.questions.len()).sum();
    println!(
        "{}: ok ({} entries, {} questions)",
        faq_path.display(),
        catalog.faqs.len(),
        questions
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let engine = EngineConfig::load(&cli.config)
        .with_context(|| format!("loading engine config {}", cli.config.display()))?;

    match &cli.command {
        Commands::Ask { faq, query, count } => ask(engine, faq, query, *count).await,
        Commands::Check { faq } => check(&engine, faq),
    }
}
