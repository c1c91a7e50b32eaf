//! Command handlers for the RAG store CLI.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use rag_embeddings::{ApiEmbedder, ApiEmbedderConfig};
use rag_generation::{ApiGenerator, ApiGeneratorConfig, GenerationGateway};
use rag_pipeline::RagService;
use rag_types::Settings;

use crate::cli::Cli;

/// Load configuration and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    if let Some(data_dir) = &cli.data_dir {
        settings.data_dir = data_dir.clone();
    }

    Ok(settings)
}

/// Initialize logging from the configured level; RUST_LOG wins when
/// set.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Build the service with API-backed gateways.
///
/// The embedder requires an API key; the generator is optional and
/// its absence selects degraded-mode answers.
pub fn build_service(settings: Settings) -> Result<RagService> {
    let embedder_config = ApiEmbedderConfig::from_settings(&settings.embedding)?;
    let embedder = Arc::new(ApiEmbedder::new(embedder_config)?);

    let generator: Option<Arc<dyn GenerationGateway>> =
        match ApiGeneratorConfig::from_settings(&settings.generator) {
            Some(config) => Some(Arc::new(ApiGenerator::new(config)?)),
            None => {
                info!("No generator API key configured; answers will be degraded-mode");
                None
            }
        };

    Ok(RagService::new(settings, embedder, generator)?)
}

/// Ingest a file from disk.
pub async fn handle_ingest(service: &RagService, file: &str) -> Result<()> {
    let path = Path::new(file);
    let file_name = path
        .file_name()
        .context("Path has no file name")?
        .to_string_lossy()
        .to_string();
    let raw_bytes = std::fs::read(path).with_context(|| format!("Failed to read {file}"))?;

    let outcome = service.ingest_file(&file_name, &raw_bytes).await?;

    println!(
        "Ingested {}: {} chunks indexed ({} total in store)",
        outcome.document, outcome.chunks_indexed, outcome.total_chunks
    );
    Ok(())
}

/// Answer a question from the store.
pub async fn handle_query(
    service: &RagService,
    question: &str,
    json: bool,
) -> Result<()> {
    let response = service.query(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}\n", response.answer);
    for hit in &response.contexts {
        println!(
            "  [{:.3}] {}#{} (id {})",
            hit.score, hit.source, hit.chunk_ordinal, hit.id
        );
    }
    Ok(())
}

/// Print store status.
pub async fn handle_status(service: &RagService) -> Result<()> {
    let status = service.status().await?;

    println!("Chunks:    {}", status.chunks);
    println!("Vectors:   {}", status.vectors);
    match status.dimension {
        Some(dim) => println!("Dimension: {dim}"),
        None => println!("Dimension: (no index yet)"),
    }
    println!("In sync:   {}", if status.in_sync { "yes" } else { "NO" });
    Ok(())
}

/// Run the divergence repair pass.
pub async fn handle_repair(service: &RagService) -> Result<()> {
    let stats = service.repair().await?;
    if stats.repaired() {
        println!(
            "Repaired: removed {} vectors, {} records",
            stats.vectors_removed, stats.records_removed
        );
    } else {
        println!("Stores are in sync; nothing to repair");
    }
    Ok(())
}

/// Delete both persisted artifacts.
pub async fn handle_reset(service: &RagService, yes: bool) -> Result<()> {
    if !yes {
        print!("Delete the vector index and all chunk metadata? [y/N] ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        if !matches!(line.trim(), "y" | "Y" | "yes") {
            println!("Aborted");
            return Ok(());
        }
    }

    service.reset().await?;
    println!("Store reset");
    Ok(())
}
