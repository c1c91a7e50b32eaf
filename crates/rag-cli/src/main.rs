//! RAG Store CLI
//!
//! Document question answering over a local flat vector index.
//!
//! # Usage
//!
//! ```bash
//! rag ingest notes.txt
//! rag query "what did the notes say about deadlines?"
//! rag status
//! rag repair
//! rag reset [--yes]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/rag-store/config.toml)
//! 3. Environment variables (RAG_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = commands::load_settings(&cli)?;
    if let Commands::Query { top_k: Some(k), .. } = &cli.command {
        settings.top_k = *k;
    }
    commands::init_logging(&settings)?;

    let service = commands::build_service(settings)?;

    match cli.command {
        Commands::Ingest { file } => {
            commands::handle_ingest(&service, &file).await?;
        }
        Commands::Query { question, json, .. } => {
            commands::handle_query(&service, &question, json).await?;
        }
        Commands::Status => {
            commands::handle_status(&service).await?;
        }
        Commands::Repair => {
            commands::handle_repair(&service).await?;
        }
        Commands::Reset { yes } => {
            commands::handle_reset(&service, yes).await?;
        }
    }

    Ok(())
}
