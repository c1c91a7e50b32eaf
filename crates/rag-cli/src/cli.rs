//! CLI argument parsing for the RAG store.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// RAG Store
///
/// Document question answering over a local vector store.
#[derive(Parser, Debug)]
#[command(name = "rag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/rag-store/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override data directory
    #[arg(short, long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// RAG store commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a document into the store
    Ingest {
        /// Path of the file to ingest
        file: String,
    },

    /// Ask a question against the store
    Query {
        /// The question to answer
        question: String,

        /// Override the number of retrieved contexts
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show store status
    Status,

    /// Detect and repair store divergence
    Repair,

    /// Delete the persisted index and metadata
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
