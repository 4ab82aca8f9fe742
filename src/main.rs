//! # pdf-qa CLI (`pdfqa`)
//!
//! Ingest PDFs into a vector-indexed chunk store and ask questions about
//! them through a local LLM server.
//!
//! ## Usage
//!
//! ```bash
//! pdfqa [--config ./pdfqa.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfqa init` | Create the chunk table (and pgvector extension) |
//! | `pdfqa extract <pdf>` | Preview the first chunks as JSON |
//! | `pdfqa ingest <pdf>` | Chunk, embed, and store a PDF |
//! | `pdfqa search "<query>"` | Show the nearest chunks |
//! | `pdfqa ask "<question>"` | Answer a question from stored chunks |
//! | `pdfqa chat` | Interactive terminal chat |
//!
//! `MODEL`, `OLLAMA_URL`, and `DB_URL` override the corresponding config
//! values. Logs go to stderr; set `RUST_LOG=info` or `RUST_LOG=debug` for
//! more detail.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pdf_qa::config::{self, ChunkingConfig, Config};
use pdf_qa::prompt::Persona;
use pdf_qa::{ask, chat, ingest, migrate, search};

/// pdf-qa: chunk, embed, and query PDF documents with a local LLM.
#[derive(Parser)]
#[command(
    name = "pdfqa",
    about = "Chunk, embed, and query PDF documents with a local LLM",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML).
    ///
    /// Optional. Every setting has a default; `MODEL`, `OLLAMA_URL`, and
    /// `DB_URL` override whatever the file says.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the chunk store schema.
    ///
    /// Creates the chunk table if it does not exist. Safe to run repeatedly.
    Init,

    /// Extract and chunk a PDF without embedding it.
    ///
    /// Prints the first two chunks as JSON.
    Extract {
        /// Path to the PDF.
        pdf: PathBuf,

        #[command(flatten)]
        chunking: ChunkingArgs,
    },

    /// Ingest a PDF into the chunk store.
    ///
    /// Extracts every page, splits it into overlapping word windows, embeds
    /// each window, and appends the rows. Re-ingesting a document stores
    /// duplicate rows.
    Ingest {
        /// Path to the PDF.
        pdf: PathBuf,

        #[command(flatten)]
        chunking: ChunkingArgs,

        /// Also print the most frequent terms and an LLM-written summary.
        #[arg(long)]
        summary: bool,
    },

    /// Show the chunks nearest to a query.
    Search {
        query: String,

        /// Number of chunks to return.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Answer a question using the stored chunks as context.
    Ask {
        question: String,

        /// Preamble style for the prompt.
        #[arg(long, value_enum, default_value_t = Persona::Default)]
        persona: Persona,

        /// Number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Interactive chat on stdin/stdout. Type `exit` or `quit` to leave.
    Chat {
        #[arg(long, value_enum, default_value_t = Persona::Default)]
        persona: Persona,

        /// Ask the model to format replies as Markdown.
        #[arg(long)]
        markdown: bool,
    },
}

#[derive(clap::Args)]
struct ChunkingArgs {
    /// Window size in words (default from config: 500).
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Words shared by consecutive windows (default from config: 100).
    #[arg(long)]
    overlap: Option<usize>,
}

impl ChunkingArgs {
    fn resolve(&self, config: &Config) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size.unwrap_or(config.chunking.chunk_size),
            overlap: self.overlap.unwrap_or(config.chunking.overlap),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Store initialized successfully.");
        }
        Commands::Extract { pdf, chunking } => {
            ingest::run_extract(&pdf, &chunking.resolve(&cfg))?;
        }
        Commands::Ingest {
            pdf,
            chunking,
            summary,
        } => {
            ingest::run_ingest(&cfg, &pdf, &chunking.resolve(&cfg), summary).await?;
        }
        Commands::Search { query, top_k } => {
            search::run_search(&cfg, &query, top_k).await?;
        }
        Commands::Ask {
            question,
            persona,
            top_k,
        } => {
            ask::run_ask(&cfg, &question, persona, top_k).await?;
        }
        Commands::Chat { persona, markdown } => {
            chat::run_chat(&cfg, persona, markdown).await?;
        }
    }

    Ok(())
}
