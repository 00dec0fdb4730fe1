//! CLI parser and command dispatch.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "rentmeta")]
#[command(about = "Rental-agreement metadata extraction")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ./rentmeta.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from a document, with OCR fallback for scanned PDFs
    Extract {
        /// Document to process (.pdf, .docx, .txt, or an image)
        file: PathBuf,

        /// Print the result as JSON with provenance
        #[arg(long)]
        json: bool,
    },

    /// Extract agreement metadata fields (value, dates, notice, parties)
    Fields {
        /// Document to process
        file: PathBuf,
    },

    /// Check availability of external tools and the LLM endpoint
    Check,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract { file, json } => commands::extract::run(&settings, &file, json).await,
        Commands::Fields { file } => commands::fields::run(&settings, &file).await,
        Commands::Check => commands::check::run(&settings).await,
    }
}
