//! rentmeta - rental-agreement metadata extraction.
//!
//! Extracts text from uploaded agreement documents (PDF, DOCX, TXT, images)
//! with an OCR fallback for scanned pages, then answers one retrieval-augmented
//! question per target field (value, dates, notice period, parties).

mod cli;
mod config;
mod extract;
mod llm;
mod metadata;
mod rag;
mod session;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if cli::is_verbose() {
        "rentmeta=info"
    } else {
        "rentmeta=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run().await
}
