//! `rentmeta fields` - the full pipeline: extract, index, answer per-field
//! questions, print the metadata record as JSON.

use std::path::Path;

use anyhow::Context;

use crate::config::Settings;
use crate::extract::{Document, Extractor};
use crate::llm::{LlmClient, RetryPolicy};
use crate::rag::AgreementAgent;
use crate::session::DocumentState;

pub async fn run(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let doc = Document::from_path(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let mut state = DocumentState::new(doc.name());
    let extractor = Extractor::new(&settings.extraction);

    let Some(extraction) = extractor.extract(&doc).await else {
        let message = format!("could not extract text from '{}'", doc.name());
        state.mark_failed(message.clone())?;
        print_state(&state)?;
        anyhow::bail!(message);
    };
    state.mark_extracted(extraction.text.clone())?;

    let mut agent = AgreementAgent::new(
        LlmClient::new(settings.llm.clone()),
        RetryPolicy::from_config(&settings.retry),
        settings.rag.clone(),
    );

    match agent.index_document(&extraction.text).await {
        Ok(indexed) if indexed > 0 => state.mark_indexed()?,
        Ok(_) => {
            let message = "document produced no indexable chunks".to_string();
            state.mark_failed(message.clone())?;
            print_state(&state)?;
            anyhow::bail!(message);
        }
        Err(e) => {
            let message = format!("indexing failed: {e}");
            state.mark_failed(message.clone())?;
            print_state(&state)?;
            anyhow::bail!(message);
        }
    }

    match agent.extract_metadata().await {
        Ok(metadata) => {
            state.mark_completed(metadata)?;
            print_state(&state)?;
            Ok(())
        }
        Err(e) => {
            let message = format!("metadata extraction failed: {e}");
            state.mark_failed(message.clone())?;
            print_state(&state)?;
            anyhow::bail!(message);
        }
    }
}

/// Print the state record without the (potentially very large) text blob.
fn print_state(state: &DocumentState) -> anyhow::Result<()> {
    let summary = serde_json::json!({
        "id": state.id,
        "filename": state.filename,
        "status": state.status,
        "metadata": state.metadata,
        "error": state.error,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
