//! `rentmeta extract` - text extraction only.

use std::path::Path;

use anyhow::Context;

use crate::config::Settings;
use crate::extract::{Document, Extractor};

pub async fn run(settings: &Settings, file: &Path, json: bool) -> anyhow::Result<()> {
    let doc = Document::from_path(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let extractor = Extractor::new(&settings.extraction);

    match extractor.extract(&doc).await {
        Some(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.text);
            }
            Ok(())
        }
        None => anyhow::bail!(
            "no text could be extracted from {} (unsupported type or empty document)",
            file.display()
        ),
    }
}
