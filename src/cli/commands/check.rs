//! `rentmeta check` - report availability of external dependencies.

use console::style;

use crate::config::Settings;
use crate::extract::Extractor;
use crate::llm::LlmClient;

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let ext = &settings.extraction;
    let extractor = Extractor::new(ext);

    println!("External tools:");
    let poppler = [
        ("pdftotext", &ext.pdftotext_path),
        ("pdfinfo", &ext.pdfinfo_path),
        ("pdftoppm", &ext.pdftoppm_path),
    ];

    let mut missing = 0;
    for (name, path) in poppler {
        match which::which(path) {
            Ok(resolved) => {
                println!("  {} {:<10} {}", style("ok").green(), name, resolved.display());
            }
            Err(_) => {
                missing += 1;
                println!(
                    "  {} {:<10} not found (looked for '{}')",
                    style("!!").red(),
                    name,
                    path
                );
            }
        }
    }

    if extractor.ocr_engine().is_available() {
        let resolved = which::which(&ext.tesseract_path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| ext.tesseract_path.clone());
        println!("  {} {:<10} {}", style("ok").green(), "tesseract", resolved);
    } else {
        missing += 1;
        println!(
            "  {} {:<10} not found (looked for '{}')",
            style("!!").red(),
            "tesseract",
            ext.tesseract_path
        );
    }

    if missing > 0 {
        println!(
            "\n{}",
            style("Poppler tools come from poppler-utils; OCR needs tesseract-ocr.").dim()
        );
    }

    println!("\nLLM endpoint:");
    let llm = LlmClient::new(settings.llm.clone());
    if llm.is_available().await {
        println!(
            "  {} {} (model: {}, embeddings: {})",
            style("ok").green(),
            settings.llm.endpoint,
            settings.llm.model,
            settings.llm.embedding_model
        );
    } else {
        println!(
            "  {} {} is not reachable",
            style("!!").red(),
            settings.llm.endpoint
        );
    }

    Ok(())
}
