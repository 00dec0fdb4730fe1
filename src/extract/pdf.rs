//! Primary PDF text extraction via the embedded text layer.
//!
//! Each page is pulled independently with `pdftotext -f N -l N` so a failure
//! on one page never aborts the rest of the document. Pages are assembled
//! into a single blob with one boundary marker per page; the marker format is
//! mirrored by the OCR fallback so the quality arbiter can compare lengths
//! directly.

use std::path::Path;

use tokio::process::Command;

use super::{run_tool, ExtractionError};

/// External Poppler tools used for text-layer extraction.
pub(crate) struct PdfTools {
    pub pdftotext: String,
    pub pdfinfo: String,
}

/// Assembled text-layer result for a whole PDF.
pub(crate) struct TextLayer {
    /// Concatenated per-page text with boundary markers, trimmed.
    pub text: String,
    /// Whether the OCR fallback should run: set when any page was empty or
    /// errored, or when the average characters per page is below threshold.
    pub ocr_needed: bool,
    /// Number of pages the container reports.
    pub page_count: u32,
}

impl TextLayer {
    /// Text layer stand-in for a structurally unreadable container: nothing
    /// extracted, OCR unconditionally required.
    pub fn forced_ocr() -> Self {
        Self {
            text: String::new(),
            ocr_needed: true,
            page_count: 0,
        }
    }
}

/// Outcome of reading one page, before assembly.
pub(crate) enum PageRead {
    /// Page produced text.
    Text(String),
    /// Page parsed but has no text layer.
    Empty,
    /// Extraction errored on this page.
    Failed(String),
}

/// Read the text layer of every page.
///
/// Returns an error only for container-level problems (page count
/// unobtainable); per-page failures are folded into the assembled result.
pub(crate) async fn read_text_layer(
    tools: &PdfTools,
    pdf: &Path,
    min_chars_per_page: usize,
) -> Result<TextLayer, ExtractionError> {
    let count = page_count(tools, pdf).await?;
    tracing::debug!(pages = count, "reading PDF text layer");

    let mut pages = Vec::with_capacity(count as usize);
    for page in 1..=count {
        match page_text(tools, pdf, page).await {
            Ok(text) if !text.trim().is_empty() => pages.push(PageRead::Text(text)),
            Ok(_) => {
                tracing::debug!(page, "no text layer on page");
                pages.push(PageRead::Empty);
            }
            Err(e) => {
                tracing::warn!(page, error = %e, "text layer extraction failed on page");
                pages.push(PageRead::Failed(e.to_string()));
            }
        }
    }

    Ok(assemble(&pages, min_chars_per_page))
}

/// Fold per-page outcomes into a single blob and decide whether OCR is
/// warranted. Pure so the flag policy is testable without Poppler.
pub(crate) fn assemble(pages: &[PageRead], min_chars_per_page: usize) -> TextLayer {
    let mut out = String::new();
    let mut ocr_needed = pages.is_empty();

    for (idx, page) in pages.iter().enumerate() {
        let n = idx + 1;
        match page {
            PageRead::Text(text) => {
                out.push_str(text.trim());
                out.push_str(&format!("\n\n--- Page {n} End ---\n\n"));
            }
            PageRead::Empty => {
                ocr_needed = true;
                out.push_str(&format!("\n\n--- Page {n} (no text layer) ---\n\n"));
            }
            PageRead::Failed(_) => {
                ocr_needed = true;
                out.push_str(&format!("\n\n--- Error on page {n} ---\n\n"));
            }
        }
    }

    let text = out.trim().to_string();

    // Pages full of whitespace or garbage glyphs extract "successfully" but
    // yield almost nothing; a low average still warrants an OCR pass.
    if !ocr_needed && text.chars().count() < pages.len() * min_chars_per_page {
        tracing::debug!("text layer is sparse, flagging for OCR");
        ocr_needed = true;
    }

    TextLayer {
        text,
        ocr_needed,
        page_count: pages.len() as u32,
    }
}

/// Page count via pdfinfo. Failure here means the container itself is
/// unreadable and is reported as a structural error.
async fn page_count(tools: &PdfTools, pdf: &Path) -> Result<u32, ExtractionError> {
    let stdout = run_tool(
        Command::new(&tools.pdfinfo).arg(pdf),
        &tools.pdfinfo,
        "pdfinfo failed",
    )
    .await
    .map_err(|e| match e {
        ExtractionError::ToolNotFound(t) => ExtractionError::ToolNotFound(t),
        other => ExtractionError::InvalidStructure(other.to_string()),
    })?;

    stdout
        .lines()
        .find_map(|line| {
            line.strip_prefix("Pages:")
                .and_then(|rest| rest.trim().parse().ok())
        })
        .ok_or_else(|| {
            ExtractionError::InvalidStructure("pdfinfo reported no page count".to_string())
        })
}

/// Extract the text layer of a single page.
async fn page_text(tools: &PdfTools, pdf: &Path, page: u32) -> Result<String, ExtractionError> {
    let page_str = page.to_string();
    run_tool(
        Command::new(&tools.pdftotext)
            .args(["-layout", "-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(pdf)
            .arg("-"),
        &tools.pdftotext,
        &format!("pdftotext failed on page {page}"),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_page(chars: usize) -> PageRead {
        PageRead::Text("x".repeat(chars))
    }

    #[test]
    fn intact_text_layer_does_not_flag_ocr() {
        let layer = assemble(&[long_page(400), long_page(350)], 50);
        assert!(!layer.ocr_needed);
        assert_eq!(layer.page_count, 2);
        assert!(layer.text.contains("--- Page 1 End ---"));
        assert!(layer.text.contains("--- Page 2 End ---"));
    }

    #[test]
    fn one_marker_per_page() {
        let layer = assemble(
            &[
                long_page(200),
                PageRead::Empty,
                PageRead::Failed("boom".to_string()),
            ],
            50,
        );
        assert_eq!(layer.text.matches("--- Page 1 End ---").count(), 1);
        assert_eq!(
            layer.text.matches("--- Page 2 (no text layer) ---").count(),
            1
        );
        assert_eq!(layer.text.matches("--- Error on page 3 ---").count(), 1);
    }

    #[test]
    fn empty_page_flags_ocr() {
        let layer = assemble(&[long_page(400), PageRead::Empty], 50);
        assert!(layer.ocr_needed);
    }

    #[test]
    fn failed_page_flags_ocr() {
        let layer = assemble(&[PageRead::Failed("parse error".to_string()), long_page(400)], 50);
        assert!(layer.ocr_needed);
    }

    #[test]
    fn all_empty_pages_flag_ocr() {
        let layer = assemble(&[PageRead::Empty, PageRead::Empty], 50);
        assert!(layer.ocr_needed);
        assert!(!layer.text.is_empty(), "markers are still emitted");
    }

    #[test]
    fn sparse_text_layer_flags_ocr() {
        // Two pages of 10 chars each: well under 50 chars/page even counting
        // the boundary markers.
        let layer = assemble(&[long_page(10), long_page(10)], 50);
        assert!(layer.ocr_needed);
    }

    #[test]
    fn dense_short_document_keeps_text_layer() {
        let layer = assemble(&[long_page(120)], 50);
        assert!(!layer.ocr_needed);
    }

    #[test]
    fn no_pages_forces_ocr() {
        let layer = assemble(&[], 50);
        assert!(layer.ocr_needed);
        assert!(layer.text.is_empty());
    }

    #[test]
    fn forced_ocr_layer_is_empty_and_flagged() {
        let layer = TextLayer::forced_ocr();
        assert!(layer.ocr_needed);
        assert!(layer.text.is_empty());
        assert_eq!(layer.page_count, 0);
    }
}
