//! Document text extraction with OCR fallback.
//!
//! Extracts text from agreement documents using:
//! - pdftotext (Poppler) for the PDF text layer, page by page
//! - pdftoppm + Tesseract OCR for scanned PDFs and image files
//! - docx-rs for DOCX paragraph text
//!
//! The dispatcher routes on the file extension and invokes exactly one
//! terminal strategy. Failures never escape [`Extractor::extract`]: they are
//! recovered as locally as possible (page before document, strategy before
//! pipeline) and degrade to an absent result.

mod arbiter;
mod docx;
mod ocr;
mod pdf;

pub use arbiter::ArbiterPolicy;
pub use ocr::OcrEngine;

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::ExtractionConfig;

/// Errors that can occur during text extraction.
///
/// None of these reach the caller of [`Extractor::extract`]; they are logged
/// and collapse to an absent result.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("external tool not found: {0}")]
    ToolNotFound(String),

    #[error("invalid document structure: {0}")]
    InvalidStructure(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("OCR timed out after {0}s")]
    OcrTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An uploaded document: a filename hint plus its full contents.
///
/// Owning the bytes stands in for the original rewindable stream: the primary
/// and OCR extractors can each consume the document from the start.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a document from disk, keeping the filename for type dispatch.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;
        Ok(Self { name, bytes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercased file extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        self.extension()
            .as_deref()
            .and_then(DocumentKind::from_extension)
    }
}

/// Supported document types, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
    Image,
}

impl DocumentKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Method that produced an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Embedded PDF text layer via pdftotext.
    PdfText,
    /// OCR over rasterized PDF pages.
    PdfOcr,
    /// OCR directly on an uploaded image.
    ImageOcr,
    /// DOCX paragraph extraction.
    Docx,
    /// Raw UTF-8 decode.
    PlainText,
}

/// Result of text extraction: trimmed non-empty text plus provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Extracted text content, trimmed.
    pub text: String,
    /// Method used for extraction.
    pub method: ExtractionMethod,
    /// Number of pages processed (for PDFs).
    pub page_count: Option<u32>,
}

impl ExtractionResult {
    /// Wrap trimmed text, mapping an empty result to absent.
    fn from_text(text: String, method: ExtractionMethod, page_count: Option<u32>) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            text: trimmed.to_string(),
            method,
            page_count,
        })
    }
}

/// Document text extractor with OCR fallback.
pub struct Extractor {
    tools: pdf::PdfTools,
    ocr: OcrEngine,
    arbiter: ArbiterPolicy,
    min_chars_per_page: usize,
}

impl Extractor {
    pub fn new(cfg: &ExtractionConfig) -> Self {
        Self {
            tools: pdf::PdfTools {
                pdftotext: cfg.pdftotext_path.clone(),
                pdfinfo: cfg.pdfinfo_path.clone(),
            },
            ocr: OcrEngine::new(cfg),
            arbiter: ArbiterPolicy {
                gain_percent: cfg.ocr_gain_percent,
                floor_chars: cfg.ocr_floor_chars,
            },
            min_chars_per_page: cfg.min_chars_per_page,
        }
    }

    /// Access to the OCR engine (for availability checks).
    pub fn ocr_engine(&self) -> &OcrEngine {
        &self.ocr
    }

    /// Extract text from a document based on its declared type.
    ///
    /// Returns `None` for unsupported types, for documents with no
    /// extractable text, and for any failure mode; the distinction is only
    /// visible in the logs.
    pub async fn extract(&self, doc: &Document) -> Option<ExtractionResult> {
        let Some(kind) = doc.kind() else {
            tracing::warn!(
                name = %doc.name(),
                extension = doc.extension().as_deref().unwrap_or("<none>"),
                "unsupported file type"
            );
            return None;
        };

        let outcome = match kind {
            DocumentKind::Pdf => self.extract_pdf(doc).await,
            DocumentKind::Docx => docx::extract(doc.bytes()).map(|text| {
                text.and_then(|t| ExtractionResult::from_text(t, ExtractionMethod::Docx, None))
            }),
            DocumentKind::PlainText => Ok(ExtractionResult::from_text(
                String::from_utf8_lossy(doc.bytes()).into_owned(),
                ExtractionMethod::PlainText,
                None,
            )),
            DocumentKind::Image => self.extract_image(doc).await,
        };

        match outcome {
            Ok(Some(result)) => {
                tracing::info!(
                    name = %doc.name(),
                    method = ?result.method,
                    chars = result.text.chars().count(),
                    "text extraction complete"
                );
                Some(result)
            }
            Ok(None) => {
                tracing::info!(name = %doc.name(), "no extractable text");
                None
            }
            Err(e) => {
                tracing::warn!(name = %doc.name(), error = %e, "extraction failed");
                None
            }
        }
    }

    /// PDF extraction: text layer first, OCR fallback when the layer is
    /// missing, sparse, or errored, then arbitration between the two.
    async fn extract_pdf(
        &self,
        doc: &Document,
    ) -> Result<Option<ExtractionResult>, ExtractionError> {
        let file = spill(doc)?;
        let path = file.path();

        let primary = match pdf::read_text_layer(&self.tools, path, self.min_chars_per_page).await
        {
            Ok(layer) => layer,
            Err(e) => {
                // Unparseable container: treat the text layer as absent and
                // let OCR have a go at the raw pages.
                tracing::warn!(error = %e, "PDF text layer unreadable, forcing OCR");
                pdf::TextLayer::forced_ocr()
            }
        };

        let primary_pages = (primary.page_count > 0).then_some(primary.page_count);

        if !primary.ocr_needed {
            tracing::debug!(pages = primary.page_count, "text layer sufficient, skipping OCR");
            return Ok(ExtractionResult::from_text(
                primary.text,
                ExtractionMethod::PdfText,
                primary_pages,
            ));
        }

        match self.ocr.ocr_pdf(path).await {
            Ok(ocr) => {
                if arbiter::prefer_ocr(&primary.text, &ocr.text, &self.arbiter) {
                    tracing::info!(pages = ocr.pages, "using OCR result");
                    Ok(ExtractionResult::from_text(
                        ocr.text,
                        ExtractionMethod::PdfOcr,
                        Some(ocr.pages),
                    ))
                } else {
                    tracing::info!("keeping text layer result, OCR was not better");
                    Ok(ExtractionResult::from_text(
                        primary.text,
                        ExtractionMethod::PdfText,
                        primary_pages,
                    ))
                }
            }
            Err(e) => {
                // Unrecoverable OCR failure: fall back to whatever the text
                // layer produced, even if that is nothing.
                tracing::warn!(error = %e, "OCR fallback failed, keeping text layer result");
                Ok(ExtractionResult::from_text(
                    primary.text,
                    ExtractionMethod::PdfText,
                    primary_pages,
                ))
            }
        }
    }

    async fn extract_image(
        &self,
        doc: &Document,
    ) -> Result<Option<ExtractionResult>, ExtractionError> {
        let file = spill(doc)?;
        let text = self.ocr.ocr_image(file.path()).await?;
        Ok(ExtractionResult::from_text(
            text,
            ExtractionMethod::ImageOcr,
            None,
        ))
    }
}

/// Write document bytes to a temp file so the external tools can read them.
fn spill(doc: &Document) -> Result<NamedTempFile, ExtractionError> {
    let mut file = NamedTempFile::new()?;
    file.write_all(doc.bytes())?;
    file.flush()?;
    Ok(file)
}

/// Run an external tool to completion, capturing stdout.
pub(crate) async fn run_tool(
    cmd: &mut tokio::process::Command,
    tool: &str,
    error_prefix: &str,
) -> Result<String, ExtractionError> {
    match cmd.output().await {
        Ok(output) if output.status.success() => {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ExtractionError::ExtractionFailed(format!(
                "{}: {}",
                error_prefix,
                stderr.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolNotFound(tool.to_string()))
        }
        Err(e) => Err(ExtractionError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;

    fn extractor() -> Extractor {
        Extractor::new(&ExtractionConfig::default())
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("pdf"), Some(DocumentKind::Pdf));
        assert_eq!(
            DocumentKind::from_extension("docx"),
            Some(DocumentKind::Docx)
        );
        assert_eq!(
            DocumentKind::from_extension("txt"),
            Some(DocumentKind::PlainText)
        );
        for ext in ["png", "jpg", "jpeg", "bmp", "tif", "tiff"] {
            assert_eq!(
                DocumentKind::from_extension(ext),
                Some(DocumentKind::Image),
                "{ext} should be an image"
            );
        }
        assert_eq!(DocumentKind::from_extension("csv"), None);
        assert_eq!(DocumentKind::from_extension("exe"), None);
    }

    #[test]
    fn document_extension_is_lowercased() {
        let doc = Document::new("Lease Agreement.PDF", vec![]);
        assert_eq!(doc.extension().as_deref(), Some("pdf"));
        assert_eq!(doc.kind(), Some(DocumentKind::Pdf));
    }

    #[tokio::test]
    async fn txt_round_trips_without_markers() {
        let doc = Document::new("note.txt", b"Hello\nWorld".to_vec());
        let result = extractor().extract(&doc).await.unwrap();
        assert_eq!(result.text, "Hello\nWorld");
        assert_eq!(result.method, ExtractionMethod::PlainText);
        assert_eq!(result.page_count, None);
    }

    #[tokio::test]
    async fn txt_is_trimmed() {
        let doc = Document::new("note.txt", b"  padded  \n".to_vec());
        let result = extractor().extract(&doc).await.unwrap();
        assert_eq!(result.text, "padded");
    }

    #[tokio::test]
    async fn empty_txt_is_absent() {
        let doc = Document::new("blank.txt", b"   \n\t ".to_vec());
        assert!(extractor().extract(&doc).await.is_none());
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let doc = Document::new("mixed.txt", vec![b'o', b'k', 0xff, 0xfe, b'!', b'\n']);
        let result = extractor().extract(&doc).await.unwrap();
        assert!(result.text.starts_with("ok"));
        assert!(result.text.ends_with('!'));
    }

    #[tokio::test]
    async fn unsupported_extension_is_absent_not_error() {
        let doc = Document::new("data.csv", b"a,b,c".to_vec());
        assert!(extractor().extract(&doc).await.is_none());
    }

    #[tokio::test]
    async fn missing_extension_is_absent() {
        let doc = Document::new("README", b"plain".to_vec());
        assert!(extractor().extract(&doc).await.is_none());
    }

    #[tokio::test]
    async fn corrupted_docx_is_absent_not_error() {
        let doc = Document::new("broken.docx", b"this is not a zip archive".to_vec());
        assert!(extractor().extract(&doc).await.is_none());
    }

    // Pipeline wiring tests for the PDF path, driven by stub binaries so
    // neither Poppler nor Tesseract is required.
    #[cfg(unix)]
    mod pdf_pipeline {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn stub(dir: &TempDir, name: &str, body: &str) -> String {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        fn stub_config(
            dir: &TempDir,
            pdfinfo: &str,
            pdftotext: &str,
            pdftoppm: &str,
            tesseract: &str,
        ) -> ExtractionConfig {
            let mut cfg = ExtractionConfig::default();
            cfg.pdfinfo_path = stub(dir, "pdfinfo", pdfinfo);
            cfg.pdftotext_path = stub(dir, "pdftotext", pdftotext);
            cfg.pdftoppm_path = stub(dir, "pdftoppm", pdftoppm);
            cfg.tesseract_path = stub(dir, "tesseract", tesseract);
            cfg
        }

        fn pdf_doc() -> Document {
            Document::new("agreement.pdf", b"%PDF-1.4 not actually a pdf".to_vec())
        }

        #[tokio::test]
        async fn corrupted_container_routes_to_ocr_then_absent() {
            // pdfinfo cannot read the container, which forces the OCR
            // fallback; rasterization then fails too. The result is absent,
            // never an error or a panic.
            let dir = TempDir::new().unwrap();
            let cfg = stub_config(&dir, "exit 1", "exit 1", "exit 1", "exit 1");
            assert!(Extractor::new(&cfg).extract(&pdf_doc()).await.is_none());
        }

        #[tokio::test]
        async fn intact_text_layer_never_invokes_ocr() {
            let dir = TempDir::new().unwrap();
            let sentinel = dir.path().join("rasterized");
            let page = "monthly rent of Rs. 18,000 payable in advance; ".repeat(3);
            let cfg = stub_config(
                &dir,
                "printf 'Pages: 1\\n'",
                &format!("printf '%s' '{page}'"),
                &format!(": > {}", sentinel.display()),
                "exit 1",
            );

            let result = Extractor::new(&cfg).extract(&pdf_doc()).await.unwrap();
            assert_eq!(result.method, ExtractionMethod::PdfText);
            assert_eq!(result.page_count, Some(1));
            assert!(result.text.contains("monthly rent of Rs. 18,000"));
            assert!(
                !sentinel.exists(),
                "rasterizer ran despite an intact text layer"
            );
        }

        #[tokio::test]
        async fn scanned_pdf_is_recovered_via_ocr() {
            // Empty text layer, so OCR runs; the engine recovers well over
            // the arbitration floor and displaces the primary result.
            let dir = TempDir::new().unwrap();
            let recovered = "recovered scanned clause text ".repeat(5);
            let cfg = stub_config(
                &dir,
                "printf 'Pages: 1\\n'",
                "exit 0",
                ": > \"$5-1.png\"",
                &format!("printf '%s' '{recovered}'"),
            );

            let result = Extractor::new(&cfg).extract(&pdf_doc()).await.unwrap();
            assert_eq!(result.method, ExtractionMethod::PdfOcr);
            assert_eq!(result.page_count, Some(1));
            assert!(result.text.contains("recovered scanned clause text"));
            assert!(result.text.contains("--- Page 1 End (OCR) ---"));
        }

        #[tokio::test]
        async fn weak_ocr_does_not_displace_sparse_text_layer() {
            // A sparse layer triggers the OCR pass, but the short OCR output
            // loses arbitration and the text layer is kept.
            let dir = TempDir::new().unwrap();
            let cfg = stub_config(
                &dir,
                "printf 'Pages: 1\\n'",
                "printf '%s' 'Rent: 500'",
                ": > \"$5-1.png\"",
                "printf '%s' 'Rx'",
            );

            let result = Extractor::new(&cfg).extract(&pdf_doc()).await.unwrap();
            assert_eq!(result.method, ExtractionMethod::PdfText);
            assert!(result.text.contains("Rent: 500"));
        }

        #[tokio::test]
        async fn ocr_failure_keeps_sparse_text_layer() {
            let dir = TempDir::new().unwrap();
            let cfg = stub_config(
                &dir,
                "printf 'Pages: 1\\n'",
                "printf '%s' 'Rent: 500'",
                "exit 1",
                "exit 1",
            );

            let result = Extractor::new(&cfg).extract(&pdf_doc()).await.unwrap();
            assert_eq!(result.method, ExtractionMethod::PdfText);
            assert!(result.text.contains("Rent: 500"));
        }
    }
}
