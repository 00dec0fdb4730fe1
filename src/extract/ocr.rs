//! OCR fallback via pdftoppm rasterization and Tesseract.
//!
//! The engine is an injected value built from configuration (binary paths,
//! language, DPI, time budgets) rather than process-global state, so tests
//! can point it at stub binaries.
//!
//! Per-page OCR carries a bounded time budget; a timeout or engine error on
//! one page is recorded inline and processing continues with the next page.
//! Only rasterization failure is unrecoverable and bubbles up to the caller,
//! which then keeps the primary result.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;

use super::pdf::PageRead;
use super::{run_tool, ExtractionError};
use crate::config::ExtractionConfig;

/// OCR output for a whole PDF.
pub(crate) struct OcrText {
    /// Concatenated per-page OCR text with boundary markers, trimmed.
    pub text: String,
    /// Number of rasterized pages processed.
    pub pages: u32,
}

/// Tesseract-backed OCR engine.
pub struct OcrEngine {
    tesseract: String,
    pdftoppm: String,
    language: String,
    dpi: u32,
    page_budget: Duration,
    image_budget: Duration,
}

impl OcrEngine {
    pub fn new(cfg: &ExtractionConfig) -> Self {
        Self {
            tesseract: cfg.tesseract_path.clone(),
            pdftoppm: cfg.pdftoppm_path.clone(),
            language: cfg.language.clone(),
            dpi: cfg.dpi,
            page_budget: Duration::from_secs(cfg.page_ocr_timeout_secs),
            image_budget: Duration::from_secs(cfg.image_ocr_timeout_secs),
        }
    }

    /// Whether the OCR engine binary can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.tesseract).is_ok()
    }

    /// OCR every page of a PDF.
    ///
    /// Rasterizes the whole document at the configured DPI, then runs
    /// Tesseract page by page under the per-page budget. Page failures are
    /// folded into the output as inline markers.
    pub(crate) async fn ocr_pdf(&self, pdf: &Path) -> Result<OcrText, ExtractionError> {
        let temp_dir = TempDir::new()?;
        self.rasterize(pdf, temp_dir.path()).await?;

        let images = page_images(temp_dir.path())?;
        if images.is_empty() {
            return Err(ExtractionError::ExtractionFailed(
                "no page images rendered from PDF".to_string(),
            ));
        }

        tracing::debug!(pages = images.len(), "running OCR on rasterized pages");

        let mut pages = Vec::with_capacity(images.len());
        for (idx, image) in images.iter().enumerate() {
            match self.run_tesseract(image, self.page_budget).await {
                Ok(text) if !text.trim().is_empty() => pages.push(PageRead::Text(text)),
                Ok(_) => {
                    tracing::debug!(page = idx + 1, "no text via OCR on page");
                    pages.push(PageRead::Empty);
                }
                Err(e) => {
                    tracing::warn!(page = idx + 1, error = %e, "OCR failed on page");
                    pages.push(PageRead::Failed(e.to_string()));
                }
            }
        }

        Ok(OcrText {
            text: assemble_ocr(&pages),
            pages: pages.len() as u32,
        })
    }

    /// OCR a standalone image under the image budget.
    pub(crate) async fn ocr_image(&self, image: &Path) -> Result<String, ExtractionError> {
        let text = self.run_tesseract(image, self.image_budget).await?;
        Ok(text.trim().to_string())
    }

    /// Rasterize all pages of a PDF into `out_dir` as page-NN.png files.
    async fn rasterize(&self, pdf: &Path, out_dir: &Path) -> Result<(), ExtractionError> {
        let dpi = self.dpi.to_string();
        run_tool(
            Command::new(&self.pdftoppm)
                .args(["-png", "-r", &dpi])
                .arg(pdf)
                .arg(out_dir.join("page")),
            &self.pdftoppm,
            "pdftoppm failed to rasterize PDF",
        )
        .await
        .map(|_| ())
    }

    /// Run Tesseract on one image, killing it if the budget is exceeded.
    async fn run_tesseract(
        &self,
        image: &Path,
        budget: Duration,
    ) -> Result<String, ExtractionError> {
        let mut cmd = Command::new(&self.tesseract);
        cmd.arg(image)
            .arg("stdout")
            .args(["-l", &self.language])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractionError::ToolNotFound(self.tesseract.clone()));
            }
            Err(e) => return Err(ExtractionError::Io(e)),
        };

        // Dropping the output future on timeout reaps the child via
        // kill_on_drop.
        match tokio::time::timeout(budget, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ExtractionError::ExtractionFailed(format!(
                    "tesseract failed: {}",
                    stderr.trim()
                )))
            }
            Ok(Err(e)) => Err(ExtractionError::Io(e)),
            Err(_) => Err(ExtractionError::OcrTimeout(budget.as_secs())),
        }
    }
}

/// Fold per-page OCR outcomes into a single blob, mirroring the primary
/// extractor's marker format so the arbiter can compare lengths directly.
pub(crate) fn assemble_ocr(pages: &[PageRead]) -> String {
    let mut out = String::new();
    for (idx, page) in pages.iter().enumerate() {
        let n = idx + 1;
        match page {
            PageRead::Text(text) => {
                out.push_str(text.trim());
                out.push_str(&format!("\n\n--- Page {n} End (OCR) ---\n\n"));
            }
            PageRead::Empty => {
                out.push_str(&format!("\n\n--- Page {n} (no text via OCR) ---\n\n"));
            }
            PageRead::Failed(_) => {
                out.push_str(&format!("\n\n--- Error on page {n} (OCR) ---\n\n"));
            }
        }
    }
    out.trim().to_string()
}

/// Collect rendered page images in page order.
fn page_images(dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext == "png").unwrap_or(false))
        .collect();

    // pdftoppm zero-pads page numbers, so lexical order is page order.
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_markers_mirror_primary_format() {
        let text = assemble_ocr(&[
            PageRead::Text("scanned words".to_string()),
            PageRead::Empty,
            PageRead::Failed("timeout".to_string()),
        ]);
        assert_eq!(text.matches("--- Page 1 End (OCR) ---").count(), 1);
        assert_eq!(text.matches("--- Page 2 (no text via OCR) ---").count(), 1);
        assert_eq!(text.matches("--- Error on page 3 (OCR) ---").count(), 1);
        assert!(text.starts_with("scanned words"));
    }

    #[test]
    fn ocr_assembly_trims_output() {
        let text = assemble_ocr(&[PageRead::Text("  hello  ".to_string())]);
        assert!(text.starts_with("hello"));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn failed_page_does_not_abort_subsequent_pages() {
        let text = assemble_ocr(&[
            PageRead::Failed("engine crash".to_string()),
            PageRead::Text("page two survived".to_string()),
        ]);
        assert!(text.contains("--- Error on page 1 (OCR) ---"));
        assert!(text.contains("page two survived"));
    }

    #[test]
    fn page_images_sorted_in_page_order() {
        let dir = TempDir::new().unwrap();
        for name in ["page-03.png", "page-01.png", "page-02.png", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let images = page_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["page-01.png", "page-02.png", "page-03.png"]);
    }

    #[tokio::test]
    async fn missing_engine_reports_tool_not_found() {
        let mut cfg = crate::config::ExtractionConfig::default();
        cfg.tesseract_path = "definitely-not-a-real-ocr-binary".to_string();
        let engine = OcrEngine::new(&cfg);
        assert!(!engine.is_available());
        let err = engine
            .ocr_image(Path::new("/nonexistent.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    fn stub_engine(dir: &TempDir, script_body: &str) -> crate::config::ExtractionConfig {
        use std::os::unix::fs::PermissionsExt;
        let stub = dir.path().join("stub-ocr");
        std::fs::write(&stub, format!("#!/bin/sh\n{script_body}\n")).unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();
        let mut cfg = crate::config::ExtractionConfig::default();
        cfg.tesseract_path = stub.to_string_lossy().into_owned();
        cfg
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn timeout_kills_slow_engine() {
        let dir = TempDir::new().unwrap();
        let mut cfg = stub_engine(&dir, "sleep 30");
        cfg.image_ocr_timeout_secs = 1;
        let engine = OcrEngine::new(&cfg);
        let err = engine
            .ocr_image(Path::new("ignored.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::OcrTimeout(1)));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn stub_engine_output_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let cfg = stub_engine(&dir, "printf ' recognized text \\n'");
        let engine = OcrEngine::new(&cfg);
        let text = engine.ocr_image(Path::new("ignored.png")).await.unwrap();
        assert_eq!(text, "recognized text");
    }
}
