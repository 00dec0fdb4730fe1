//! Configuration management for rentmeta.
//!
//! Settings load from an optional TOML file with environment-variable
//! overrides for the LLM section. Extraction thresholds (OCR gain, floor,
//! minimum chars per page) live here so the quality heuristics can be
//! calibrated without code changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Document text extraction and OCR settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// LLM endpoint settings (generation and embeddings).
    #[serde(default)]
    pub llm: LlmConfig,
    /// Chunking and retrieval settings.
    #[serde(default)]
    pub rag: RagConfig,
    /// Retry policy for LLM calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Settings {
    /// Load settings from an explicit path, or from `rentmeta.toml` in the
    /// current directory if present, falling back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default = PathBuf::from("rentmeta.toml");
                default.exists().then_some(default)
            }
        };

        let mut settings = match candidate {
            Some(p) => {
                let raw = std::fs::read_to_string(&p)
                    .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", p.display()))?;
                toml::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", p.display()))?
            }
            None => Settings::default(),
        };

        settings.llm = settings.llm.with_env_overrides();
        Ok(settings)
    }
}

/// Settings for the extraction pipeline and OCR engine.
///
/// The engine binary locations are injected here rather than read from
/// process-global state, so tests can substitute stub binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Path or name of the tesseract binary.
    #[serde(default = "default_tesseract")]
    pub tesseract_path: String,
    /// Path or name of the pdftotext binary (Poppler).
    #[serde(default = "default_pdftotext")]
    pub pdftotext_path: String,
    /// Path or name of the pdftoppm binary (Poppler).
    #[serde(default = "default_pdftoppm")]
    pub pdftoppm_path: String,
    /// Path or name of the pdfinfo binary (Poppler).
    #[serde(default = "default_pdfinfo")]
    pub pdfinfo_path: String,
    /// Tesseract language setting.
    #[serde(default = "default_language")]
    pub language: String,
    /// Rasterization resolution for OCR, in DPI.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Per-page OCR time budget in seconds (PDF pages).
    #[serde(default = "default_page_ocr_timeout")]
    pub page_ocr_timeout_secs: u64,
    /// OCR time budget in seconds for standalone images.
    #[serde(default = "default_image_ocr_timeout")]
    pub image_ocr_timeout_secs: u64,
    /// Minimum average characters per page before the text layer is
    /// considered too sparse and OCR is attempted anyway.
    #[serde(default = "default_min_chars_per_page")]
    pub min_chars_per_page: usize,
    /// How much longer (in percent) OCR output must be than the text layer
    /// to be preferred. Empirical; see the arbiter module.
    #[serde(default = "default_ocr_gain_percent")]
    pub ocr_gain_percent: u32,
    /// Minimum OCR length for OCR to win against a near-empty text layer.
    #[serde(default = "default_ocr_floor_chars")]
    pub ocr_floor_chars: usize,
}

fn default_tesseract() -> String {
    "tesseract".to_string()
}

fn default_pdftotext() -> String {
    "pdftotext".to_string()
}

fn default_pdftoppm() -> String {
    "pdftoppm".to_string()
}

fn default_pdfinfo() -> String {
    "pdfinfo".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_dpi() -> u32 {
    300
}

fn default_page_ocr_timeout() -> u64 {
    30
}

fn default_image_ocr_timeout() -> u64 {
    60
}

fn default_min_chars_per_page() -> usize {
    50
}

fn default_ocr_gain_percent() -> u32 {
    20
}

fn default_ocr_floor_chars() -> usize {
    100
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tesseract_path: default_tesseract(),
            pdftotext_path: default_pdftotext(),
            pdftoppm_path: default_pdftoppm(),
            pdfinfo_path: default_pdfinfo(),
            language: default_language(),
            dpi: default_dpi(),
            page_ocr_timeout_secs: default_page_ocr_timeout(),
            image_ocr_timeout_secs: default_image_ocr_timeout(),
            min_chars_per_page: default_min_chars_per_page(),
            ocr_gain_percent: default_ocr_gain_percent(),
            ocr_floor_chars: default_ocr_floor_chars(),
        }
    }
}

/// Configuration for the LLM client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API endpoint (Ollama-compatible).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model used for field question-answering.
    #[serde(default = "default_model")]
    pub model: String,
    /// Model used for embeddings.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Maximum tokens in a response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation. Low keeps extraction deterministic.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum characters of retrieved context to send per question.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_context_chars() -> usize {
    12000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENDPOINT`: API endpoint
    /// - `LLM_MODEL`: generation model name
    /// - `LLM_EMBEDDING_MODEL`: embedding model name
    /// - `LLM_MAX_TOKENS`: maximum tokens in response
    /// - `LLM_TEMPERATURE`: generation temperature (0.0-1.0)
    /// - `LLM_MAX_CONTEXT_CHARS`: max retrieved context chars per question
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("LLM_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("LLM_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("LLM_EMBEDDING_MODEL") {
            self.embedding_model = val;
        }
        if let Ok(val) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(n) = val.parse() {
                self.max_tokens = n;
            }
        }
        if let Ok(val) = std::env::var("LLM_TEMPERATURE") {
            if let Ok(t) = val.parse() {
                self.temperature = t;
            }
        }
        if let Ok(val) = std::env::var("LLM_MAX_CONTEXT_CHARS") {
            if let Ok(n) = val.parse() {
                self.max_context_chars = n;
            }
        }
        self
    }
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    /// Chunk window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per field question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

/// Retry policy settings for LLM calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per call (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Initial backoff in milliseconds; doubles per attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}
