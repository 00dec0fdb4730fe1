//! Retrieval-augmented metadata extraction.
//!
//! The agent chunks extracted document text, embeds the chunks into an
//! in-memory similarity index, then asks one question per target field
//! against the top-k retrieved chunks. The index lives for one document.

mod chunker;
mod index;

pub use chunker::chunk_text;
pub use index::VectorIndex;

use thiserror::Error;

use crate::config::RagConfig;
use crate::llm::{LlmClient, LlmError, RetryPolicy};
use crate::metadata::{clean_answer, AgreementMetadata, MetadataField};

/// Errors from the extraction agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("document not indexed")]
    NotIndexed,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Agent that indexes one agreement and answers the field questions.
pub struct AgreementAgent {
    llm: LlmClient,
    retry: RetryPolicy,
    cfg: RagConfig,
    index: Option<VectorIndex>,
}

impl AgreementAgent {
    pub fn new(llm: LlmClient, retry: RetryPolicy, cfg: RagConfig) -> Self {
        Self {
            llm,
            retry,
            cfg,
            index: None,
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.index.as_ref().map(|i| !i.is_empty()).unwrap_or(false)
    }

    /// Chunk and embed the document text. Returns the number of chunks
    /// indexed; zero means the text was empty and nothing can be queried.
    pub async fn index_document(&mut self, text: &str) -> Result<usize, AgentError> {
        let chunks = chunk_text(text, self.cfg.chunk_size, self.cfg.chunk_overlap);
        tracing::info!(chunks = chunks.len(), "indexing document");

        let mut index = VectorIndex::new();
        for chunk in chunks {
            let embedding = self
                .retry
                .run(|| self.llm.embed(&chunk), LlmError::is_retryable)
                .await?;
            index.insert(chunk, embedding);
        }

        let indexed = index.len();
        self.index = Some(index);
        Ok(indexed)
    }

    /// Answer every field question against the indexed document.
    ///
    /// A field that still fails after retries is recorded as absent and
    /// extraction continues with the remaining fields.
    pub async fn extract_metadata(&self) -> Result<AgreementMetadata, AgentError> {
        let index = self
            .index
            .as_ref()
            .filter(|i| !i.is_empty())
            .ok_or(AgentError::NotIndexed)?;

        let mut metadata = AgreementMetadata::default();
        let total = MetadataField::ALL.len();

        for (i, field) in MetadataField::ALL.into_iter().enumerate() {
            tracing::info!(field = field.name(), "extracting field {}/{total}", i + 1);

            match self.answer_field(index, field).await {
                Ok(raw) => {
                    let cleaned = clean_answer(&raw);
                    tracing::debug!(
                        field = field.name(),
                        raw = %raw.trim(),
                        found = cleaned.is_some(),
                        "field answered"
                    );
                    metadata.set(field, cleaned);
                }
                Err(e) => {
                    tracing::warn!(field = field.name(), error = %e, "field extraction failed");
                    metadata.set(field, None);
                }
            }
        }

        tracing::info!(found = metadata.found_count(), total, "metadata extraction finished");
        Ok(metadata)
    }

    async fn answer_field(
        &self,
        index: &VectorIndex,
        field: MetadataField,
    ) -> Result<String, LlmError> {
        let query = field.query_with_format();

        let query_embedding = self
            .retry
            .run(|| self.llm.embed(&query), LlmError::is_retryable)
            .await?;

        let context = index.search(&query_embedding, self.cfg.top_k).join("\n\n");

        self.retry
            .run(|| self.llm.answer(&query, &context), LlmError::is_retryable)
            .await
    }
}
