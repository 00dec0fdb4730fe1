//! Per-document processing state.
//!
//! One typed record per document with explicit transitions:
//! Received -> Extracted -> Indexed -> Completed, and Failed reachable from
//! any non-terminal status. Invalid transitions are rejected rather than
//! silently overwriting fields.

use serde::Serialize;
use thiserror::Error;

use crate::metadata::AgreementMetadata;

/// Processing status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Upload received, nothing processed yet.
    Received,
    /// Text extraction succeeded.
    Extracted,
    /// Chunks embedded and indexed.
    Indexed,
    /// Metadata extraction finished.
    Completed,
    /// Pipeline failed; see the error field.
    Failed,
}

impl DocumentStatus {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Attempted transition was not valid from the current status.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid transition from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: DocumentStatus,
    pub to: DocumentStatus,
}

/// State record for one document moving through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentState {
    pub id: String,
    pub filename: String,
    pub status: DocumentStatus,
    /// Extracted text, present from Extracted onward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Extracted metadata, present once Completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AgreementMetadata>,
    /// Failure description, present once Failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentState {
    /// New record for a freshly received document.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            status: DocumentStatus::Received,
            text: None,
            metadata: None,
            error: None,
        }
    }

    pub fn mark_extracted(&mut self, text: String) -> Result<(), InvalidTransition> {
        self.transition(DocumentStatus::Received, DocumentStatus::Extracted)?;
        self.text = Some(text);
        Ok(())
    }

    pub fn mark_indexed(&mut self) -> Result<(), InvalidTransition> {
        self.transition(DocumentStatus::Extracted, DocumentStatus::Indexed)
    }

    pub fn mark_completed(&mut self, metadata: AgreementMetadata) -> Result<(), InvalidTransition> {
        self.transition(DocumentStatus::Indexed, DocumentStatus::Completed)?;
        self.metadata = Some(metadata);
        Ok(())
    }

    /// Fail the document from any non-terminal status.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        if self.status.is_terminal() {
            return Err(InvalidTransition {
                from: self.status,
                to: DocumentStatus::Failed,
            });
        }
        self.status = DocumentStatus::Failed;
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(
        &mut self,
        expected: DocumentStatus,
        next: DocumentStatus,
    ) -> Result<(), InvalidTransition> {
        if self.status != expected {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
