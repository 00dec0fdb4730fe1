//! DOCX paragraph text extraction.

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use super::ExtractionError;

/// Extract DOCX body text: non-empty paragraphs joined by blank lines.
///
/// Returns `Ok(None)` when the document parses but contains no text.
pub(crate) fn extract(bytes: &[u8]) -> Result<Option<String>, ExtractionError> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| ExtractionError::InvalidStructure(format!("docx: {e:?}")))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => {
                let text = paragraph_text(&paragraph.children);
                (!text.trim().is_empty()).then_some(text)
            }
            _ => None,
        })
        .collect();

    let joined = paragraphs.join("\n\n").trim().to_string();
    Ok((!joined.is_empty()).then_some(joined))
}

fn paragraph_text(children: &[ParagraphChild]) -> String {
    let mut text = String::new();
    for child in children {
        if let ParagraphChild::Run(run) = child {
            for part in &run.children {
                match part {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Break(_) => text.push('\n'),
                    RunChild::Tab(_) => text.push('\t'),
                    _ => {}
                }
            }
        }
    }
    text
}
