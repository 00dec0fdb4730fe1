//! Prompt templates for field question-answering.

/// QA prompt: answer strictly from the retrieved context, signal missing
/// evidence with 'Not Found', and follow the per-field formatting
/// instruction appended to the question.
const QA_PROMPT: &str = "\
Use the following pieces of context to answer the question at the end.
If you don't find the answer in the context, respond with 'Not Found'. Do not make up information.
Follow the specific formatting instructions precisely.

Context:
{context}

Question: {question}

Answer:";

pub(super) fn build_qa(context: &str, question: &str) -> String {
    QA_PROMPT
        .replace("{context}", context)
        .replace("{question}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_filled() {
        let prompt = build_qa("the rent is Rs. 18,000", "What is the rent?");
        assert!(prompt.contains("Context:\nthe rent is Rs. 18,000"));
        assert!(prompt.contains("Question: What is the rent?"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }
}
