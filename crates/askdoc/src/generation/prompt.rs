//! Prompt templates for grounded answer generation

use crate::retrieval::SearchResult;

/// Prompt builder for Q&A over retrieved chunks
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the grounding context from ranked search results
    ///
    /// Each passage is prefixed with its source label:
    ///
    /// ```text
    /// From report.pdf:
    /// <chunk text>
    /// ```
    ///
    /// Passages are joined by blank lines, in rank order.
    pub fn build_context(results: &[SearchResult<'_>]) -> String {
        results
            .iter()
            .map(|r| format!("From {}:\n{}", r.chunk.source_label, r.chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full Q&A prompt
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            "Based on the following context, answer the question concisely. \
             If there isn't enough information, say so.\n\n\
             Context:\n{context}\n\n\
             Question: {question}\n\n\
             Answer:"
        )
    }

    /// Collect the distinct source labels from ranked results, preserving
    /// first-seen order
    pub fn distinct_sources(results: &[SearchResult<'_>]) -> Vec<String> {
        let mut sources = Vec::new();
        for result in results {
            let label = &result.chunk.source_label;
            if !sources.iter().any(|s| s == label) {
                sources.push(label.clone());
            }
        }
        sources
    }
}
