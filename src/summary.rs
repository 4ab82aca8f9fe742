//! Document summaries: frequent terms plus an LLM-written synopsis.

use std::collections::HashMap;

use crate::completion::{CompletionOptions, CompletionService};
use crate::error::PipelineResult;

const STOPWORDS: &[&str] = &[
    "the", "and", "to", "of", "a", "in", "for", "on", "with", "is", "that", "by", "this", "as",
    "are", "at", "an", "be", "from", "or", "it", "which", "but", "has", "have",
];

const TOP_TERMS: usize = 10;

/// Characters of document text sent to the model for summarizing.
const SUMMARY_INPUT_CHARS: usize = 3000;

#[derive(Debug, Clone)]
pub struct DocumentSummary {
    pub summary: String,
    /// `(term, occurrences)`, most frequent first.
    pub top_terms: Vec<(String, usize)>,
}

/// Most frequent words of three or more characters, excluding stop words.
/// Ties keep first-occurrence order.
pub fn top_terms(text: &str, limit: usize) -> Vec<(String, usize)> {
    // term -> (count, first position)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let words = text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(&w.as_str()));

    for (pos, word) in words.enumerate() {
        counts.entry(word).or_insert((0, pos)).0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(term, (count, first))| (term, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(term, count, _)| (term, count))
        .collect()
}

pub fn summary_prompt(text: &str) -> String {
    let head: String = text.chars().take(SUMMARY_INPUT_CHARS).collect();
    format!("Summarize this document in 5 sentences:\n{}", head)
}

pub async fn summarize(
    completion: &dyn CompletionService,
    text: &str,
) -> PipelineResult<DocumentSummary> {
    let summary = completion
        .complete(&summary_prompt(text), &CompletionOptions::default())
        .await?;
    Ok(DocumentSummary {
        summary,
        top_terms: top_terms(text, TOP_TERMS),
    })
}
