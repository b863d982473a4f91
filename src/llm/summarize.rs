//! Natural-language synopsis of a search result.
//!
//! Summarization is always best-effort: it never blocks delivery of search
//! results. The inference prompt is bounded to a small prefix of the result
//! page regardless of the match count, an empty result short-circuits to a
//! fixed message without invoking inference, and any inference failure falls
//! back to a deterministic template built from titles alone.

use std::sync::Arc;

use tracing::warn;

use super::InferenceGate;
use crate::model::types::SearchResult;

/// Books included in the summarization prompt, regardless of result size.
pub const SUMMARY_PREFIX_BOOKS: usize = 5;

/// Fixed response for an empty result set; inference is never invoked.
pub const EMPTY_RESULT_SUMMARY: &str = "No books matched your criteria.";

/// Completions at or below this length (after echo stripping) are unusable.
const MIN_SUMMARY_CHARS: usize = 20;

pub struct Summarizer {
    gate: Arc<InferenceGate>,
}

impl Summarizer {
    pub fn new(gate: Arc<InferenceGate>) -> Self {
        Self { gate }
    }

    /// Produce a short synopsis of the result set.
    ///
    /// Infallible by design: every failure path lands on a deterministic
    /// fallback string.
    pub async fn summarize(&self, result: &SearchResult, query: &str) -> String {
        if result.count == 0 {
            return EMPTY_RESULT_SUMMARY.to_string();
        }
        if result.results.is_empty() {
            // Matches exist but the page is empty (skip past the end);
            // there is nothing to prompt with.
            return fallback_summary(result);
        }

        let prompt = build_prompt(result, query);
        match self.gate.complete(prompt.clone()).await {
            Ok(completion) => usable_summary(&completion, &prompt).unwrap_or_else(|| {
                warn!("summary completion unusable, serving templated fallback");
                fallback_summary(result)
            }),
            Err(err) => {
                warn!(error = %err, "summarization failed, serving templated fallback");
                fallback_summary(result)
            }
        }
    }
}

fn build_prompt(result: &SearchResult, query: &str) -> String {
    let mut lines = String::new();
    for book in result.results.iter().take(SUMMARY_PREFIX_BOOKS) {
        let authors = book
            .authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let subjects = book
            .subjects
            .iter()
            .take(3)
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        lines.push_str("- \"");
        lines.push_str(&book.title);
        lines.push('"');
        if !authors.is_empty() {
            lines.push_str(" by ");
            lines.push_str(&authors);
        }
        if !subjects.is_empty() {
            lines.push_str(" (");
            lines.push_str(&subjects);
            lines.push(')');
        }
        lines.push('\n');
    }

    format!(
        "The catalog search \"{query}\" matched {count} {books}. The first results are:\n\
         {lines}\
         Write a 1-2 sentence summary of the overall result, mentioning shared subjects or \
         themes. Do not list every book.",
        count = result.count,
        books = if result.count == 1 { "book" } else { "books" },
    )
}

/// Strip a leading prompt echo and reject too-short remainders.
fn usable_summary(completion: &str, prompt: &str) -> Option<String> {
    let mut text = completion.trim();
    if let Some(rest) = text.strip_prefix(prompt.trim()) {
        text = rest.trim_start_matches(['\n', ':', ' ']);
    }
    let text = text.trim();
    (text.len() > MIN_SUMMARY_CHARS).then(|| text.to_string())
}

fn fallback_summary(result: &SearchResult) -> String {
    let count = if result.count == 1 {
        "1 book".to_string()
    } else {
        format!("{} books", result.count)
    };
    let titles: Vec<&str> = result
        .results
        .iter()
        .take(2)
        .map(|b| b.title.as_str())
        .collect();
    match titles.as_slice() {
        [] => format!("Found {count} matching your query."),
        [only] => format!("Found {count} matching your query, including \"{only}\"."),
        [first, second, ..] => {
            format!("Found {count} matching your query, including \"{first}\" and \"{second}\".")
        }
    }
}
