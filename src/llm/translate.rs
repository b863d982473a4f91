//! Free-text to filter translation.
//!
//! Queries that are nothing but a ranking request ("top 5", "most
//! downloaded") translate deterministically without touching the model.
//! Everything else is sent to inference with a schema-describing prompt;
//! the completion is untrusted and must survive JSON extraction plus the
//! shared filter validation before it is used.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{InferenceError, InferenceGate};
use crate::search::filter::{Filter, Sort};

const FILTER_OPEN: &str = "<<<FILTER>>>";
const FILTER_CLOSE: &str = "<<<END>>>";

static TOP_N: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btop\s+(\d+)\b").expect("regex"));
static MOST_DOWNLOADED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bmost\s+downloaded\b").expect("regex"));

/// Words that carry no filter information; a ranking query consisting only
/// of these (plus the ranking phrase itself) takes the fast path.
const FILLER_WORDS: &[&str] = &[
    "a", "all", "book", "books", "give", "list", "me", "of", "one", "ones", "please", "show",
    "the", "what", "which",
];

/// Why a translation could not produce a usable filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationFailure {
    #[error("inference timed out")]
    Timeout,
    #[error("inference capability unavailable: {0}")]
    Unavailable(String),
    #[error("completion contained no parsable filter")]
    Malformed,
    #[error("candidate filter rejected: {0}")]
    Rejected(String),
}

/// A successful translation: the validated filter plus the raw candidate
/// kept for audit. Created per request and consumed once.
#[derive(Debug, Clone)]
pub struct Translation {
    pub filter: Filter,
    pub raw: Value,
}

pub type TranslationOutcome = Result<Translation, TranslationFailure>;

pub struct FilterTranslator {
    gate: Arc<InferenceGate>,
}

impl FilterTranslator {
    pub fn new(gate: Arc<InferenceGate>) -> Self {
        Self { gate }
    }

    /// Translate a free-text query into a validated filter.
    ///
    /// Stateless per call; nothing produced by inference bypasses
    /// [`Filter::validate`].
    pub async fn translate(&self, query: &str) -> TranslationOutcome {
        if let Some(translation) = fast_path(query) {
            debug!(filter = ?translation.filter, "fast-path translation");
            return Ok(translation);
        }

        let completion = self
            .gate
            .complete(build_prompt(query))
            .await
            .map_err(|err| match err {
                InferenceError::Timeout(_) => TranslationFailure::Timeout,
                InferenceError::Unavailable { reason } => TranslationFailure::Unavailable(reason),
                InferenceError::Failed(message) => TranslationFailure::Unavailable(message),
            })?;

        let raw = extract_candidate(&completion).ok_or(TranslationFailure::Malformed)?;
        let filter = Filter::validate(&raw)
            .map_err(|err| TranslationFailure::Rejected(err.to_string()))?;
        debug!(filter = ?filter, "translated query");
        Ok(Translation { filter, raw })
    }
}

/// Deterministic translation for pure ranking queries.
///
/// Applies only when, after removing the ranking phrase, nothing but filler
/// remains; "top 6 french books" still goes to inference so the language
/// constraint is not lost.
fn fast_path(query: &str) -> Option<Translation> {
    let limit = TOP_N
        .captures(query)
        .and_then(|caps| caps[1].parse::<i64>().ok());
    let ranked = limit.is_some() || MOST_DOWNLOADED.is_match(query);
    if !ranked {
        return None;
    }

    let stripped = MOST_DOWNLOADED.replace_all(query, " ");
    let stripped = TOP_N.replace_all(&stripped, " ");
    let leftover = stripped
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .any(|word| !FILLER_WORDS.contains(&word.to_lowercase().as_str()));
    if leftover {
        return None;
    }

    let filter = Filter::builder()
        .sort(Sort::DownloadCountDesc)
        .limit(limit.unwrap_or(1))
        .build();
    let raw = serde_json::json!({
        "sort": "download_count:desc",
        "limit": filter.limit,
    });
    Some(Translation { filter, raw })
}

fn build_prompt(query: &str) -> String {
    format!(
        "You translate book-catalog queries into a JSON search filter.\n\
         Allowed keys: ids, language, mime_type, topic, author, title, sort, limit.\n\
         `language` holds lowercase ISO-639 codes such as \"en\" or \"fr\".\n\
         `sort` is one of \"relevance\", \"download_count:desc\", \"download_count:asc\".\n\
         Output exactly one JSON object between {FILTER_OPEN} and {FILTER_CLOSE}, nothing else.\n\
         Query: {query}\n{FILTER_OPEN}"
    )
}

/// Pull a candidate JSON object out of a completion: first the marker pair,
/// then any balanced brace blob anywhere in the text.
fn extract_candidate(completion: &str) -> Option<Value> {
    if let Some(start) = completion.find(FILTER_OPEN) {
        let after = &completion[start + FILTER_OPEN.len()..];
        if let Some(candidate) = balanced_objects(after)
            .into_iter()
            .find_map(|blob| parse_object(blob))
        {
            return Some(candidate);
        }
    }
    balanced_objects(completion)
        .into_iter()
        .find_map(|blob| parse_object(blob))
}

fn parse_object(blob: &str) -> Option<Value> {
    serde_json::from_str::<Value>(blob)
        .ok()
        .filter(Value::is_object)
}

/// Every balanced `{…}` span in the text, left to right, non-overlapping.
fn balanced_objects(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        let mut depth = 0usize;
        let mut end = None;
        for (i, c) in text[start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(start + i + 1);
                        break;
                    }
                }
                _ => {}
            }
        }
        match end {
            Some(end) => {
                spans.push(&text[start..end]);
                from = end;
            }
            None => break,
        }
    }
    spans
}
