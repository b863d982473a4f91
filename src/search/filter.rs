//! Canonical search filter: schema, normalization, and validation.
//!
//! Every search request, whether hand-built through [`FilterBuilder`] or
//! produced by the text-to-filter translator, passes through the same
//! normalization code before it reaches the engine. Validation is tolerant:
//! unknown fields are ignored, type-mismatched fields are treated as absent,
//! and out-of-range pagination values are clamped. The only structural
//! failure is a candidate that is not a JSON object (or `null`, which means
//! the default filter).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Default page size when the candidate carries none.
pub const DEFAULT_LIMIT: usize = 25;

/// Inclusive bounds `limit` is clamped to.
pub const LIMIT_RANGE: (usize, usize) = (1, 100);

/// Result ordering.
///
/// The catalog has no separate relevance score, so `Relevance` orders by
/// descending download count; ties always break by ascending book id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sort {
    #[default]
    #[serde(rename = "relevance")]
    Relevance,
    #[serde(rename = "download_count:desc")]
    DownloadCountDesc,
    #[serde(rename = "download_count:asc")]
    DownloadCountAsc,
}

impl Sort {
    /// Parse a candidate sort value. Unrecognized values yield `None` so the
    /// validator can fall back to [`Sort::Relevance`].
    fn parse(raw: &str) -> Option<Sort> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "relevance" => Some(Sort::Relevance),
            "download_count:desc" => Some(Sort::DownloadCountDesc),
            "download_count:asc" => Some(Sort::DownloadCountAsc),
            _ => None,
        }
    }
}

/// The canonical, validated search request.
///
/// `None` in an optional field means "no constraint". String sets are
/// lowercase and trimmed; a set that would be empty collapses to `None`.
/// A `Filter` is immutable once validated: re-validating its serialized
/// form is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<BTreeSet<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<BTreeSet<String>>,
    #[serde(default)]
    pub sort: Sort,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            ids: None,
            language: None,
            mime_type: None,
            topic: None,
            author: None,
            title: None,
            sort: Sort::Relevance,
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Structural rejection of a filter candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("filter candidate must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

impl Filter {
    /// Canonical constructor for hand-built filters.
    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    /// Whether the filter constrains the result set at all.
    pub fn is_unconstrained(&self) -> bool {
        self.ids.is_none()
            && self.language.is_none()
            && self.mime_type.is_none()
            && self.topic.is_none()
            && self.author.is_none()
            && self.title.is_none()
    }

    /// Validate and normalize an untrusted candidate.
    ///
    /// `null` yields the default filter. Any JSON object is accepted:
    /// unknown keys are ignored, mistyped values are treated as absent,
    /// `limit` is clamped to [`LIMIT_RANGE`], negative `skip` becomes 0,
    /// and an unrecognized `sort` falls back to relevance. Only a
    /// non-object candidate is rejected.
    pub fn validate(candidate: &Value) -> Result<Filter, ValidationError> {
        let obj = match candidate {
            Value::Null => return Ok(Filter::default()),
            Value::Object(map) => map,
            other => return Err(ValidationError::NotAnObject(json_kind(other))),
        };

        Ok(Filter {
            ids: id_set(obj.get("ids")),
            language: string_set(obj.get("language")),
            mime_type: obj
                .get("mime_type")
                .and_then(Value::as_str)
                .map(normalize_term)
                .filter(|s| !s.is_empty()),
            topic: string_set(obj.get("topic")),
            author: string_set(obj.get("author")),
            title: string_set(obj.get("title")),
            sort: obj
                .get("sort")
                .and_then(Value::as_str)
                .and_then(Sort::parse)
                .unwrap_or_default(),
            skip: obj
                .get("skip")
                .and_then(as_integer)
                .map(|n| n.max(0) as usize)
                .unwrap_or(0),
            limit: obj
                .get("limit")
                .and_then(as_integer)
                .map(clamp_limit)
                .unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// Builder funneling hand-built filters through the same normalization as
/// [`Filter::validate`].
#[derive(Debug, Default)]
pub struct FilterBuilder {
    ids: Vec<u32>,
    language: Vec<String>,
    mime_type: Option<String>,
    topic: Vec<String>,
    author: Vec<String>,
    title: Vec<String>,
    sort: Sort,
    skip: i64,
    limit: Option<i64>,
}

impl FilterBuilder {
    pub fn id(mut self, id: u32) -> Self {
        self.ids.push(id);
        self
    }

    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.language.push(code.into());
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic.push(topic.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author.push(author.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title.push(title.into());
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(self) -> Filter {
        Filter {
            ids: nonempty(self.ids.into_iter().filter(|id| *id > 0).collect()),
            language: normalize_set(self.language),
            mime_type: self
                .mime_type
                .map(|m| normalize_term(&m))
                .filter(|m| !m.is_empty()),
            topic: normalize_set(self.topic),
            author: normalize_set(self.author),
            title: normalize_set(self.title),
            sort: self.sort,
            skip: self.skip.max(0) as usize,
            limit: self.limit.map(clamp_limit).unwrap_or(DEFAULT_LIMIT),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Trim and case-fold a match term.
fn normalize_term(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn normalize_set(values: Vec<String>) -> Option<BTreeSet<String>> {
    nonempty(
        values
            .iter()
            .map(|v| normalize_term(v))
            .filter(|v| !v.is_empty())
            .collect(),
    )
}

fn nonempty<T: Ord>(set: BTreeSet<T>) -> Option<BTreeSet<T>> {
    if set.is_empty() { None } else { Some(set) }
}

/// Accept a string, or an array of strings, as a normalized term set.
/// Non-string array elements are dropped; other shapes mean "absent".
fn string_set(value: Option<&Value>) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = match value? {
        Value::String(s) => [normalize_term(s)].into_iter().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(normalize_term)
            .collect(),
        _ => return None,
    };
    nonempty(set.into_iter().filter(|s| !s.is_empty()).collect())
}

/// Accept a positive integer, a numeric string, or an array of either as an
/// id set. Non-numeric and non-positive entries are dropped.
fn id_set(value: Option<&Value>) -> Option<BTreeSet<u32>> {
    let set: BTreeSet<u32> = match value? {
        Value::Array(items) => items.iter().filter_map(as_book_id).collect(),
        single => as_book_id(single).into_iter().collect(),
    };
    nonempty(set)
}

fn as_book_id(value: &Value) -> Option<u32> {
    let n = as_integer(value)?;
    (n > 0).then(|| u32::try_from(n).ok()).flatten()
}

/// Accept a JSON number (fractions truncate) or a numeric string.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn clamp_limit(limit: i64) -> usize {
    let (lo, hi) = LIMIT_RANGE;
    limit.clamp(lo as i64, hi as i64) as usize
}
