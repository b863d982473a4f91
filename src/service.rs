//! Upward surface: the structured search path and the natural-language
//! orchestration.
//!
//! `search_books` validates a candidate filter and runs it; `chat` runs the
//! full translate → validate → search → summarize flow. The chat path never
//! hard-fails because translation failed: it degrades to the default filter
//! and reports the reason alongside the results. Only structurally invalid
//! direct filter input and catalog unavailability surface as errors.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::summarize::Summarizer;
use crate::llm::translate::{FilterTranslator, Translation};
use crate::model::types::{Book, SearchResult};
use crate::search::engine::SearchEngine;
use crate::search::filter::{Filter, ValidationError};
use crate::storage::CatalogError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("catalog unavailable: {0}")]
    Catalog(#[from] CatalogError),
}

/// Response of the natural-language path. Always carries the filter that was
/// actually executed, so callers can see what was inferred or substituted.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub filter_used: Filter,
    pub count: usize,
    pub results: Vec<Book>,
    pub summary: String,
    /// True when the filter in use is the substituted default rather than a
    /// validated translation.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_error: Option<String>,
}

pub struct BookService {
    engine: SearchEngine,
    translator: FilterTranslator,
    summarizer: Summarizer,
}

impl BookService {
    pub fn new(engine: SearchEngine, translator: FilterTranslator, summarizer: Summarizer) -> Self {
        Self {
            engine,
            translator,
            summarizer,
        }
    }

    /// Structured path: validate a candidate filter and execute it.
    pub fn search_books(&self, candidate: &Value) -> Result<SearchResult, ServiceError> {
        let filter = Filter::validate(candidate)?;
        Ok(self.engine.search(&filter)?)
    }

    /// Natural-language path.
    ///
    /// Translation failure (any reason) degrades to an unfiltered,
    /// default-paginated listing; summarization failure degrades only the
    /// summary. Catalog unavailability is the sole hard error.
    pub async fn chat(&self, query: &str) -> Result<ChatResponse, ServiceError> {
        let (filter, translation_error) = match self.translator.translate(query).await {
            Ok(Translation { filter, raw }) => {
                debug!(candidate = %raw, "translation accepted");
                (filter, None)
            }
            Err(failure) => {
                warn!(error = %failure, "translation failed, serving default listing");
                (Filter::default(), Some(failure.to_string()))
            }
        };
        let degraded = translation_error.is_some();

        let result = self.engine.search(&filter)?;
        let summary = self.summarizer.summarize(&result, query).await;

        info!(
            count = result.count,
            returned = result.results.len(),
            degraded = degraded,
            "chat served"
        );
        Ok(ChatResponse {
            filter_used: filter,
            count: result.count,
            results: result.results,
            summary,
            degraded,
            translation_error,
        })
    }
}
