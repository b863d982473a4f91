//! Catalog search: deterministic matching, ordering, and pagination.
//!
//! All present filter fields are AND-combined; absent fields impose no
//! constraint. Pagination is applied strictly after filtering and sorting,
//! and `count` is always the pre-pagination match size.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::info;

use crate::model::types::{Book, SearchResult};
use crate::search::filter::{Filter, Sort};
use crate::storage::{Catalog, CatalogError};

pub struct SearchEngine {
    catalog: Arc<dyn Catalog>,
}

impl SearchEngine {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Apply a validated filter to the catalog.
    ///
    /// Empty matches are not an error; they yield `count = 0` and an empty
    /// page. Only catalog unavailability surfaces as a failure.
    pub fn search(&self, filter: &Filter) -> Result<SearchResult, CatalogError> {
        let books = self.catalog.books()?;

        let mut matched: Vec<&Book> = books.iter().filter(|b| matches(b, filter)).collect();
        matched.sort_by(|a, b| order(filter.sort, a, b));

        let count = matched.len();
        let results: Vec<Book> = matched
            .into_iter()
            .skip(filter.skip)
            .take(filter.limit)
            .cloned()
            .collect();

        info!(
            count = count,
            returned = results.len(),
            skip = filter.skip,
            limit = filter.limit,
            unconstrained = filter.is_unconstrained(),
            "search complete"
        );
        Ok(SearchResult { count, results })
    }
}

fn matches(book: &Book, filter: &Filter) -> bool {
    if let Some(ids) = &filter.ids
        && !ids.contains(&book.id)
    {
        return false;
    }
    if let Some(codes) = &filter.language
        && !book
            .languages
            .iter()
            .any(|l| codes.contains(&l.code.to_lowercase()))
    {
        return false;
    }
    if let Some(mime) = &filter.mime_type
        && !book
            .formats
            .iter()
            .any(|f| f.mime_type.to_lowercase().starts_with(mime.as_str()))
    {
        return false;
    }
    if let Some(topics) = &filter.topic {
        let hit = book
            .subjects
            .iter()
            .map(|s| s.name.as_str())
            .chain(book.bookshelves.iter().map(|b| b.name.as_str()))
            .any(|name| contains_any(name, topics));
        if !hit {
            return false;
        }
    }
    if let Some(authors) = &filter.author
        && !book
            .authors
            .iter()
            .any(|a| contains_any(&a.name, authors))
    {
        return false;
    }
    if let Some(titles) = &filter.title
        && !contains_any(&book.title, titles)
    {
        return false;
    }
    true
}

/// Case-insensitive substring match against any needle in the set.
/// Needles are already lowercase (validator invariant).
fn contains_any(haystack: &str, needles: &std::collections::BTreeSet<String>) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

/// Total order for results. Relevance has no separate score, so it shares
/// the descending download-count order; ties always break by ascending id
/// for determinism.
fn order(sort: Sort, a: &Book, b: &Book) -> Ordering {
    let primary = match sort {
        Sort::DownloadCountAsc => a.download_count.cmp(&b.download_count),
        Sort::DownloadCountDesc | Sort::Relevance => b.download_count.cmp(&a.download_count),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}
