//! Catalog entity structs.
//!
//! Read-only projections of the book catalog. Nothing in this crate mutates
//! a [`Book`] after it leaves the storage layer; books are fetched, filtered,
//! and rendered only.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: u32,
    pub name: String,
    pub birth_year: Option<i16>,
    pub death_year: Option<i16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookshelf {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Language {
    pub id: u32,
    /// Lowercase ISO-639 code, e.g. "en", "fr".
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Format {
    pub mime_type: String,
    pub url: String,
}

/// A single catalog entry with its attached metadata.
///
/// `authors` preserves catalog order; the remaining collections carry
/// whatever order the storage backend loaded them in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Book {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub bookshelves: Vec<Bookshelf>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub formats: Vec<Format>,
}

/// Outcome of one search: the pre-pagination match count plus the page.
///
/// Invariant: `results.len() == min(limit, max(0, count - skip))` for the
/// filter that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub count: usize,
    pub results: Vec<Book>,
}
