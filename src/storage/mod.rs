//! Catalog storage: the collaborator that owns the fixed book catalog.
//!
//! The search engine only ever sees the [`Catalog`] trait: an immutable
//! snapshot of every book. Persistence, schema, and connection management
//! belong to the backend. [`sqlite::SqliteCatalog`] is the production
//! backend; [`MemoryCatalog`] backs tests and import staging.

pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::model::types::Book;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog database not found at {path}")]
    NotFound { path: PathBuf },
    #[error("catalog storage error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },
    #[error("catalog import failed: {message}")]
    Import { message: String },
}

/// Read-only view of the catalog.
///
/// Implementations must be cheap to call repeatedly: the snapshot is shared,
/// never copied, so concurrent searches need no locking.
pub trait Catalog: Send + Sync {
    /// Every book in the catalog, in unspecified order.
    fn books(&self) -> Result<Arc<Vec<Book>>, CatalogError>;

    /// Number of books in the catalog.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory catalog over a fixed book list.
pub struct MemoryCatalog {
    books: Arc<Vec<Book>>,
}

impl MemoryCatalog {
    pub fn new(books: Vec<Book>) -> Self {
        Self {
            books: Arc::new(books),
        }
    }
}

impl Catalog for MemoryCatalog {
    fn books(&self) -> Result<Arc<Vec<Book>>, CatalogError> {
        Ok(Arc::clone(&self.books))
    }

    fn len(&self) -> usize {
        self.books.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_catalog_shares_one_snapshot() {
        let catalog = MemoryCatalog::new(vec![Book {
            id: 1,
            title: "A".into(),
            download_count: 0,
            authors: vec![],
            subjects: vec![],
            bookshelves: vec![],
            languages: vec![],
            formats: vec![],
        }]);
        let a = catalog.books().unwrap();
        let b = catalog.books().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.is_empty());
    }
}
