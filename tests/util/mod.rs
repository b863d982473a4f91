//! Shared fixtures for integration tests: catalog builders, a seeded sample
//! catalog, and scripted inference backends.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gutensearch::llm::summarize::Summarizer;
use gutensearch::llm::translate::FilterTranslator;
use gutensearch::llm::{Inference, InferenceError, InferenceGate};
use gutensearch::model::types::{Author, Book, Bookshelf, Format, Language, Subject};
use gutensearch::search::engine::SearchEngine;
use gutensearch::service::BookService;
use gutensearch::storage::sqlite::{SqliteCatalog, import_books};
use tempfile::TempDir;

pub struct BookBuilder {
    book: Book,
}

pub fn book(id: u32, title: &str, download_count: u64) -> BookBuilder {
    BookBuilder {
        book: Book {
            id,
            title: title.into(),
            download_count,
            authors: vec![],
            subjects: vec![],
            bookshelves: vec![],
            languages: vec![],
            formats: vec![],
        },
    }
}

impl BookBuilder {
    pub fn author(mut self, id: u32, name: &str) -> Self {
        self.book.authors.push(Author {
            id,
            name: name.into(),
            birth_year: None,
            death_year: None,
        });
        self
    }

    pub fn subject(mut self, id: u32, name: &str) -> Self {
        self.book.subjects.push(Subject {
            id,
            name: name.into(),
        });
        self
    }

    pub fn bookshelf(mut self, id: u32, name: &str) -> Self {
        self.book.bookshelves.push(Bookshelf {
            id,
            name: name.into(),
        });
        self
    }

    pub fn language(mut self, id: u32, code: &str) -> Self {
        self.book.languages.push(Language {
            id,
            code: code.into(),
        });
        self
    }

    pub fn format(mut self, mime_type: &str, url: &str) -> Self {
        self.book.formats.push(Format {
            mime_type: mime_type.into(),
            url: url.into(),
        });
        self
    }

    pub fn build(self) -> Book {
        self.book
    }
}

/// A small catalog exercising every filter dimension, including the fixed
/// id 17489 used by the exact-id lookups.
pub fn sample_catalog() -> Vec<Book> {
    vec![
        book(17489, "The Writings of Abraham Lincoln, Volume 1", 1200)
            .author(10, "Lincoln, Abraham")
            .subject(1, "Presidents -- United States -- Biography")
            .language(1, "en")
            .format("text/plain; charset=utf-8", "https://example.org/17489.txt")
            .build(),
        book(5, "The United States Constitution", 4000)
            .author(11, "United States")
            .subject(2, "Politics and government")
            .bookshelf(1, "Politics")
            .language(1, "en")
            .format("text/plain; charset=us-ascii", "https://example.org/5.txt")
            .format("application/epub+zip", "https://example.org/5.epub")
            .build(),
        book(19942, "Candide", 2500)
            .author(12, "Voltaire")
            .subject(3, "Satire, French")
            .bookshelf(2, "Best Books Ever Listings")
            .language(2, "fr")
            .format("application/epub+zip", "https://example.org/19942.epub")
            .build(),
        book(1322, "Les Misérables, Tome I", 1800)
            .author(13, "Hugo, Victor")
            .subject(4, "Historical fiction, French")
            .language(2, "fr")
            .format("text/html", "https://example.org/1322.html")
            .build(),
        book(36, "The War of the Worlds", 3000)
            .author(14, "Wells, H. G. (Herbert George)")
            .subject(5, "Science fiction")
            .bookshelf(3, "Movie Books")
            .language(1, "en")
            .format("text/plain; charset=utf-8", "https://example.org/36.txt")
            .build(),
        book(2650, "Du côté de chez Swann", 900)
            .author(15, "Proust, Marcel")
            .subject(6, "Psychological fiction, French")
            .language(2, "fr")
            .format("text/plain; charset=utf-8", "https://example.org/2650.txt")
            .build(),
        // Download-count tie for tie-break checks.
        book(300, "Tied Twin One", 700)
            .language(1, "en")
            .build(),
        book(200, "Tied Twin Two", 700)
            .language(1, "en")
            .build(),
    ]
}

/// Import the sample catalog into a temp SQLite database and open it.
/// The `TempDir` keeps the database alive for the test's duration.
pub fn sqlite_sample_catalog() -> (TempDir, SqliteCatalog, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let db = dir.path().join("catalog.db");
    import_books(&db, &sample_catalog()).expect("import sample catalog");
    let catalog = SqliteCatalog::open(&db).expect("open sample catalog");
    (dir, catalog, db)
}

/// Inference backend answering from a rule list: the first rule whose needle
/// occurs in the prompt supplies the completion. Prompts matching no rule
/// fail, and every call is counted.
pub struct ScriptedInference {
    rules: Vec<(String, String)>,
    pub calls: AtomicUsize,
}

impl ScriptedInference {
    pub fn new(rules: &[(&str, &str)]) -> Self {
        Self {
            rules: rules
                .iter()
                .map(|(needle, completion)| (needle.to_string(), completion.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Inference for ScriptedInference {
    fn id(&self) -> &str {
        "scripted"
    }

    fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, completion)| completion.clone())
            .ok_or_else(|| InferenceError::Failed("no scripted rule matched".into()))
    }
}

/// Inference backend that always fails.
pub struct FailingInference;

impl Inference for FailingInference {
    fn id(&self) -> &str {
        "failing"
    }

    fn complete(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::Failed("forced failure".into()))
    }
}

/// Build a full service over the given catalog and inference backend.
pub fn service_with(catalog: SqliteCatalog, backend: Arc<dyn Inference>) -> BookService {
    let gate = Arc::new(InferenceGate::new(backend, 1, Duration::from_secs(5)));
    BookService::new(
        SearchEngine::new(Arc::new(catalog)),
        FilterTranslator::new(Arc::clone(&gate)),
        Summarizer::new(gate),
    )
}
