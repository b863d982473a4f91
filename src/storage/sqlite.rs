//! `SQLite` catalog backend: schema, snapshot loading, and import.
//!
//! The on-disk layout mirrors the Gutendex relational schema: one table per
//! entity plus join tables for the many-to-many relations. The catalog is
//! fixed and read-mostly, so [`SqliteCatalog::open`] loads the whole catalog
//! into an in-memory snapshot once and serves that snapshot thereafter;
//! searches never touch the connection again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rusqlite::{Connection, OpenFlags, params};
use tracing::info;

use super::{Catalog, CatalogError};
use crate::model::types::{Author, Book, Bookshelf, Format, Language, Subject};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS books_book (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    download_count INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS books_author (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    birth_year INTEGER,
    death_year INTEGER
);
CREATE TABLE IF NOT EXISTS books_subject (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS books_bookshelf (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS books_language (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS books_format (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id INTEGER NOT NULL REFERENCES books_book(id),
    mime_type TEXT NOT NULL,
    url TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS books_book_authors (
    book_id INTEGER NOT NULL REFERENCES books_book(id),
    author_id INTEGER NOT NULL REFERENCES books_author(id),
    PRIMARY KEY (book_id, author_id)
);
CREATE TABLE IF NOT EXISTS books_book_subjects (
    book_id INTEGER NOT NULL REFERENCES books_book(id),
    subject_id INTEGER NOT NULL REFERENCES books_subject(id),
    PRIMARY KEY (book_id, subject_id)
);
CREATE TABLE IF NOT EXISTS books_book_bookshelves (
    book_id INTEGER NOT NULL REFERENCES books_book(id),
    bookshelf_id INTEGER NOT NULL REFERENCES books_bookshelf(id),
    PRIMARY KEY (book_id, bookshelf_id)
);
CREATE TABLE IF NOT EXISTS books_book_languages (
    book_id INTEGER NOT NULL REFERENCES books_book(id),
    language_id INTEGER NOT NULL REFERENCES books_language(id),
    PRIMARY KEY (book_id, language_id)
);
";

/// SQLite-backed catalog serving an immutable snapshot loaded at open.
#[derive(Debug)]
pub struct SqliteCatalog {
    path: PathBuf,
    snapshot: Arc<Vec<Book>>,
}

impl SqliteCatalog {
    /// Open the catalog read-only and load the snapshot.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let start = Instant::now();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let snapshot = load_snapshot(&conn)?;
        info!(
            path = %path.display(),
            books = snapshot.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded catalog snapshot"
        );
        Ok(Self {
            path: path.to_path_buf(),
            snapshot: Arc::new(snapshot),
        })
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Catalog for SqliteCatalog {
    fn books(&self) -> Result<Arc<Vec<Book>>, CatalogError> {
        Ok(Arc::clone(&self.snapshot))
    }

    fn len(&self) -> usize {
        self.snapshot.len()
    }
}

/// Import a book dump, replacing any existing catalog contents.
///
/// Creates the schema if needed and writes everything in one transaction,
/// so a failed import leaves the previous catalog intact. Returns the
/// number of books written.
pub fn import_books(path: &Path, books: &[Book]) -> Result<usize, CatalogError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| CatalogError::Import {
            message: format!("create {}: {e}", parent.display()),
        })?;
    }

    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    for table in [
        "books_book_authors",
        "books_book_subjects",
        "books_book_bookshelves",
        "books_book_languages",
        "books_format",
        "books_author",
        "books_subject",
        "books_bookshelf",
        "books_language",
        "books_book",
    ] {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
    }

    for book in books {
        tx.execute(
            "INSERT INTO books_book (id, title, download_count) VALUES (?1, ?2, ?3)",
            params![book.id, book.title, book.download_count as i64],
        )?;
        for author in &book.authors {
            tx.execute(
                "INSERT OR IGNORE INTO books_author (id, name, birth_year, death_year)
                 VALUES (?1, ?2, ?3, ?4)",
                params![author.id, author.name, author.birth_year, author.death_year],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO books_book_authors (book_id, author_id) VALUES (?1, ?2)",
                params![book.id, author.id],
            )?;
        }
        for subject in &book.subjects {
            tx.execute(
                "INSERT OR IGNORE INTO books_subject (id, name) VALUES (?1, ?2)",
                params![subject.id, subject.name],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO books_book_subjects (book_id, subject_id) VALUES (?1, ?2)",
                params![book.id, subject.id],
            )?;
        }
        for shelf in &book.bookshelves {
            tx.execute(
                "INSERT OR IGNORE INTO books_bookshelf (id, name) VALUES (?1, ?2)",
                params![shelf.id, shelf.name],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO books_book_bookshelves (book_id, bookshelf_id)
                 VALUES (?1, ?2)",
                params![book.id, shelf.id],
            )?;
        }
        for language in &book.languages {
            tx.execute(
                "INSERT OR IGNORE INTO books_language (id, code) VALUES (?1, ?2)",
                params![language.id, language.code],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO books_book_languages (book_id, language_id)
                 VALUES (?1, ?2)",
                params![book.id, language.id],
            )?;
        }
        for format in &book.formats {
            tx.execute(
                "INSERT INTO books_format (book_id, mime_type, url) VALUES (?1, ?2, ?3)",
                params![book.id, format.mime_type, format.url],
            )?;
        }
    }
    tx.commit()?;

    info!(path = %path.display(), books = books.len(), "imported catalog");
    Ok(books.len())
}

fn load_snapshot(conn: &Connection) -> Result<Vec<Book>, CatalogError> {
    let authors = load_entities(conn, "SELECT id, name, birth_year, death_year FROM books_author", |row| {
        Ok(Author {
            id: row.get(0)?,
            name: row.get(1)?,
            birth_year: row.get(2)?,
            death_year: row.get(3)?,
        })
    })?;
    let subjects = load_entities(conn, "SELECT id, name FROM books_subject", |row| {
        Ok(Subject {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    let bookshelves = load_entities(conn, "SELECT id, name FROM books_bookshelf", |row| {
        Ok(Bookshelf {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    let languages = load_entities(conn, "SELECT id, code FROM books_language", |row| {
        Ok(Language {
            id: row.get(0)?,
            code: row.get(1)?,
        })
    })?;

    let author_links = load_links(conn, "books_book_authors", "author_id")?;
    let subject_links = load_links(conn, "books_book_subjects", "subject_id")?;
    let bookshelf_links = load_links(conn, "books_book_bookshelves", "bookshelf_id")?;
    let language_links = load_links(conn, "books_book_languages", "language_id")?;

    let mut formats: HashMap<u32, Vec<Format>> = HashMap::new();
    let mut stmt =
        conn.prepare("SELECT book_id, mime_type, url FROM books_format ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            Format {
                mime_type: row.get(1)?,
                url: row.get(2)?,
            },
        ))
    })?;
    for row in rows {
        let (book_id, format) = row?;
        formats.entry(book_id).or_default().push(format);
    }

    let mut stmt =
        conn.prepare("SELECT id, title, download_count FROM books_book ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut books = Vec::new();
    for row in rows {
        let (id, title, download_count) = row?;
        books.push(Book {
            id,
            title,
            download_count: download_count.max(0) as u64,
            authors: joined(&author_links, &authors, id),
            subjects: joined(&subject_links, &subjects, id),
            bookshelves: joined(&bookshelf_links, &bookshelves, id),
            languages: joined(&language_links, &languages, id),
            formats: formats.remove(&id).unwrap_or_default(),
        });
    }
    Ok(books)
}

fn load_entities<T>(
    conn: &Connection,
    sql: &str,
    map: impl Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<HashMap<u32, T>, CatalogError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, u32>(0)?, map(row)?)))?;
    let mut out = HashMap::new();
    for row in rows {
        let (id, entity) = row?;
        out.insert(id, entity);
    }
    Ok(out)
}

/// Load a join table keyed by book id; rowid order preserves insertion
/// (and therefore catalog) order of the linked entities.
fn load_links(
    conn: &Connection,
    table: &str,
    column: &str,
) -> Result<HashMap<u32, Vec<u32>>, CatalogError> {
    let mut stmt =
        conn.prepare(&format!("SELECT book_id, {column} FROM {table} ORDER BY rowid"))?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, u32>(1)?))
    })?;
    let mut out: HashMap<u32, Vec<u32>> = HashMap::new();
    for row in rows {
        let (book_id, entity_id) = row?;
        out.entry(book_id).or_default().push(entity_id);
    }
    Ok(out)
}

fn joined<T: Clone>(
    links: &HashMap<u32, Vec<u32>>,
    entities: &HashMap<u32, T>,
    book_id: u32,
) -> Vec<T> {
    links
        .get(&book_id)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| entities.get(id).cloned())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_book() -> Book {
        Book {
            id: 84,
            title: "Frankenstein; Or, The Modern Prometheus".into(),
            download_count: 104393,
            authors: vec![Author {
                id: 35,
                name: "Shelley, Mary Wollstonecraft".into(),
                birth_year: Some(1797),
                death_year: Some(1851),
            }],
            subjects: vec![Subject {
                id: 3,
                name: "Gothic fiction".into(),
            }],
            bookshelves: vec![Bookshelf {
                id: 9,
                name: "Movie Books".into(),
            }],
            languages: vec![Language {
                id: 1,
                code: "en".into(),
            }],
            formats: vec![Format {
                mime_type: "text/plain; charset=us-ascii".into(),
                url: "https://www.gutenberg.org/files/84/84-0.txt".into(),
            }],
        }
    }

    #[test]
    fn import_then_open_round_trips_books() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("catalog.db");
        let book = sample_book();

        let written = import_books(&db, std::slice::from_ref(&book)).unwrap();
        assert_eq!(written, 1);

        let catalog = SqliteCatalog::open(&db).unwrap();
        assert_eq!(catalog.len(), 1);
        let books = catalog.books().unwrap();
        assert_eq!(books[0], book);
    }

    #[test]
    fn reimport_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("catalog.db");

        import_books(&db, &[sample_book()]).unwrap();
        let mut replacement = sample_book();
        replacement.id = 1342;
        replacement.title = "Pride and Prejudice".into();
        import_books(&db, &[replacement.clone()]).unwrap();

        let catalog = SqliteCatalog::open(&db).unwrap();
        let books = catalog.books().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, 1342);
        assert_eq!(books[0].title, "Pride and Prejudice");
    }

    #[test]
    fn open_missing_database_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = SqliteCatalog::open(&dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[test]
    fn author_order_survives_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("catalog.db");
        let mut book = sample_book();
        book.authors = vec![
            Author {
                id: 900,
                name: "Zeta, First".into(),
                birth_year: None,
                death_year: None,
            },
            Author {
                id: 100,
                name: "Alpha, Second".into(),
                birth_year: None,
                death_year: None,
            },
        ];

        import_books(&db, std::slice::from_ref(&book)).unwrap();
        let catalog = SqliteCatalog::open(&db).unwrap();
        let books = catalog.books().unwrap();
        let names: Vec<&str> = books[0].authors.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Zeta, First", "Alpha, Second"]);
    }
}
