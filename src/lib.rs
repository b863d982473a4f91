pub mod config;
pub mod llm;
pub mod model;
pub mod search;
pub mod service;
pub mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::llm::http::HttpInference;
use crate::llm::summarize::Summarizer;
use crate::llm::translate::FilterTranslator;
use crate::llm::{DisabledInference, Inference, InferenceGate};
use crate::search::engine::SearchEngine;
use crate::service::BookService;
use crate::storage::sqlite::SqliteCatalog;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "gutensearch",
    version,
    about = "Filtered and natural-language search over a public-domain book catalog"
)]
pub struct Cli {
    /// Path to the SQLite catalog (defaults to platform data dir)
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a structured filter query
    Search {
        /// Exact catalog ids (repeatable)
        #[arg(long = "id")]
        ids: Vec<u32>,

        /// Language codes, e.g. en, fr (repeatable)
        #[arg(long)]
        language: Vec<String>,

        /// Format media type, exact or prefix, e.g. text/plain
        #[arg(long)]
        mime_type: Option<String>,

        /// Subject or bookshelf substring (repeatable)
        #[arg(long)]
        topic: Vec<String>,

        /// Author name substring (repeatable)
        #[arg(long)]
        author: Vec<String>,

        /// Title substring (repeatable)
        #[arg(long)]
        title: Vec<String>,

        /// relevance | download_count:desc | download_count:asc
        #[arg(long)]
        sort: Option<String>,

        /// Number of matches to skip
        #[arg(long, default_value_t = 0)]
        skip: i64,

        /// Max matches to return (clamped to 1..=100)
        #[arg(long, default_value_t = 25)]
        limit: i64,
    },
    /// Ask the catalog a question in natural language
    Chat {
        /// Free-text query, e.g. "top 6 french books"
        query: String,
    },
    /// Load a JSON book dump into the catalog, replacing its contents
    Import {
        /// Path to a JSON array of books
        file: PathBuf,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Commands::Search {
            ids,
            language,
            mime_type,
            topic,
            author,
            title,
            sort,
            skip,
            limit,
        } => {
            // Candidate built here is untrusted like any other; it goes
            // through the same validation as the translated path.
            let mut candidate = serde_json::Map::new();
            if !ids.is_empty() {
                candidate.insert("ids".into(), serde_json::json!(ids));
            }
            if !language.is_empty() {
                candidate.insert("language".into(), serde_json::json!(language));
            }
            if let Some(mime) = mime_type {
                candidate.insert("mime_type".into(), serde_json::json!(mime));
            }
            if !topic.is_empty() {
                candidate.insert("topic".into(), serde_json::json!(topic));
            }
            if !author.is_empty() {
                candidate.insert("author".into(), serde_json::json!(author));
            }
            if !title.is_empty() {
                candidate.insert("title".into(), serde_json::json!(title));
            }
            if let Some(sort) = sort {
                candidate.insert("sort".into(), serde_json::json!(sort));
            }
            candidate.insert("skip".into(), serde_json::json!(skip));
            candidate.insert("limit".into(), serde_json::json!(limit));

            let service = build_service(&config).await?;
            let result = service.search_books(&serde_json::Value::Object(candidate))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Chat { query } => {
            let service = build_service(&config).await?;
            let response = service.chat(&query).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Commands::Import { file } => {
            let data = std::fs::read_to_string(&file)
                .with_context(|| format!("read book dump {}", file.display()))?;
            let books: Vec<model::types::Book> = serde_json::from_str(&data)
                .with_context(|| format!("parse book dump {}", file.display()))?;
            let written = storage::sqlite::import_books(&config.db_path, &books)?;
            println!(
                "imported {written} books into {}",
                config.db_path.display()
            );
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "gutensearch", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Wire the service from config: catalog, inference backend, gate.
async fn build_service(config: &Config) -> Result<BookService> {
    let catalog = SqliteCatalog::open(&config.db_path)
        .with_context(|| format!("open catalog at {}", config.db_path.display()))?;
    let engine = SearchEngine::new(Arc::new(catalog));

    let backend: Arc<dyn Inference> = match &config.infer_url {
        Some(url) => {
            let http = HttpInference::new(url.clone(), config.infer_timeout)?;
            // The blocking HTTP client must stay off async worker threads,
            // probe included.
            let (http, availability) =
                tokio::task::spawn_blocking(move || {
                    let availability = http.probe();
                    (http, availability)
                })
                .await?;
            info!(status = %availability.summary(), "inference backend");
            Arc::new(http)
        }
        None => Arc::new(DisabledInference),
    };
    let gate = Arc::new(InferenceGate::new(
        backend,
        config.infer_permits,
        config.infer_timeout,
    ));

    Ok(BookService::new(
        engine,
        FilterTranslator::new(Arc::clone(&gate)),
        Summarizer::new(gate),
    ))
}

pub fn default_db_path() -> PathBuf {
    default_data_dir().join("catalog.db")
}

pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "gutensearch", "gutensearch")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
