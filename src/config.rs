//! Environment-driven configuration.
//!
//! Settings load from the process environment (a `.env` file is honored)
//! with working defaults; CLI flags override on top.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite catalog database.
    pub db_path: PathBuf,
    /// Completion server base URL; `None` disables inference and the chat
    /// path serves degraded listings.
    pub infer_url: Option<String>,
    /// Per-call inference timeout.
    pub infer_timeout: Duration,
    /// Size of the inference concurrency gate.
    pub infer_permits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: crate::default_db_path(),
            infer_url: None,
            infer_timeout: Duration::from_secs(30),
            infer_permits: 1,
        }
    }
}

impl Config {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Ok(path) = dotenvy::var("GUTENSEARCH_DB") {
            cfg.db_path = PathBuf::from(path);
        }

        if let Ok(url) = dotenvy::var("GUTENSEARCH_INFER_URL")
            && !url.trim().is_empty()
        {
            cfg.infer_url = Some(url.trim().to_string());
        }

        if let Ok(val) = dotenvy::var("GUTENSEARCH_INFER_TIMEOUT_SECS")
            && let Ok(secs) = val.parse()
        {
            cfg.infer_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = dotenvy::var("GUTENSEARCH_INFER_PERMITS")
            && let Ok(n) = val.parse::<usize>()
        {
            cfg.infer_permits = n.max(1);
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_inference() {
        let cfg = Config::default();
        assert!(cfg.infer_url.is_none());
        assert_eq!(cfg.infer_permits, 1);
        assert_eq!(cfg.infer_timeout, Duration::from_secs(30));
    }
}
