//! SQLite-backed persistence for sources, articles, and summaries.
//!
//! The connection lives behind an `Arc<Mutex<_>>`; every call takes the lock
//! for the duration of one short synchronous statement. Article identity is
//! the canonical URL: `save_articles` is idempotent per URL and first write
//! wins.

mod articles;
mod sources;
mod summaries;

pub use articles::{SaveOutcome, StoreStats};

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{EngineError, EngineResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    kind TEXT NOT NULL,
    category TEXT NOT NULL,
    language TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_update TEXT
);

CREATE TABLE IF NOT EXISTS articles (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    content TEXT,
    url TEXT NOT NULL UNIQUE,
    source_id TEXT NOT NULL,
    published_at TEXT NOT NULL,
    category TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    image_url TEXT,
    author TEXT,
    FOREIGN KEY (source_id) REFERENCES sources(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_articles_url ON articles(url);
CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
CREATE INDEX IF NOT EXISTS idx_articles_category ON articles(category);

CREATE TABLE IF NOT EXISTS summaries (
    article_id TEXT PRIMARY KEY,
    summary_text TEXT NOT NULL,
    key_points TEXT NOT NULL DEFAULT '[]',
    sentiment TEXT NOT NULL,
    impact TEXT NOT NULL,
    related_topics TEXT NOT NULL DEFAULT '[]',
    FOREIGN KEY (article_id) REFERENCES articles(id) ON DELETE CASCADE
);
"#;

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn connection(&self) -> Result<MutexGuard<'_, Connection>, EngineError> {
        self.conn
            .lock()
            .map_err(|_| EngineError::Persistence(rusqlite::Error::InvalidQuery))
    }
}

/// One canonical timestamp format for every stored datetime so that string
/// comparison in SQL matches chronological order.
pub(crate) fn format_ts(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

pub(crate) fn parse_ts(s: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|_| chrono::Utc::now())
}
