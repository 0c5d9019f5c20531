use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    // Fetch errors — recovered locally inside the fan-out, never propagated
    // past a single source's fetch.
    #[error("source unreachable: {0}")]
    SourceUnreachable(String),

    #[error("unsupported source kind: {0}")]
    UnsupportedSourceKind(String),

    #[error("feed parsing failed: {0}")]
    FeedParse(String),

    // Request errors — surfaced to the caller.
    #[error("article not found: {0}")]
    ArticleNotFound(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Infrastructure errors.
    #[error("database error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
