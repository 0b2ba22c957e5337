// ABOUTME: Error types with structured exit codes for CLI
// ABOUTME: Distinguishes fatal auth failures from per-item degradations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} on {url}: {message}")]
    Http {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Throttled after {attempts} attempts on {url}")]
    Throttled { url: String, attempts: u32 },

    #[error("Listing {endpoint} failed after {yielded} items: {source}")]
    Pagination {
        endpoint: String,
        yielded: usize,
        source: Box<Error>,
    },

    #[error("Media fetch failed for {resource}: {reason}")]
    MediaFetch { resource: String, reason: String },

    #[error("Write conflict: {} was already written during this run", .path.display())]
    WriteConflict { path: std::path::PathBuf },

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Interrupted")]
    Interrupted,
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Auth(_) => 2,
            Error::Network(_) => 3,
            Error::Http { .. } => 4,
            Error::Parse(_) => 5,
            Error::Filesystem(_) => 6,
            Error::Throttled { .. } => 7,
            Error::Pagination { .. } => 8,
            Error::MediaFetch { .. } => 9,
            Error::WriteConflict { .. } => 10,
            Error::Interrupted => 130,
        }
    }

    /// Only credential/permission failures abort a run; everything else is
    /// recorded at the smallest scope that can still make progress.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Auth(_) => true,
            Error::Http { status, .. } => matches!(status, 401 | 403),
            Error::Pagination { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
