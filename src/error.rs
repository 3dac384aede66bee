// Error types for pipeye.
// Covers GitHub API errors, cache I/O, log archive failures and configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipeyeError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("Missing GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Could not resolve a cache directory for this platform")]
    CacheDirUnavailable,

    #[error("Invalid repository name {0:?} (expected 'owner/repo')")]
    InvalidRepositoryName(String),

    #[error("Invalid GitHub Actions URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PipeyeError>;
