//! api-fetcher: periodic multi-source HTTP fetcher
//!
//! This crate polls external URLs on independent schedules and dispatches the
//! responses to registered handlers through a single serialized worker.

pub mod config;
pub mod fetcher;
pub mod handlers;

use std::time::Duration;
use thiserror::Error;

/// Main error type for fetcher lifecycle operations
#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("Fetcher already started, handlers must be registered before run")]
    AlreadyStarted,

    #[error("Refresh interval for {url} must be greater than zero and at most one year")]
    InvalidRefreshInterval { url: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors returned by a fetch collaborator
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Response status: '{status}', body: '{body}'")]
    Status { url: String, status: u16, body: String },

    #[error("Request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
}

impl FetchError {
    /// Whether the fetch client may retry after this error
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request { source, .. } => source.is_timeout() || source.is_connect(),
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Timeout { .. } => true,
        }
    }
}

/// Outcome of a failed fetch-and-handle cycle
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Fetch: {0}")]
    Fetch(#[from] FetchError),

    #[error("Handle: {0:#}")]
    Handle(anyhow::Error),

    #[error("Fetch panic: {0}")]
    Panic(String),
}

/// Result type alias for fetcher operations
pub type Result<T> = std::result::Result<T, FetcherError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetcher::{build_fetcher, Fetch, Fetcher, FetcherState, Handler, HttpClient};
pub use handlers::LoggingHandler;
