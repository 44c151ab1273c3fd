//! Error types for styleweld

use thiserror::Error;

/// Main error type for inlining operations
#[derive(Debug, Error)]
pub enum InlineError {
    /// Writing the output failed, usually because the target buffer is too small
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// An external stylesheet could not be retrieved or was empty
    #[error("Missing stylesheet: {location} ({reason})")]
    MissingStylesheet {
        /// Resolved location of the stylesheet
        location: String,
        /// Why retrieval failed
        reason: FetchError,
    },
    /// A stylesheet reference or base URL is malformed or uses a disallowed scheme
    #[error("Invalid URL `{url}`: {reason}")]
    InvalidUrl {
        /// The offending URL text
        url: String,
        /// Human-readable reason
        reason: String,
    },
    /// A stylesheet cache was requested with a non-positive capacity
    #[error("Invalid cache size {0}: cache size must be greater than zero")]
    InvalidCacheSize(usize),
    /// The input markup could not be processed (e.g. a broken `style` attribute)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl InlineError {
    /// Build an `InvalidUrl` error
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `MissingStylesheet` error
    pub fn missing_stylesheet(location: impl Into<String>, reason: FetchError) -> Self {
        Self::MissingStylesheet {
            location: location.into(),
            reason,
        }
    }
}

/// Errors reported by stylesheet fetchers
#[derive(Debug, Error)]
pub enum FetchError {
    /// The resource does not exist
    #[error("not found")]
    NotFound,
    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),
    /// The resource exists but has no content
    #[error("empty response")]
    Empty,
    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),
    /// Filesystem failure other than a missing file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The fetcher does not handle this kind of location
    #[error("unsupported location: {0}")]
    Unsupported(String),
}

/// Convenience Result type for inlining operations
pub type Result<T> = std::result::Result<T, InlineError>;
