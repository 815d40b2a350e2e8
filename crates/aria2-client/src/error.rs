//! Error types for the aria2 client.
//!
//! Most "not connected" paths in this crate do not produce errors at all: they
//! are reported through [`crate::SendOutcome`] and [`crate::CloseOutcome`] and
//! logged. The variants here cover the remaining failures: bad configuration,
//! transport start-up problems, and remote error envelopes converted by callers.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the aria2 client.
#[derive(Debug, Error)]
pub enum Aria2Error {
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("No async runtime available: {message}")]
    Runtime { message: String },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Remote error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Result type alias for aria2 client operations.
pub type Result<T> = std::result::Result<T, Aria2Error>;

impl From<std::io::Error> for Aria2Error {
    fn from(err: std::io::Error) -> Self {
        Aria2Error::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for Aria2Error {
    fn from(err: serde_json::Error) -> Self {
        Aria2Error::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl Aria2Error {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Aria2Error::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an invalid-URL error for the given input.
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Aria2Error::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Whether the error came from the remote daemon rather than this side.
    pub fn is_remote(&self) -> bool {
        matches!(self, Aria2Error::Rpc { .. })
    }
}
