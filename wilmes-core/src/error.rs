//! Error types for wilmes-core

use thiserror::Error;

/// Main error type for the wilmes-core library
#[derive(Error, Debug)]
pub enum Error {
    /// An expected element or attribute is missing from the page
    ///
    /// Usually means the portal changed its markup.
    #[error("unexpected page structure in {page}: {message}")]
    Structure { page: String, message: String },

    /// A value was found but could not be converted
    #[error("parse error: {0}")]
    Parse(String),

    /// An entity from one portal was handed to a session of another
    #[error("invalid origin: {found} (expected {expected})")]
    OriginMismatch { expected: String, found: String },

    /// Non-2xx response or network failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Login was rejected or produced an unexpected page
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a [`Error::Structure`] on the given page kind.
    pub fn structure(page: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Structure {
            page: page.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

/// Result type alias for wilmes-core
pub type Result<T> = std::result::Result<T, Error>;
