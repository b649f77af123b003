//! Error handling module
//!
//! Every marketplace operation either returns its data or fails with one of
//! these variants. Nothing is retried or recovered locally.

use thiserror::Error;

/// Library-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend operation failed ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Coarse classification handed to the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotAuthenticated,
    NotFound,
    BackendFailed,
    InvalidInput,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotAuthenticated(_) => ErrorKind::NotAuthenticated,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Backend { .. } | Error::Http(_) | Error::Decode(_) => ErrorKind::BackendFailed,
        }
    }
}

/// Result type alias for marketplace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Helper function to create a not found error
pub fn not_found(what: impl Into<String>) -> Error {
    Error::NotFound(what.into())
}

/// Helper function to create an invalid input error
pub fn invalid_input(msg: impl Into<String>) -> Error {
    Error::InvalidInput(msg.into())
}
