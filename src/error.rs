//! Error handling and custom error types
//!
//! Provides unified error handling across the worker using thiserror. Errors
//! are split into startup-fatal ones, which stop the poll loop before it
//! issues any request, and per-iteration ones, which are logged and skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("AI auth key not found in configuration")]
    MissingCredential,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid image payload: {0}")]
    Payload(String),
}

impl Error {
    /// Whether the poll loop must stop instead of moving on to the next
    /// iteration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingCredential | Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
