//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("model '{0}' not found in catalog")]
    NotFound(String),

    #[error("model '{0}' is not supported")]
    UnsupportedModel(String),

    #[error("{0}")]
    Remote(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Model catalog error: {0}")]
    Catalog(String),

    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// True for failures reported by (or on the way to) the prediction service.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote(_) | Error::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
