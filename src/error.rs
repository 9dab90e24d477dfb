//! NeuroGraph error types

use thiserror::Error;

/// NeuroGraph error type
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected input (bad artifact kind or mime type)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote semantic service failure.
    ///
    /// Produced by gateway implementations and absorbed by the resilient
    /// wrappers in [`crate::extraction`]; never returned from ingestion.
    #[error("Gateway degraded: {0}")]
    Gateway(String),

    /// Live voice transport fault
    #[error("Transport fault: {0}")]
    Transport(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lookup of an unknown node or source
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for NeuroGraph operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error is a caller-facing validation rejection
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
