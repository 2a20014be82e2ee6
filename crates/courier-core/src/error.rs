//! Error types for the core layer.

use thiserror::Error;

/// Errors raised when installing a logging sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoggerError {
    /// No logger was supplied; the previous one stays active.
    #[error("logger is nil")]
    Missing,
}

/// Errors raised by entity helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// The entity carries no URL.
    #[error("entity has no url")]
    MissingUrl,

    /// The entity's URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type for logger operations.
pub type LoggerResult<T> = Result<T, LoggerError>;

/// Result type for entity helpers.
pub type EntityResult<T> = Result<T, EntityError>;
