//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping a bot process.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A global tracing subscriber is already installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    /// The log file could not be opened.
    #[error("Failed to open log file: {0}")]
    LogFile(#[from] tracing_appender::rolling::InitError),

    /// File output was requested without a path.
    #[error("File log output requires logging.file_path")]
    MissingLogFile,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
