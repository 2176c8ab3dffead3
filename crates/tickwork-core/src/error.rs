//! Error types for tickwork-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    /// A record with the same key is already present in the store
    #[error("Record already scheduled: {0}")]
    AlreadyScheduled(String),

    /// Configuration could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error while loading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
