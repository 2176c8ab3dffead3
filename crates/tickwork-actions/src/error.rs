//! Error types for tickwork-actions

use thiserror::Error;

/// Result type for tickwork-actions operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tickwork-actions
#[derive(Debug, Error)]
pub enum Error {
    /// The invalid tag sentinel was passed to a tag query
    #[error("invalid tag value {0}")]
    InvalidTag(i32),

    /// A flag query was issued with no bits set
    #[error("flags must have at least one bit set")]
    EmptyFlags,

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] tickwork_core::Error),
}
