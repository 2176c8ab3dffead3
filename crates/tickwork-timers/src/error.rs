//! Error types for tickwork-timers

use thiserror::Error;

/// Result type for tickwork-timers operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tickwork-timers
#[derive(Debug, Error)]
pub enum Error {
    /// A timer was scheduled under an empty name
    #[error("timer key must not be empty")]
    EmptyTimerKey,

    /// The hand-off queue already holds its maximum number of functions
    #[error("hand-off queue is full ({capacity} pending)")]
    HandOffFull {
        /// Configured queue capacity
        capacity: usize,
    },

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] tickwork_core::Error),
}

// Remotes hand errors back across threads.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
