//! Error types for the vigil-notify crate.

use thiserror::Error;

/// Errors that can occur while delivering notifications.
///
/// Per-channel failures are caught by the dispatcher and surfaced as
/// [`crate::DispatchOutcome`]s; they never propagate to the caller.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport failed to deliver a message.
    #[error("transport error: {reason}")]
    Transport {
        /// What went wrong.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
