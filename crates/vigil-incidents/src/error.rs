//! Error types for the vigil-incidents crate.

use thiserror::Error;

/// Errors that can occur while managing incidents.
///
/// Lookup misses and invalid lifecycle transitions are reported as
/// `bool`/`Option` on the relevant operations, not as errors.
#[derive(Debug, Error)]
pub enum IncidentError {
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for IncidentError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for incident operations.
pub type Result<T> = std::result::Result<T, IncidentError>;
