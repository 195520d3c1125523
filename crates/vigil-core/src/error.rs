//! Error types for the vigil-core crate.

use thiserror::Error;

/// Errors that can occur in the alert manager.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Metric store error.
    #[error("metrics error: {0}")]
    Metrics(#[from] vigil_metrics::MetricsError),

    /// Alert rule or data-model error.
    #[error("alert error: {0}")]
    Alerts(#[from] vigil_alerts::AlertError),

    /// Notification delivery error.
    #[error("notification error: {0}")]
    Notify(#[from] vigil_notify::NotifyError),

    /// A health probe failed or timed out.
    #[error("health probe failed: {reason}")]
    Probe {
        /// What went wrong.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for alert manager operations.
pub type Result<T> = std::result::Result<T, CoreError>;
