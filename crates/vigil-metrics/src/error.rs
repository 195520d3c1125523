//! Error types for the vigil-metrics crate.

use thiserror::Error;

/// Errors that can occur in the metric store.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The metric name is invalid (empty or contains invalid characters).
    #[error("invalid metric name: {reason}")]
    InvalidMetricName {
        /// The reason the name is invalid.
        reason: String,
    },

    /// The snapshot being imported is malformed.
    #[error("invalid snapshot: {reason}")]
    InvalidSnapshot {
        /// The reason the snapshot is invalid.
        reason: String,
    },
}

/// Result type for metric store operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_metric_name() {
        let err = MetricsError::InvalidMetricName {
            reason: "empty name".to_string(),
        };
        assert_eq!(err.to_string(), "invalid metric name: empty name");
    }

    #[test]
    fn error_display_invalid_snapshot() {
        let err = MetricsError::InvalidSnapshot {
            reason: "unordered samples".to_string(),
        };
        assert_eq!(err.to_string(), "invalid snapshot: unordered samples");
    }
}
