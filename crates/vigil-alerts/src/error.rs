//! Error types for the vigil-alerts crate.

use thiserror::Error;

/// Errors that can occur in the alert data model and rule engine.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Invalid alert rule configuration.
    #[error("invalid alert rule: {reason}")]
    InvalidRule {
        /// The reason the rule is invalid.
        reason: String,
    },

    /// Metric store error.
    #[error("metrics error: {0}")]
    MetricsError(#[from] vigil_metrics::MetricsError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_rule() {
        let err = AlertError::InvalidRule {
            reason: "empty id".to_string(),
        };
        assert_eq!(err.to_string(), "invalid alert rule: empty id");
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let alert_err: AlertError = json_err.unwrap_err().into();
        assert!(matches!(alert_err, AlertError::SerializationError(_)));
    }
}
