//! Core types for the metric store.
//!
//! This module provides the fundamental types used throughout the
//! vigil-metrics crate:
//! - [`MetricSample`]: a single measurement with timestamp and value
//! - [`MetricName`]: a validated metric name
//! - [`Aggregate`]: aggregation functions over a time window

use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

/// Returns the current Unix timestamp in milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A single metric sample.
///
/// Samples are immutable once appended to a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// The measured value.
    pub value: f64,
}

impl MetricSample {
    /// Creates a new sample with the given timestamp and value.
    #[must_use]
    pub const fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Creates a new sample stamped with the current time.
    #[must_use]
    pub fn now(value: f64) -> Self {
        Self::new(now_millis(), value)
    }
}

/// A validated metric name.
///
/// Metric names must:
/// - Be non-empty
/// - Contain only alphanumeric characters, underscores, and colons
/// - Start with a letter or underscore
/// - Be at most 256 characters long
///
/// Series are keyed by exact string match; two distinct names never share
/// a series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricName(String);

impl MetricName {
    /// Maximum allowed length for a metric name.
    pub const MAX_LENGTH: usize = 256;

    /// Creates a new validated metric name.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidMetricName` if the name is invalid.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(MetricsError::InvalidMetricName {
                reason: "metric name cannot be empty".to_string(),
            });
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(MetricsError::InvalidMetricName {
                reason: format!(
                    "metric name exceeds maximum length of {} characters",
                    Self::MAX_LENGTH
                ),
            });
        }

        if let Some(c) = name.chars().next() {
            if !c.is_ascii_alphabetic() && c != '_' {
                return Err(MetricsError::InvalidMetricName {
                    reason: "metric name must start with a letter or underscore".to_string(),
                });
            }
        }

        for c in name.chars() {
            if !c.is_ascii_alphanumeric() && c != '_' && c != ':' {
                return Err(MetricsError::InvalidMetricName {
                    reason: format!("invalid character '{c}' in metric name"),
                });
            }
        }

        Ok(Self(name))
    }

    /// Returns the metric name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `MetricName` and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Aggregation functions over a window of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    /// Average (mean) of all values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Most recent value.
    Latest,
}

impl Aggregate {
    /// Applies this aggregation to a slice of values.
    ///
    /// Returns `None` if the slice is empty.
    #[must_use]
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        match self {
            Self::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::Latest => values.last().copied(),
        }
    }
}
