//! Health probing seam.
//!
//! The orchestrator's health loop drives a [`HealthProbe`] and records the
//! outcome as metrics, which in turn feed the rule engine. Probe
//! implementations are external collaborators (HTTP checks, database
//! pings); this crate only defines the contract and the failure sentinels.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Latency recorded for `api_response_time` when a probe fails, in
/// milliseconds. Matches the probe timeout contract.
pub const PROBE_FAILURE_LATENCY_MS: f64 = 30_000.0;

/// Timeout a probe implementation must bound itself to, in seconds.
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// The outcome of one health probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// End-to-end probe latency, milliseconds.
    pub latency_ms: f64,
    /// Whether the database check passed.
    pub database_healthy: bool,
    /// AI request success rate over the probe's sampling window, when the
    /// deployment has an AI service.
    pub ai_success_rate: Option<f64>,
}

/// Checks the health of the monitored system.
///
/// Implementations must bound their own latency to
/// [`PROBE_TIMEOUT_SECS`]; the health loop treats an error the same as a
/// timeout and records the failure sentinels.
pub trait HealthProbe: Send + Sync {
    /// Runs one probe against `endpoint`, the health endpoint path from
    /// the manager configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the system could not be reached in time.
    fn probe<'a>(
        &'a self,
        endpoint: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<HealthReport>> + Send + 'a>>;
}
