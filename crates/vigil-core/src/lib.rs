//! Alert manager orchestration for the Vigil alerting core.
//!
//! `vigil-core` ties the workspace together: the [`AlertManager`] records
//! metrics into a [`vigil_metrics::MetricStore`], evaluates them with a
//! [`vigil_alerts::RuleEngine`], correlates severe alerts into incidents,
//! fans notifications out through a
//! [`vigil_notify::NotificationDispatcher`], and runs the health-probe and
//! retention-cleanup background loops.
//!
//! # Example
//!
//! ```rust
//! use vigil_core::{AlertManager, ManualAlert};
//! use vigil_alerts::Severity;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = AlertManager::default();
//!
//! let alert = manager
//!     .send_alert(ManualAlert::new(
//!         "Disk filling up",
//!         "/var is at 92%",
//!         Severity::Warning,
//!     ))
//!     .await;
//!
//! assert!(manager.resolve_alert(&alert.id, Some("ops")));
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod health;
pub mod manager;

// Re-export main types at crate root
pub use config::{AlertManagerConfig, ConfigUpdate};
pub use error::{CoreError, Result};
pub use health::{HealthProbe, HealthReport, PROBE_FAILURE_LATENCY_MS, PROBE_TIMEOUT_SECS};
pub use manager::{
    AlertManager, AlertManagerBuilder, AlertStatistics, ExportData, ManualAlert,
    METRIC_AI_SUCCESS_RATE, METRIC_API_RESPONSE_TIME, METRIC_DATABASE_HEALTH, SYSTEM_RESOLVER,
};
