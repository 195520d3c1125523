//! Incident correlation and lifecycle tracking for the Vigil alerting core.
//!
//! `vigil-incidents` groups related alerts into incidents: alerts of the
//! same category arriving within a correlation window land in the same open
//! incident, escalating its severity monotonically. Every incident carries
//! an append-only timeline recording each change.
//!
//! # Example
//!
//! ```rust
//! use vigil_alerts::{Alert, AlertCategory, Severity};
//! use vigil_incidents::{IncidentManager, IncidentStatus};
//!
//! let manager = IncidentManager::default();
//!
//! let alert = Alert::manual(
//!     "DB down",
//!     "database unreachable",
//!     Severity::Critical,
//!     AlertCategory::Database,
//!     1_000,
//! );
//!
//! let incident = manager.record_alert(&alert, 1_000);
//! assert_eq!(incident.status, IncidentStatus::Open);
//! assert_eq!(incident.alerts.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod manager;
pub mod types;

// Re-export main types at crate root
pub use error::{IncidentError, Result};
pub use manager::{IncidentManager, IncidentManagerConfig};
pub use types::{Incident, IncidentStatus, TimelineAction, TimelineEntry};
