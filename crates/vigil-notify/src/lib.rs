//! Notification payload construction and dispatch for the Vigil alerting
//! core.
//!
//! `vigil-notify` turns alerts into provider-specific payloads (Slack,
//! email, SMS, webhook, PagerDuty) and fans them out concurrently through
//! a [`NotificationTransport`]. The transport is the only outbound seam;
//! the default [`LogTransport`] logs payloads instead of sending them.
//!
//! # Example
//!
//! ```rust
//! use vigil_alerts::{Alert, AlertCategory, ChannelConfig, ChannelKind, Severity};
//! use vigil_notify::NotificationDispatcher;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let dispatcher = NotificationDispatcher::default();
//!
//! let alert = Alert::manual(
//!     "High latency",
//!     "API latency above SLO",
//!     Severity::Warning,
//!     AlertCategory::ApiPerformance,
//!     1_000,
//! );
//! let channels = vec![ChannelConfig::new(ChannelKind::Webhook)
//!     .option("url", serde_json::json!("https://example.com/hook"))];
//!
//! let outcomes = dispatcher.dispatch(&alert, &channels, None).await;
//! assert!(outcomes[0].is_delivered());
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod transport;

// Re-export main types at crate root
pub use dispatcher::{DispatchOutcome, DispatchStatus, NotificationDispatcher};
pub use error::{NotifyError, Result};
pub use payload::{NotificationContext, severity_color};
pub use transport::{LogTransport, NotificationTransport, OutboundMessage};
