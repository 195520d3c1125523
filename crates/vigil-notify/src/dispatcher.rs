//! Notification fan-out.
//!
//! The dispatcher builds one payload per enabled channel and delivers them
//! concurrently through the configured transport. Channels are isolated:
//! one channel failing (or being misconfigured) never affects the others
//! and never fails the caller.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use vigil_alerts::{Alert, AlertCategory, ChannelConfig, ChannelKind, Severity};
use vigil_incidents::Incident;

use crate::payload::{NotificationContext, build_message};
use crate::transport::{LogTransport, NotificationTransport};

/// How a single channel's delivery ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum DispatchStatus {
    /// The transport accepted the message.
    Delivered,
    /// The channel was skipped (missing required configuration).
    Skipped,
    /// The transport reported a failure.
    Failed(String),
}

/// The per-channel result of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// The channel kind.
    pub kind: ChannelKind,
    /// The channel's name or id, when it has one.
    pub channel: Option<String>,
    /// How delivery ended.
    #[serde(flatten)]
    pub status: DispatchStatus,
}

impl DispatchOutcome {
    /// Returns true when the message was delivered.
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self.status, DispatchStatus::Delivered)
    }
}

/// Builds payloads and fans alerts out to notification channels.
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn NotificationTransport>,
    service: String,
    environment: String,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            transport,
            service: "vigil".to_string(),
            environment: "production".to_string(),
        }
    }

    /// Sets the service name stamped into payloads.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Sets the environment stamped into payloads.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Sends an alert to every enabled channel, concurrently.
    ///
    /// Disabled channels are filtered out and produce no outcome. A
    /// misconfigured channel yields a `Skipped` outcome, a transport
    /// failure a `Failed` one; neither stops the remaining channels.
    pub async fn dispatch(
        &self,
        alert: &Alert,
        channels: &[ChannelConfig],
        incident: Option<&Incident>,
    ) -> Vec<DispatchOutcome> {
        let enabled: Vec<&ChannelConfig> = channels.iter().filter(|c| c.enabled).collect();
        if enabled.is_empty() {
            debug!(alert_id = %alert.id, "no enabled notification channels");
            return Vec::new();
        }

        let ctx = NotificationContext {
            alert: alert.clone(),
            incident: incident.cloned(),
            service: self.service.clone(),
            environment: self.environment.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let deliveries = enabled.into_iter().map(|channel| {
            let ctx = &ctx;
            async move {
                let label = channel.name.clone().or_else(|| channel.id.clone());
                let Some(message) = build_message(channel, ctx) else {
                    return DispatchOutcome {
                        kind: channel.kind,
                        channel: label,
                        status: DispatchStatus::Skipped,
                    };
                };

                match self.transport.deliver(message).await {
                    Ok(()) => DispatchOutcome {
                        kind: channel.kind,
                        channel: label,
                        status: DispatchStatus::Delivered,
                    },
                    Err(err) => {
                        warn!(
                            kind = %channel.kind,
                            alert_id = %ctx.alert.id,
                            error = %err,
                            "notification delivery failed"
                        );
                        DispatchOutcome {
                            kind: channel.kind,
                            channel: label,
                            status: DispatchStatus::Failed(err.to_string()),
                        }
                    }
                }
            }
        });

        join_all(deliveries).await
    }

    /// Delivers a prebuilt message through the transport.
    ///
    /// Used for payloads that do not fit a channel shape, such as the
    /// escalation webhook envelope.
    ///
    /// # Errors
    ///
    /// Returns an error when delivery fails.
    pub async fn post(&self, message: crate::transport::OutboundMessage) -> crate::error::Result<()> {
        self.transport.deliver(message).await
    }

    /// Sends a synthetic test alert through one channel.
    ///
    /// Returns true when the delivery succeeded.
    pub async fn test_channel(&self, channel: &ChannelConfig) -> bool {
        let alert = Alert::manual(
            "Test Alert",
            "This is a test notification from the alerting system",
            Severity::Info,
            AlertCategory::SystemHealth,
            chrono::Utc::now().timestamp_millis(),
        );
        let outcomes = self.dispatch(&alert, std::slice::from_ref(channel), None).await;
        outcomes.first().is_some_and(DispatchOutcome::is_delivered)
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(LogTransport))
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("service", &self.service)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}
