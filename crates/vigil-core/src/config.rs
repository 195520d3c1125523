//! Alert manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the [`crate::AlertManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertManagerConfig {
    /// Master switch: when false the background loops are not started.
    pub enabled: bool,
    /// Default cooldown applied to rules created without one.
    pub default_cooldown: Duration,
    /// Default escalation delay applied to rules created without one.
    pub default_escalation_delay: Duration,
    /// How long resolved and historic alerts are retained.
    pub alert_retention: Duration,
    /// How long resolved and closed incidents are retained.
    pub incident_retention: Duration,
    /// Age after which an unhandled active alert is force-resolved.
    pub stale_alert_threshold: Duration,
    /// Interval between health probe ticks.
    pub health_check_interval: Duration,
    /// Interval between cleanup ticks.
    pub cleanup_interval: Duration,
    /// Hard cap on retained alerts; the oldest are evicted beyond it.
    pub max_alerts: usize,
    /// Endpoint path handed to the health probe on every tick.
    pub health_endpoint: String,
    /// Webhook notified on alert escalation, when set.
    pub escalation_webhook: Option<String>,
    /// Service name stamped into notifications.
    pub service: String,
    /// Deployment environment stamped into notifications.
    pub environment: String,
}

impl Default for AlertManagerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_cooldown: Duration::from_secs(5 * 60),
            default_escalation_delay: Duration::from_secs(15 * 60),
            alert_retention: Duration::from_secs(7 * 24 * 60 * 60),
            incident_retention: Duration::from_secs(30 * 24 * 60 * 60),
            stale_alert_threshold: Duration::from_secs(24 * 60 * 60),
            health_check_interval: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(60 * 60),
            max_alerts: 1000,
            health_endpoint: "/api/health".to_string(),
            escalation_webhook: None,
            service: "vigil".to_string(),
            environment: "production".to_string(),
        }
    }
}

impl AlertManagerConfig {
    /// Applies a partial update, overriding only the fields it carries.
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(v) = update.default_cooldown {
            self.default_cooldown = v;
        }
        if let Some(v) = update.default_escalation_delay {
            self.default_escalation_delay = v;
        }
        if let Some(v) = update.alert_retention {
            self.alert_retention = v;
        }
        if let Some(v) = update.incident_retention {
            self.incident_retention = v;
        }
        if let Some(v) = update.stale_alert_threshold {
            self.stale_alert_threshold = v;
        }
        if let Some(v) = update.health_check_interval {
            self.health_check_interval = v;
        }
        if let Some(v) = update.cleanup_interval {
            self.cleanup_interval = v;
        }
        if let Some(v) = update.max_alerts {
            self.max_alerts = v;
        }
        if let Some(v) = update.health_endpoint {
            self.health_endpoint = v;
        }
        if let Some(v) = update.escalation_webhook {
            self.escalation_webhook = v;
        }
        if let Some(v) = update.service {
            self.service = v;
        }
        if let Some(v) = update.environment {
            self.environment = v;
        }
    }
}

/// A partial override of [`AlertManagerConfig`]; unset fields keep their
/// current value. `escalation_webhook` is doubly optional so an update can
/// clear it with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// Override for the master switch.
    pub enabled: Option<bool>,
    /// Override for the default cooldown.
    pub default_cooldown: Option<Duration>,
    /// Override for the default escalation delay.
    pub default_escalation_delay: Option<Duration>,
    /// Override for the alert retention period.
    pub alert_retention: Option<Duration>,
    /// Override for the incident retention period.
    pub incident_retention: Option<Duration>,
    /// Override for the stale alert threshold.
    pub stale_alert_threshold: Option<Duration>,
    /// Override for the health check interval.
    pub health_check_interval: Option<Duration>,
    /// Override for the cleanup interval.
    pub cleanup_interval: Option<Duration>,
    /// Override for the alert cap.
    pub max_alerts: Option<usize>,
    /// Override for the health endpoint path.
    pub health_endpoint: Option<String>,
    /// Override for the escalation webhook; `Some(None)` clears it.
    pub escalation_webhook: Option<Option<String>>,
    /// Override for the service name.
    pub service: Option<String>,
    /// Override for the environment name.
    pub environment: Option<String>,
}
