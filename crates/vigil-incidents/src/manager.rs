//! Incident correlation and lifecycle management.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use vigil_alerts::{Alert, AlertCategory, Severity};

use crate::types::{Incident, IncidentStatus, TimelineAction, TimelineEntry};

/// Configuration for the incident manager.
#[derive(Debug, Clone)]
pub struct IncidentManagerConfig {
    /// How far back an open incident may have been created and still
    /// absorb a new alert of its category.
    pub correlation_window: Duration,
    /// Hard cap on retained incidents; enforced by [`IncidentManager::cleanup_old`].
    pub max_incidents: usize,
}

impl Default for IncidentManagerConfig {
    fn default() -> Self {
        Self {
            correlation_window: Duration::from_secs(60 * 60),
            max_incidents: 1000,
        }
    }
}

/// Groups alerts into incidents and tracks their lifecycle.
///
/// Cheap to clone; all clones share the same incident map.
#[derive(Debug)]
pub struct IncidentManager {
    config: IncidentManagerConfig,
    incidents: Arc<RwLock<HashMap<String, Incident>>>,
}

impl IncidentManager {
    /// Default age after which open incidents are auto-resolved: 24 hours.
    pub const DEFAULT_STALE_AGE: Duration = Duration::from_secs(24 * 60 * 60);

    /// Default retention for resolved and closed incidents: 30 days.
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// Creates an incident manager with the given configuration.
    #[must_use]
    pub fn new(config: IncidentManagerConfig) -> Self {
        Self {
            config,
            incidents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &IncidentManagerConfig {
        &self.config
    }

    /// Correlates an alert into an incident, creating one when no open
    /// incident of the alert's category exists within the correlation
    /// window. Returns the affected incident.
    ///
    /// Joining an existing incident appends an `alert_added` timeline
    /// entry, and a `severity_escalated` entry when the alert outranks the
    /// incident's current severity. Severity never decreases.
    pub fn record_alert(&self, alert: &Alert, now: i64) -> Incident {
        let window_ms = self.config.correlation_window.as_millis() as i64;
        let mut incidents = self.incidents.write();

        let existing_id = incidents
            .values()
            .find(|incident| {
                incident.status == IncidentStatus::Open
                    && incident.category() == Some(alert.category)
                    && now - incident.created_at <= window_ms
            })
            .map(|incident| incident.id.clone());

        if let Some(id) = existing_id {
            let incident = incidents
                .get_mut(&id)
                .unwrap_or_else(|| unreachable!("id was just found in the map"));

            incident.alerts.push(alert.clone());
            incident.timeline.push(
                TimelineEntry::new(
                    now,
                    TimelineAction::AlertAdded,
                    format!("Alert '{}' added to incident", alert.title),
                )
                .with_metadata(serde_json::json!({ "alert_id": alert.id })),
            );

            if alert.severity > incident.severity {
                let old = incident.severity;
                incident.severity = alert.severity;
                incident.timeline.push(
                    TimelineEntry::new(
                        now,
                        TimelineAction::SeverityEscalated,
                        format!("Severity escalated from {old} to {}", alert.severity),
                    )
                    .with_metadata(serde_json::json!({
                        "from": old,
                        "to": alert.severity,
                        "alert_id": alert.id,
                    })),
                );
                info!(
                    incident_id = %incident.id,
                    from = %old,
                    to = %alert.severity,
                    "incident severity escalated"
                );
            }

            incident.updated_at = now;
            debug!(incident_id = %incident.id, alert_id = %alert.id, "alert correlated into incident");
            return incident.clone();
        }

        let incident = Incident::from_alert(alert, now);
        info!(
            incident_id = %incident.id,
            alert_id = %alert.id,
            category = %alert.category,
            "incident created"
        );
        incidents.insert(incident.id.clone(), incident.clone());
        incident
    }

    /// Changes an incident's status, stamping `resolved_at` when entering
    /// Resolved or Closed.
    ///
    /// Returns `false` when the incident does not exist.
    pub fn update_status(
        &self,
        id: &str,
        status: IncidentStatus,
        user: Option<&str>,
        notes: Option<&str>,
        now: i64,
    ) -> bool {
        let mut incidents = self.incidents.write();
        let Some(incident) = incidents.get_mut(id) else {
            return false;
        };

        let old = incident.status;
        incident.status = status;
        incident.updated_at = now;
        if status.is_terminal() && incident.resolved_at.is_none() {
            incident.resolved_at = Some(now);
        }

        let description = match notes {
            Some(notes) => format!("Status changed from {old} to {status}: {notes}"),
            None => format!("Status changed from {old} to {status}"),
        };
        let mut entry = TimelineEntry::new(now, TimelineAction::StatusChanged, description)
            .with_metadata(serde_json::json!({ "from": old, "to": status }));
        if let Some(user) = user {
            entry = entry.by(user);
        }
        incident.timeline.push(entry);

        info!(incident_id = %id, from = %old, to = %status, "incident status changed");
        true
    }

    /// Assigns an incident to someone.
    ///
    /// Returns `false` when the incident does not exist.
    pub fn assign(&self, id: &str, assignee: &str, user: Option<&str>, now: i64) -> bool {
        let mut incidents = self.incidents.write();
        let Some(incident) = incidents.get_mut(id) else {
            return false;
        };

        incident.assignee = Some(assignee.to_string());
        incident.updated_at = now;
        let mut entry = TimelineEntry::new(
            now,
            TimelineAction::Assigned,
            format!("Incident assigned to {assignee}"),
        );
        if let Some(user) = user {
            entry = entry.by(user);
        }
        incident.timeline.push(entry);

        info!(incident_id = %id, assignee = %assignee, "incident assigned");
        true
    }

    /// Appends a free-form note to an incident's timeline.
    ///
    /// Returns `false` when the incident does not exist.
    pub fn add_note(&self, id: &str, note: &str, user: Option<&str>, now: i64) -> bool {
        let mut incidents = self.incidents.write();
        let Some(incident) = incidents.get_mut(id) else {
            return false;
        };

        incident.updated_at = now;
        let mut entry = TimelineEntry::new(now, TimelineAction::NoteAdded, note);
        if let Some(user) = user {
            entry = entry.by(user);
        }
        incident.timeline.push(entry);
        true
    }

    /// Resolves open incidents whose `created_at` is older than `max_age`,
    /// attributed to the `system` actor. Returns how many were resolved.
    pub fn auto_resolve_stale(&self, max_age: Duration, now: i64) -> usize {
        let cutoff = now - max_age.as_millis() as i64;
        let stale: Vec<String> = {
            let incidents = self.incidents.read();
            incidents
                .values()
                .filter(|i| i.status == IncidentStatus::Open && i.created_at < cutoff)
                .map(|i| i.id.clone())
                .collect()
        };

        for id in &stale {
            self.update_status(
                id,
                IncidentStatus::Resolved,
                Some("system"),
                Some("Auto-resolved: no activity within the stale threshold"),
                now,
            );
        }

        if !stale.is_empty() {
            info!(count = stale.len(), "auto-resolved stale incidents");
        }
        stale.len()
    }

    /// Evicts resolved and closed incidents not updated since `now -
    /// max_age`, then enforces `max_incidents` by evicting the incidents
    /// with the oldest `updated_at` regardless of status. Returns how many
    /// were removed.
    pub fn cleanup_old(&self, max_age: Duration, now: i64) -> usize {
        let cutoff = now - max_age.as_millis() as i64;
        let mut incidents = self.incidents.write();
        let before = incidents.len();

        incidents.retain(|_, i| !(i.status.is_terminal() && i.updated_at < cutoff));

        if incidents.len() > self.config.max_incidents {
            let excess = incidents.len() - self.config.max_incidents;
            let mut by_age: Vec<(String, i64)> = incidents
                .values()
                .map(|i| (i.id.clone(), i.updated_at))
                .collect();
            by_age.sort_by_key(|(_, updated_at)| *updated_at);
            for (id, _) in by_age.into_iter().take(excess) {
                incidents.remove(&id);
            }
        }

        let removed = before - incidents.len();
        if removed > 0 {
            info!(removed, "cleaned up old incidents");
        }
        removed
    }

    /// Returns an incident by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Incident> {
        self.incidents.read().get(id).cloned()
    }

    /// Returns all incidents.
    #[must_use]
    pub fn list(&self) -> Vec<Incident> {
        self.incidents.read().values().cloned().collect()
    }

    /// Returns all incidents that are not resolved or closed.
    #[must_use]
    pub fn open_incidents(&self) -> Vec<Incident> {
        self.incidents
            .read()
            .values()
            .filter(|i| !i.status.is_terminal())
            .cloned()
            .collect()
    }

    /// Returns all incidents of the given severity.
    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<Incident> {
        self.incidents
            .read()
            .values()
            .filter(|i| i.severity == severity)
            .cloned()
            .collect()
    }

    /// Returns all incidents of the given category.
    #[must_use]
    pub fn by_category(&self, category: AlertCategory) -> Vec<Incident> {
        self.incidents
            .read()
            .values()
            .filter(|i| i.category() == Some(category))
            .cloned()
            .collect()
    }

    /// Returns all incidents assigned to the given assignee.
    #[must_use]
    pub fn by_assignee(&self, assignee: &str) -> Vec<Incident> {
        self.incidents
            .read()
            .values()
            .filter(|i| i.assignee.as_deref() == Some(assignee))
            .cloned()
            .collect()
    }

    /// Returns the number of retained incidents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.read().len()
    }

    /// Returns true when no incidents are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.read().is_empty()
    }
}

impl Default for IncidentManager {
    fn default() -> Self {
        Self::new(IncidentManagerConfig::default())
    }
}

impl Clone for IncidentManager {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            incidents: Arc::clone(&self.incidents),
        }
    }
}
