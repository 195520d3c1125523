//! Incident data model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vigil_alerts::{Alert, AlertCategory, Severity};

/// The lifecycle status of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    /// Newly created, accepting correlated alerts.
    Open,
    /// Under active investigation.
    Investigating,
    /// Resolved but kept for review.
    Resolved,
    /// Closed out.
    Closed,
}

impl IncidentStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Returns true for Resolved and Closed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of change a timeline entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAction {
    /// The incident was created.
    IncidentCreated,
    /// An alert was correlated into the incident.
    AlertAdded,
    /// The incident severity was raised by a higher-ranked alert.
    SeverityEscalated,
    /// The incident status changed.
    StatusChanged,
    /// The incident was assigned to someone.
    Assigned,
    /// A free-form note was added.
    NoteAdded,
}

/// A single append-only entry in an incident's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// When the change happened, epoch milliseconds.
    pub timestamp: i64,
    /// What kind of change this entry records.
    pub action: TimelineAction,
    /// Human-readable description of the change.
    pub description: String,
    /// Who made the change, when attributable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Structured detail about the change (old/new severity, alert id, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TimelineEntry {
    /// Creates a timeline entry with no user or metadata.
    #[must_use]
    pub fn new(timestamp: i64, action: TimelineAction, description: impl Into<String>) -> Self {
        Self {
            timestamp,
            action,
            description: description.into(),
            user: None,
            metadata: None,
        }
    }

    /// Attributes the entry to a user.
    #[must_use]
    pub fn by(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Attaches structured metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A group of correlated alerts with its own lifecycle and timeline.
///
/// Severity only ever rises (taking the maximum of the member alerts);
/// the timeline is append-only and gains exactly one entry per change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Short title, taken from the founding alert.
    pub title: String,
    /// Description, taken from the founding alert.
    pub description: String,
    /// Current severity: the maximum over member alerts.
    pub severity: Severity,
    /// Current lifecycle status.
    pub status: IncidentStatus,
    /// Member alerts in arrival order.
    pub alerts: Vec<Alert>,
    /// Current assignee, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Last modification time, epoch milliseconds.
    pub updated_at: i64,
    /// When the incident entered Resolved or Closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    /// Append-only change history.
    pub timeline: Vec<TimelineEntry>,
}

impl Incident {
    /// Creates a new open incident founded by `alert`.
    #[must_use]
    pub fn from_alert(alert: &Alert, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: alert.title.clone(),
            description: alert.description.clone(),
            severity: alert.severity,
            status: IncidentStatus::Open,
            alerts: vec![alert.clone()],
            assignee: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            timeline: vec![
                TimelineEntry::new(
                    now,
                    TimelineAction::IncidentCreated,
                    format!("Incident created from alert '{}'", alert.title),
                )
                .with_metadata(serde_json::json!({ "alert_id": alert.id })),
            ],
        }
    }

    /// The category of the founding alert.
    ///
    /// Correlation only ever groups alerts of one category, so this is the
    /// category of every member alert.
    #[must_use]
    pub fn category(&self) -> Option<AlertCategory> {
        self.alerts.first().map(|a| a.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_alerts::{AlertCategory, Severity};

    fn sample_alert() -> Alert {
        Alert::manual(
            "DB down",
            "database unreachable",
            Severity::Critical,
            AlertCategory::Database,
            1_000,
        )
    }

    #[test]
    fn from_alert_seeds_incident() {
        let alert = sample_alert();
        let incident = Incident::from_alert(&alert, 1_000);

        assert_eq!(incident.title, "DB down");
        assert_eq!(incident.severity, Severity::Critical);
        assert_eq!(incident.status, IncidentStatus::Open);
        assert_eq!(incident.alerts.len(), 1);
        assert_eq!(incident.category(), Some(AlertCategory::Database));
        assert_eq!(incident.timeline.len(), 1);
        assert_eq!(incident.timeline[0].action, TimelineAction::IncidentCreated);
    }

    #[test]
    fn incident_ids_are_unique() {
        let alert = sample_alert();
        let a = Incident::from_alert(&alert, 1_000);
        let b = Incident::from_alert(&alert, 1_000);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn status_is_terminal() {
        assert!(!IncidentStatus::Open.is_terminal());
        assert!(!IncidentStatus::Investigating.is_terminal());
        assert!(IncidentStatus::Resolved.is_terminal());
        assert!(IncidentStatus::Closed.is_terminal());
    }

    #[test]
    fn timeline_entry_builders() {
        let entry = TimelineEntry::new(5, TimelineAction::NoteAdded, "note")
            .by("ops")
            .with_metadata(serde_json::json!({ "k": "v" }));
        assert_eq!(entry.user.as_deref(), Some("ops"));
        assert!(entry.metadata.is_some());
    }

    #[test]
    fn incident_serialization_roundtrip() {
        let alert = sample_alert();
        let original = Incident::from_alert(&alert, 1_000);

        let json = serde_json::to_string(&original).unwrap();
        let parsed: Incident = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
