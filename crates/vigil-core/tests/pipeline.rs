//! End-to-end pipeline tests: metric in, notification out.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use vigil_alerts::{
    AlertCondition, AlertRule, AlertStatus, Comparison, RuleEngine, Severity, Threshold,
};
use vigil_core::{
    AlertManager, AlertManagerConfig, HealthProbe, HealthReport, ManualAlert,
    PROBE_FAILURE_LATENCY_MS,
};
use vigil_incidents::TimelineAction;
use vigil_metrics::{MetricName, now_millis};
use vigil_notify::{NotificationTransport, OutboundMessage};

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingTransport {
    fn destinations(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.destination.clone()).collect()
    }
}

impl NotificationTransport for RecordingTransport {
    fn deliver<'a>(
        &'a self,
        message: OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = vigil_notify::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.sent.lock().push(message);
            Ok(())
        })
    }
}

struct FailingProbe;

impl HealthProbe for FailingProbe {
    fn probe<'a>(
        &'a self,
        _endpoint: &'a str,
    ) -> Pin<Box<dyn Future<Output = vigil_core::Result<HealthReport>> + Send + 'a>> {
        Box::pin(async {
            Err(vigil_core::CoreError::Probe {
                reason: "connection timed out".to_string(),
            })
        })
    }
}

#[derive(Default)]
struct HealthyProbe {
    endpoints: Mutex<Vec<String>>,
}

impl HealthProbe for HealthyProbe {
    fn probe<'a>(
        &'a self,
        endpoint: &'a str,
    ) -> Pin<Box<dyn Future<Output = vigil_core::Result<HealthReport>> + Send + 'a>> {
        Box::pin(async move {
            self.endpoints.lock().push(endpoint.to_string());
            Ok(HealthReport {
                latency_ms: 250.0,
                database_healthy: true,
                ai_success_rate: Some(0.98),
            })
        })
    }
}

fn latency() -> MetricName {
    MetricName::new("api_response_time").unwrap()
}

#[tokio::test]
async fn critical_latency_end_to_end() {
    let transport = Arc::new(RecordingTransport::default());
    let manager = AlertManager::builder()
        .transport(Arc::clone(&transport) as _)
        .build();

    // First breach: the built-in critical rule wants two consecutive
    // breaching samples, so nothing fires yet.
    let fired = manager.record_metric_at(&latency(), 16_000.0, 1_000).await;
    assert!(fired.is_empty());

    // Second breach inside the window fires the critical rule.
    let fired = manager.record_metric_at(&latency(), 16_000.0, 60_000).await;
    assert_eq!(fired.len(), 1);
    let alert = &fired[0];
    assert_eq!(alert.id, "critical_api_response_time_60000");
    assert_eq!(alert.severity, Severity::Critical);

    // Stored, active, correlated into an incident, notified.
    assert_eq!(manager.active_alerts().len(), 1);
    let incidents = manager.incidents().open_incidents();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].severity, Severity::Critical);
    assert_eq!(incidents[0].alerts[0].id, alert.id);

    // The founding alert leaves a single creation entry on the timeline.
    assert_eq!(incidents[0].timeline.len(), 1);
    assert_eq!(incidents[0].timeline[0].action, TimelineAction::IncidentCreated);

    let destinations = transport.destinations();
    assert_eq!(destinations, vec!["slack:#alerts-critical".to_string()]);

    // Cooldown: an immediate third breach does not fire again.
    let fired = manager.record_metric_at(&latency(), 16_000.0, 61_000).await;
    assert!(fired.is_empty());

    manager.shutdown();
}

#[tokio::test]
async fn manual_alert_round_trip() {
    let transport = Arc::new(RecordingTransport::default());
    let manager = AlertManager::builder()
        .transport(Arc::clone(&transport) as _)
        .build();

    let alert = manager
        .send_alert(
            ManualAlert::new("Disk filling up", "/var is at 92%", Severity::Warning),
        )
        .await;

    assert!(alert.id.starts_with("manual_"));
    assert_eq!(alert.source, "Manual");

    // Stored and active; warnings do not create incidents.
    assert_eq!(manager.active_alerts().len(), 1);
    assert!(manager.incidents().is_empty());

    // Notified through the default channel for its severity.
    assert_eq!(transport.destinations(), vec!["slack:#alerts".to_string()]);

    // Resolve completes the round trip; the alert stays visible in
    // history.
    assert!(manager.resolve_alert(&alert.id, Some("ops")));
    assert!(manager.active_alerts().is_empty());

    let history = manager.alert_history(None);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, alert.id);
    assert!(history[0].resolved);

    let stats = manager.statistics();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.active, 0);
}

#[tokio::test(start_paused = true)]
async fn escalation_timer_fires_after_delay() {
    let transport = Arc::new(RecordingTransport::default());
    let rule = AlertRule::builder(
        "r1",
        "High latency",
        AlertCondition::new(latency(), Comparison::Gt, Threshold::Number(100.0), 300_000),
    )
    .severity(Severity::Critical)
    .escalation_delay_ms(5_000)
    .build()
    .unwrap();
    let manager = AlertManager::builder()
        .engine(RuleEngine::with_rules([rule]))
        .transport(Arc::clone(&transport) as _)
        .build();

    let fired = manager.record_metric_at(&latency(), 150.0, 1_000).await;
    let id = fired[0].id.clone();
    assert!(!manager.get_alert(&id).unwrap().escalated);

    // Let the one-shot timer elapse under paused time.
    tokio::time::sleep(Duration::from_millis(5_100)).await;

    let alert = manager.get_alert(&id).unwrap();
    assert!(alert.escalated);
    assert_eq!(alert.status, AlertStatus::Escalated);

    // Escalation notified the oncall and management channels.
    let destinations = transport.destinations();
    assert!(destinations.contains(&"slack:#oncall".to_string()));
    assert!(destinations.contains(&"slack:#management-alerts".to_string()));
}

#[tokio::test(start_paused = true)]
async fn resolving_cancels_pending_escalation() {
    let rule = AlertRule::builder(
        "r1",
        "High latency",
        AlertCondition::new(latency(), Comparison::Gt, Threshold::Number(100.0), 300_000),
    )
    .severity(Severity::Critical)
    .escalation_delay_ms(5_000)
    .build()
    .unwrap();
    let manager = AlertManager::builder()
        .engine(RuleEngine::with_rules([rule]))
        .build();

    let fired = manager.record_metric_at(&latency(), 150.0, 1_000).await;
    let id = fired[0].id.clone();

    assert!(manager.resolve_alert(&id, Some("ops")));
    tokio::time::sleep(Duration::from_millis(10_000)).await;

    let alert = manager.get_alert(&id).unwrap();
    assert!(!alert.escalated);
    assert_eq!(alert.status, AlertStatus::Resolved);
}

#[tokio::test]
async fn failed_probe_records_sentinels() {
    let manager = AlertManager::builder().probe(Arc::new(FailingProbe)).build();

    manager.health_tick().await;

    let store = manager.metrics();
    let db = MetricName::new("database_health").unwrap();
    let api = MetricName::new("api_response_time").unwrap();
    assert_eq!(store.sample_count(&db), 1);
    let window = store.window_now(&api, Duration::from_secs(60));
    assert!((window[0].value - PROBE_FAILURE_LATENCY_MS).abs() < f64::EPSILON);
}

#[tokio::test]
async fn healthy_probe_records_report() {
    let manager = AlertManager::builder()
        .probe(Arc::new(HealthyProbe::default()))
        .build();

    manager.health_tick().await;

    let store = manager.metrics();
    assert_eq!(store.sample_count(&MetricName::new("api_response_time").unwrap()), 1);
    assert_eq!(store.sample_count(&MetricName::new("database_health").unwrap()), 1);
    assert_eq!(store.sample_count(&MetricName::new("ai_success_rate").unwrap()), 1);
}

#[tokio::test]
async fn health_tick_probes_configured_endpoint() {
    let probe = Arc::new(HealthyProbe::default());
    let config = AlertManagerConfig {
        health_endpoint: "/healthz".to_string(),
        ..AlertManagerConfig::default()
    };
    let manager = AlertManager::builder()
        .config(config)
        .probe(Arc::clone(&probe) as _)
        .build();

    manager.health_tick().await;

    assert_eq!(*probe.endpoints.lock(), vec!["/healthz".to_string()]);
}

#[tokio::test]
async fn cleanup_force_resolves_stale_alerts() {
    let manager = manager_with_simple_rule();

    let fired = manager.record_metric_at(&latency(), 150.0, 1_000).await;
    let id = fired[0].id.clone();

    let day_ms = 24 * 60 * 60 * 1000;
    manager.cleanup_tick(1_000 + day_ms + 1);

    let alert = manager.get_alert(&id).unwrap();
    assert!(alert.resolved);
    assert_eq!(alert.resolved_by.as_deref(), Some("system_auto_resolve"));

    // The correlated incident was auto-resolved too
    assert!(manager.incidents().open_incidents().is_empty());
}

#[tokio::test]
async fn cleanup_force_resolves_escalated_alerts() {
    let manager = manager_with_simple_rule();

    let fired = manager.record_metric_at(&latency(), 150.0, 1_000).await;
    let id = fired[0].id.clone();
    assert!(manager.escalate_alert(&id).await);

    let day_ms = 24 * 60 * 60 * 1000;
    manager.cleanup_tick(1_000 + day_ms + 1);

    // Escalated is not resolved; a stale escalated alert still gets
    // force-resolved.
    let alert = manager.get_alert(&id).unwrap();
    assert!(alert.resolved);
    assert_eq!(alert.resolved_by.as_deref(), Some("system_auto_resolve"));
}

#[tokio::test]
async fn cleanup_drops_alerts_resolved_past_retention() {
    let manager = manager_with_simple_rule();

    let fired = manager.record_metric_at(&latency(), 150.0, 1_000).await;
    let id = fired[0].id.clone();
    assert!(manager.resolve_alert(&id, Some("ops")));

    let week_ms: i64 = 7 * 24 * 60 * 60 * 1000;
    // Resolution is stamped with wall-clock time, so the pass has to run
    // a full retention period after it.
    manager.cleanup_tick(now_millis() + week_ms + 1);

    assert!(manager.get_alert(&id).is_none());
}

#[tokio::test]
async fn cleanup_never_evicts_unresolved_alerts() {
    let manager = manager_with_simple_rule();

    let fired = manager.record_metric_at(&latency(), 150.0, 1_000).await;
    let id = fired[0].id.clone();

    // Far past both the stale threshold and the retention period. The
    // alert is unresolved, so this pass force-resolves it instead of
    // dropping it; eviction only counts from the resolution time.
    let week_ms = 7 * 24 * 60 * 60 * 1000;
    manager.cleanup_tick(1_000 + week_ms + 1);

    let alert = manager.get_alert(&id).unwrap();
    assert!(alert.resolved);
    assert_eq!(alert.resolved_by.as_deref(), Some("system_auto_resolve"));
}

#[tokio::test]
async fn disabled_manager_skips_loops() {
    let config = AlertManagerConfig {
        enabled: false,
        ..AlertManagerConfig::default()
    };
    let manager = AlertManager::builder().config(config).build();

    // No loops to start; initialize and shutdown are both no-ops.
    manager.initialize();
    manager.shutdown();
}

fn manager_with_simple_rule() -> AlertManager {
    let rule = AlertRule::builder(
        "r1",
        "High latency",
        AlertCondition::new(latency(), Comparison::Gt, Threshold::Number(100.0), 300_000),
    )
    .severity(Severity::Critical)
    .build()
    .unwrap();
    AlertManager::builder()
        .engine(RuleEngine::with_rules([rule]))
        .build()
}
