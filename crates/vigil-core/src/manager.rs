//! The alert manager orchestrator.
//!
//! [`AlertManager`] ties the pipeline together: metric samples are
//! recorded in the store, evaluated by the rule engine, and every fired
//! alert is stored, notified, correlated into an incident when severe
//! enough, and armed with a one-shot escalation timer when its rule asks
//! for one. Background loops drive health probing and retention cleanup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vigil_alerts::{
    Alert, AlertCategory, AlertStatus, ChannelConfig, RuleEngine, Severity, default_rules,
    metadata,
};
use vigil_incidents::{Incident, IncidentManager};
use vigil_metrics::{MetricName, MetricSample, MetricStore, now_millis};
use vigil_notify::{NotificationDispatcher, NotificationTransport, OutboundMessage};

use crate::config::{AlertManagerConfig, ConfigUpdate};
use crate::health::{HealthProbe, PROBE_FAILURE_LATENCY_MS};

/// Metric fed by the health loop: end-to-end probe latency.
pub const METRIC_API_RESPONSE_TIME: &str = "api_response_time";
/// Metric fed by the health loop: 1 healthy, 0 unhealthy.
pub const METRIC_DATABASE_HEALTH: &str = "database_health";
/// Metric fed by the health loop: AI request success rate.
pub const METRIC_AI_SUCCESS_RATE: &str = "ai_success_rate";

/// Actor recorded on alerts force-resolved by the cleanup loop.
pub const SYSTEM_RESOLVER: &str = "system_auto_resolve";

fn health_metric(name: &'static str) -> MetricName {
    MetricName::new(name).unwrap_or_else(|_| unreachable!("health metric names are valid"))
}

fn fallback_channel(severity: Severity) -> ChannelConfig {
    let channel = if severity >= Severity::Error {
        "#alerts-critical"
    } else {
        "#alerts"
    };
    ChannelConfig::slack(channel).named("default")
}

fn escalation_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::slack("#oncall").named("oncall"),
        ChannelConfig::slack("#management-alerts").named("management"),
    ]
}

/// A manually reported alert, outside the rule system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualAlert {
    /// Short title.
    pub title: String,
    /// Human-readable description.
    pub description: String,
    /// Severity.
    pub severity: Severity,
    /// Category; defaults to [`AlertCategory::SystemHealth`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<AlertCategory>,
}

impl ManualAlert {
    /// Creates a manual alert with the default category.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            category: None,
        }
    }

    /// Sets the category.
    #[must_use]
    pub const fn category(mut self, category: AlertCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// Aggregate statistics over the working alert set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertStatistics {
    /// Total retained alerts.
    pub total: usize,
    /// Alerts currently active.
    pub active: usize,
    /// Alerts resolved.
    pub resolved: usize,
    /// Alerts escalated.
    pub escalated: usize,
    /// Alerts currently suppressed.
    pub suppressed: usize,
    /// Alerts of critical severity.
    pub critical: usize,
    /// Alert counts per severity.
    pub by_severity: HashMap<Severity, usize>,
    /// Alert counts per category.
    pub by_category: HashMap<AlertCategory, usize>,
    /// Incidents not yet resolved or closed.
    pub open_incidents: usize,
    /// Mean time to resolution over resolved alerts, milliseconds.
    pub mttr_ms: Option<f64>,
    /// Observed timestamp span divided by alert count, milliseconds.
    pub mtbf_ms: Option<f64>,
}

/// A point-in-time snapshot of alerts, incidents and metrics for an
/// external persister.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    /// When the snapshot was taken, epoch milliseconds.
    pub exported_at: i64,
    /// All retained alerts.
    pub alerts: Vec<Alert>,
    /// All retained incidents.
    pub incidents: Vec<Incident>,
    /// All retained metric series.
    pub metrics: HashMap<String, Vec<MetricSample>>,
}

struct Inner {
    config: RwLock<AlertManagerConfig>,
    store: MetricStore,
    engine: RuleEngine,
    incidents: IncidentManager,
    dispatcher: NotificationDispatcher,
    probe: Option<Arc<dyn HealthProbe>>,
    alerts: RwLock<HashMap<String, Alert>>,
    escalations: Mutex<HashMap<String, JoinHandle<()>>>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

/// Builder for [`AlertManager`].
pub struct AlertManagerBuilder {
    config: AlertManagerConfig,
    store: MetricStore,
    engine: Option<RuleEngine>,
    incidents: IncidentManager,
    transport: Option<Arc<dyn NotificationTransport>>,
    probe: Option<Arc<dyn HealthProbe>>,
}

impl AlertManagerBuilder {
    fn new() -> Self {
        Self {
            config: AlertManagerConfig::default(),
            store: MetricStore::default(),
            engine: None,
            incidents: IncidentManager::default(),
            transport: None,
            probe: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: AlertManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the metric store.
    #[must_use]
    pub fn store(mut self, store: MetricStore) -> Self {
        self.store = store;
        self
    }

    /// Sets the rule engine; defaults to one seeded with the built-in
    /// rules.
    #[must_use]
    pub fn engine(mut self, engine: RuleEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the incident manager.
    #[must_use]
    pub fn incidents(mut self, incidents: IncidentManager) -> Self {
        self.incidents = incidents;
        self
    }

    /// Sets the outbound transport; defaults to the log transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn NotificationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the health probe; without one the health loop is not started.
    #[must_use]
    pub fn probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Builds the manager. Background loops start on
    /// [`AlertManager::initialize`], not here.
    #[must_use]
    pub fn build(self) -> AlertManager {
        let dispatcher = match self.transport {
            Some(transport) => NotificationDispatcher::new(transport),
            None => NotificationDispatcher::default(),
        }
        .with_service(self.config.service.clone())
        .with_environment(self.config.environment.clone());

        AlertManager {
            inner: Arc::new(Inner {
                config: RwLock::new(self.config),
                store: self.store,
                engine: self
                    .engine
                    .unwrap_or_else(|| RuleEngine::with_rules(default_rules())),
                incidents: self.incidents,
                dispatcher,
                probe: self.probe,
                alerts: RwLock::new(HashMap::new()),
                escalations: Mutex::new(HashMap::new()),
                loops: Mutex::new(Vec::new()),
            }),
        }
    }
}

/// Orchestrates the alerting pipeline.
///
/// Cheap to clone; all clones share the same state. Explicitly
/// constructed and dependency-injected; there is no global instance.
pub struct AlertManager {
    inner: Arc<Inner>,
}

impl AlertManager {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> AlertManagerBuilder {
        AlertManagerBuilder::new()
    }

    /// Creates a manager with the given configuration and default
    /// components.
    #[must_use]
    pub fn new(config: AlertManagerConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Starts the background loops: health probing (when a probe is
    /// configured) and retention cleanup. A disabled configuration or a
    /// second call is a no-op.
    pub fn initialize(&self) {
        let config = self.inner.config.read().clone();
        if !config.enabled {
            info!("alert manager disabled, background loops not started");
            return;
        }

        let mut loops = self.inner.loops.lock();
        if !loops.is_empty() {
            warn!("alert manager already initialized");
            return;
        }

        if self.inner.probe.is_some() {
            let manager = self.clone();
            let interval = config.health_check_interval;
            loops.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    manager.health_tick().await;
                }
            }));
        }

        let manager = self.clone();
        let interval = config.cleanup_interval;
        loops.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                manager.cleanup_tick(now_millis());
            }
        }));

        info!(
            health_probe = self.inner.probe.is_some(),
            "alert manager initialized"
        );
    }

    /// Aborts the background loops and every pending escalation timer.
    pub fn shutdown(&self) {
        for handle in self.inner.loops.lock().drain(..) {
            handle.abort();
        }
        for (_, handle) in self.inner.escalations.lock().drain() {
            handle.abort();
        }
        info!("alert manager shut down");
    }

    /// Runs one health probe and feeds the outcome through the full
    /// metric pipeline. Probe failure records the failure sentinels.
    pub async fn health_tick(&self) {
        let Some(probe) = self.inner.probe.clone() else {
            return;
        };

        let endpoint = self.inner.config.read().health_endpoint.clone();
        let now = now_millis();
        match probe.probe(&endpoint).await {
            Ok(report) => {
                self.record_metric_at(
                    &health_metric(METRIC_API_RESPONSE_TIME),
                    report.latency_ms,
                    now,
                )
                .await;
                self.record_metric_at(
                    &health_metric(METRIC_DATABASE_HEALTH),
                    if report.database_healthy { 1.0 } else { 0.0 },
                    now,
                )
                .await;
                if let Some(rate) = report.ai_success_rate {
                    self.record_metric_at(&health_metric(METRIC_AI_SUCCESS_RATE), rate, now)
                        .await;
                }
            }
            Err(err) => {
                warn!(error = %err, "health probe failed");
                self.record_metric_at(&health_metric(METRIC_DATABASE_HEALTH), 0.0, now)
                    .await;
                self.record_metric_at(
                    &health_metric(METRIC_API_RESPONSE_TIME),
                    PROBE_FAILURE_LATENCY_MS,
                    now,
                )
                .await;
            }
        }
    }

    /// Runs one retention pass at `now`: force-resolves unresolved
    /// alerts older than the stale threshold, evicts alerts resolved
    /// longer ago than the retention period, auto-resolves and evicts old
    /// incidents, and sweeps expired metric samples.
    ///
    /// Unresolved alerts are never evicted, whatever their age: a stale
    /// one is force-resolved first and only leaves once its resolution
    /// falls out of retention.
    pub fn cleanup_tick(&self, now: i64) {
        let config = self.inner.config.read().clone();
        let stale_cutoff = now - config.stale_alert_threshold.as_millis() as i64;
        let retention_cutoff = now - config.alert_retention.as_millis() as i64;

        let mut force_resolved = 0usize;
        let mut dropped = 0usize;
        let mut cancelled: Vec<String> = Vec::new();
        {
            let mut alerts = self.inner.alerts.write();
            for alert in alerts.values_mut() {
                if !alert.resolved
                    && alert.timestamp < stale_cutoff
                    && alert.resolve(Some(SYSTEM_RESOLVER), now)
                {
                    cancelled.push(alert.id.clone());
                    force_resolved += 1;
                }
            }
            alerts.retain(|id, alert| {
                if alert.resolved_at.is_some_and(|at| at < retention_cutoff) {
                    cancelled.push(id.clone());
                    dropped += 1;
                    false
                } else {
                    true
                }
            });
        }
        {
            let mut escalations = self.inner.escalations.lock();
            for id in cancelled {
                if let Some(handle) = escalations.remove(&id) {
                    handle.abort();
                }
            }
        }

        let stale_incidents = self
            .inner
            .incidents
            .auto_resolve_stale(config.stale_alert_threshold, now);
        let old_incidents = self.inner.incidents.cleanup_old(config.incident_retention, now);
        let swept = self.inner.store.sweep_expired(now);

        if force_resolved + dropped + stale_incidents + old_incidents + swept > 0 {
            info!(
                force_resolved,
                dropped, stale_incidents, old_incidents, swept, "cleanup pass complete"
            );
        }
    }

    /// Records a metric sample stamped with the current time and runs the
    /// full pipeline. Returns the alerts that fired.
    pub async fn record_metric(&self, name: &MetricName, value: f64) -> Vec<Alert> {
        self.record_metric_at(name, value, now_millis()).await
    }

    /// Records a metric sample at an explicit timestamp and runs the full
    /// pipeline: store, evaluate, then store/notify/correlate/arm each
    /// fired alert. Returns the alerts that fired.
    pub async fn record_metric_at(
        &self,
        name: &MetricName,
        value: f64,
        timestamp: i64,
    ) -> Vec<Alert> {
        self.inner.store.record_at(name, value, timestamp);
        let fired = self.inner.engine.evaluate(&self.inner.store, name, value, timestamp);

        for alert in &fired {
            let rule = alert
                .metadata
                .get(metadata::RULE_ID)
                .and_then(serde_json::Value::as_str)
                .and_then(|id| self.inner.engine.get_rule(id));

            let (channels, escalation_delay_ms) = match rule {
                Some(rule) => {
                    let channels = if rule.channels.is_empty() {
                        vec![fallback_channel(alert.severity)]
                    } else {
                        rule.channels.clone()
                    };
                    (channels, rule.escalation_delay_ms)
                }
                None => (vec![fallback_channel(alert.severity)], 0),
            };

            self.process_alert(alert, channels, escalation_delay_ms).await;
        }

        fired
    }

    /// Reports an alert manually, outside the rule system, and runs it
    /// through the same store/notify/correlate path.
    pub async fn send_alert(&self, manual: ManualAlert) -> Alert {
        let now = now_millis();
        let alert = Alert::manual(
            manual.title,
            manual.description,
            manual.severity,
            manual.category.unwrap_or(AlertCategory::SystemHealth),
            now,
        );
        info!(alert_id = %alert.id, severity = %alert.severity, "manual alert reported");

        let channels = vec![fallback_channel(alert.severity)];
        self.process_alert(&alert, channels, 0).await;
        alert
    }

    async fn process_alert(
        &self,
        alert: &Alert,
        channels: Vec<ChannelConfig>,
        escalation_delay_ms: i64,
    ) {
        self.store_alert(alert.clone());

        let incident = if alert.severity.is_incident_worthy() {
            Some(self.inner.incidents.record_alert(alert, alert.timestamp))
        } else {
            None
        };

        self.inner
            .dispatcher
            .dispatch(alert, &channels, incident.as_ref())
            .await;

        if escalation_delay_ms > 0 {
            self.arm_escalation(&alert.id, escalation_delay_ms);
        }
    }

    fn store_alert(&self, alert: Alert) {
        let max_alerts = self.inner.config.read().max_alerts;
        let evicted = {
            let mut alerts = self.inner.alerts.write();
            alerts.insert(alert.id.clone(), alert);

            if alerts.len() > max_alerts {
                let oldest = alerts
                    .values()
                    .min_by_key(|a| a.timestamp)
                    .map(|a| a.id.clone());
                if let Some(id) = oldest {
                    alerts.remove(&id);
                    Some(id)
                } else {
                    None
                }
            } else {
                None
            }
        };

        if let Some(id) = evicted {
            debug!(alert_id = %id, "evicted oldest alert at capacity");
            if let Some(handle) = self.inner.escalations.lock().remove(&id) {
                handle.abort();
            }
        }
    }

    fn arm_escalation(&self, alert_id: &str, delay_ms: i64) {
        let manager = self.clone();
        let id = alert_id.to_string();
        let delay = Duration::from_millis(delay_ms.max(0) as u64);

        debug!(alert_id = %alert_id, delay_ms, "armed escalation timer");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            manager.escalate_alert(&id).await;
        });
        self.inner
            .escalations
            .lock()
            .insert(alert_id.to_string(), handle);
    }

    /// Resolves an alert and cancels its pending escalation timer.
    ///
    /// Returns `false` when the alert does not exist or is already
    /// resolved.
    pub fn resolve_alert(&self, id: &str, resolved_by: Option<&str>) -> bool {
        let now = now_millis();
        let resolved = {
            let mut alerts = self.inner.alerts.write();
            alerts
                .get_mut(id)
                .is_some_and(|alert| alert.resolve(resolved_by, now))
        };

        if resolved {
            if let Some(handle) = self.inner.escalations.lock().remove(id) {
                handle.abort();
            }
            info!(alert_id = %id, resolved_by = resolved_by.unwrap_or("unknown"), "alert resolved");
        }
        resolved
    }

    /// Suppresses an alert for `duration`. The escalation timer, if any,
    /// keeps running.
    ///
    /// Returns `false` when the alert does not exist, is resolved, or is
    /// already inside a suppression window.
    pub fn suppress_alert(&self, id: &str, duration: Duration, reason: Option<&str>) -> bool {
        let now = now_millis();
        let until = now + duration.as_millis() as i64;
        let suppressed = {
            let mut alerts = self.inner.alerts.write();
            alerts
                .get_mut(id)
                .is_some_and(|alert| alert.suppress(until, reason, now))
        };

        if suppressed {
            info!(alert_id = %id, until, "alert suppressed");
        }
        suppressed
    }

    /// Escalates an alert: marks it escalated, notifies the escalation
    /// channels, and posts the escalation webhook when configured. Used
    /// both by the timer path and for manual escalation; idempotent.
    ///
    /// Returns `false` when the alert does not exist, is resolved, or is
    /// already escalated.
    pub async fn escalate_alert(&self, id: &str) -> bool {
        let now = now_millis();
        let escalated = {
            let mut alerts = self.inner.alerts.write();
            let Some(alert) = alerts.get_mut(id) else {
                return false;
            };
            if !alert.escalate(now) {
                return false;
            }
            alert.clone()
        };
        self.inner.escalations.lock().remove(id);

        warn!(alert_id = %id, severity = %escalated.severity, "alert escalated");
        self.inner
            .dispatcher
            .dispatch(&escalated, &escalation_channels(), None)
            .await;

        let webhook = self.inner.config.read().escalation_webhook.clone();
        if let Some(url) = webhook {
            let body = serde_json::json!({
                "type": "alert_escalation",
                "alert": escalated,
                "timestamp": now,
            });
            if let Err(err) = self.inner.dispatcher.post(OutboundMessage::new(url, body)).await {
                warn!(alert_id = %id, error = %err, "escalation webhook delivery failed");
            }
        }

        true
    }

    /// Returns the alerts currently active (not resolved, not escalated,
    /// and past any suppression window).
    #[must_use]
    pub fn active_alerts(&self) -> Vec<Alert> {
        let now = now_millis();
        self.inner
            .alerts
            .read()
            .values()
            .filter(|a| a.is_active_at(now))
            .cloned()
            .collect()
    }

    /// Returns retained alerts, optionally bounded to a timestamp range,
    /// most recent first.
    #[must_use]
    pub fn alert_history(&self, range: Option<(i64, i64)>) -> Vec<Alert> {
        let mut history: Vec<Alert> = self
            .inner
            .alerts
            .read()
            .values()
            .filter(|a| range.is_none_or(|(start, end)| a.timestamp >= start && a.timestamp <= end))
            .cloned()
            .collect();
        history.sort_by_key(|a| std::cmp::Reverse(a.timestamp));
        history
    }

    /// Returns an alert by id.
    #[must_use]
    pub fn get_alert(&self, id: &str) -> Option<Alert> {
        self.inner.alerts.read().get(id).cloned()
    }

    /// Computes aggregate statistics over the working alert set.
    #[must_use]
    pub fn statistics(&self) -> AlertStatistics {
        let now = now_millis();
        let alerts = self.inner.alerts.read();

        let mut by_severity: HashMap<Severity, usize> = HashMap::new();
        let mut by_category: HashMap<AlertCategory, usize> = HashMap::new();
        let mut active = 0usize;
        let mut resolved = 0usize;
        let mut escalated = 0usize;
        let mut suppressed = 0usize;
        let mut critical = 0usize;
        let mut resolution_times: Vec<f64> = Vec::new();
        let mut min_ts = i64::MAX;
        let mut max_ts = i64::MIN;

        for alert in alerts.values() {
            *by_severity.entry(alert.severity).or_insert(0) += 1;
            *by_category.entry(alert.category).or_insert(0) += 1;
            if alert.is_active_at(now) {
                active += 1;
            }
            if alert.resolved {
                resolved += 1;
                if let Some(at) = alert.resolved_at {
                    resolution_times.push((at - alert.timestamp) as f64);
                }
            }
            if alert.escalated {
                escalated += 1;
            }
            if alert.status == AlertStatus::Suppressed {
                suppressed += 1;
            }
            if alert.severity == Severity::Critical {
                critical += 1;
            }
            min_ts = min_ts.min(alert.timestamp);
            max_ts = max_ts.max(alert.timestamp);
        }

        let mttr_ms = if resolution_times.is_empty() {
            None
        } else {
            Some(resolution_times.iter().sum::<f64>() / resolution_times.len() as f64)
        };
        let mtbf_ms = if alerts.len() >= 2 {
            Some((max_ts - min_ts) as f64 / alerts.len() as f64)
        } else {
            None
        };

        AlertStatistics {
            total: alerts.len(),
            active,
            resolved,
            escalated,
            suppressed,
            critical,
            by_severity,
            by_category,
            open_incidents: self.inner.incidents.open_incidents().len(),
            mttr_ms,
            mtbf_ms,
        }
    }

    /// Takes a snapshot of alerts, incidents and metrics for an external
    /// persister.
    #[must_use]
    pub fn export_data(&self) -> ExportData {
        ExportData {
            exported_at: now_millis(),
            alerts: self.inner.alerts.read().values().cloned().collect(),
            incidents: self.inner.incidents.list(),
            metrics: self.inner.store.export(),
        }
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> AlertManagerConfig {
        self.inner.config.read().clone()
    }

    /// Applies a partial configuration update. Intervals of loops already
    /// running are unchanged until the next [`AlertManager::initialize`].
    pub fn update_config(&self, update: ConfigUpdate) {
        self.inner.config.write().apply(update);
        info!("alert manager configuration updated");
    }

    /// Returns a handle to the shared metric store.
    #[must_use]
    pub fn metrics(&self) -> MetricStore {
        self.inner.store.clone()
    }

    /// Returns a handle to the shared rule engine.
    #[must_use]
    pub fn rules(&self) -> RuleEngine {
        self.inner.engine.clone()
    }

    /// Returns a handle to the shared incident manager.
    #[must_use]
    pub fn incidents(&self) -> IncidentManager {
        self.inner.incidents.clone()
    }
}

impl Clone for AlertManager {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for AlertManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertManager")
            .field("alerts", &self.inner.alerts.read().len())
            .field("rules", &self.inner.engine.len())
            .field("incidents", &self.inner.incidents.len())
            .finish_non_exhaustive()
    }
}
