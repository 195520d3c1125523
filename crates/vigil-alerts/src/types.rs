//! Core types for the alerting system.
//!
//! This module provides the fundamental types used throughout the
//! vigil-alerts crate:
//! - [`Severity`]: the ordered severity of an alert
//! - [`AlertCategory`]: coarse classification used for incident correlation
//! - [`Comparison`] / [`Threshold`]: operators for evaluating metric values
//! - [`AlertCondition`] / [`AlertRule`]: standing threshold definitions
//! - [`Alert`]: a single triggered (or manually reported) alert instance
//! - [`ChannelConfig`]: a notification target attached to a rule

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vigil_metrics::MetricName;

use crate::error::{AlertError, Result};

/// The severity of an alert, ordered from least to most urgent.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action required.
    Info,
    /// Should be investigated.
    #[default]
    Warning,
    /// Operational problem, feeds incident grouping.
    Error,
    /// Requires immediate attention, feeds incident grouping.
    Critical,
}

impl Severity {
    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Returns the numeric rank of this severity (higher = more urgent).
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warning => 2,
            Self::Error => 3,
            Self::Critical => 4,
        }
    }

    /// Returns true for the severities that feed incident grouping.
    #[must_use]
    pub const fn is_incident_worthy(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse alert classification used to correlate alerts into incidents
/// and to route notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// API latency and throughput.
    ApiPerformance,
    /// Database connectivity and health.
    Database,
    /// AI/inference service behaviour.
    AiService,
    /// Security-relevant events.
    Security,
    /// General system health (default for manual alerts).
    SystemHealth,
    /// Business-level signals.
    Business,
}

impl AlertCategory {
    /// Returns the category as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ApiPerformance => "api_performance",
            Self::Database => "database",
            Self::AiService => "ai_service",
            Self::Security => "security",
            Self::SystemHealth => "system_health",
            Self::Business => "business",
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A threshold value for rule conditions.
///
/// Numeric operators compare against [`Threshold::Number`]; the substring
/// operators compare the stringified sample value against
/// [`Threshold::Text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    /// A numeric threshold.
    Number(f64),
    /// A textual threshold for substring operators.
    Text(String),
}

impl Threshold {
    /// Returns the numeric value, if this is a numeric threshold.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Returns the threshold rendered as a string.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Number(n) => format!("{n}"),
            Self::Text(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Comparison operators for alert conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Gte,
    /// Less than or equal.
    Lte,
    /// Equal (within `f64::EPSILON`).
    Eq,
    /// The stringified sample value contains the text threshold.
    Contains,
    /// The stringified sample value does not contain the text threshold.
    NotContains,
}

impl Comparison {
    /// Evaluates a sample value against a threshold.
    ///
    /// Numeric operators compare numerically and return `false` for a
    /// textual threshold; the substring operators coerce the sample value
    /// to a string first.
    #[must_use]
    pub fn evaluate(&self, value: f64, threshold: &Threshold) -> bool {
        match self {
            Self::Gt | Self::Lt | Self::Gte | Self::Lte | Self::Eq => {
                let Some(t) = threshold.as_number() else {
                    return false;
                };
                match self {
                    Self::Gt => value > t,
                    Self::Lt => value < t,
                    Self::Gte => value >= t,
                    Self::Lte => value <= t,
                    Self::Eq => (value - t).abs() < f64::EPSILON,
                    _ => unreachable!(),
                }
            }
            Self::Contains => format!("{value}").contains(&threshold.render()),
            Self::NotContains => !format!("{value}").contains(&threshold.render()),
        }
    }

    /// Returns the operator as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A condition that triggers an alert based on a metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    /// The metric this condition is bound to.
    pub metric: MetricName,
    /// The comparison operator.
    pub operator: Comparison,
    /// The threshold to compare against.
    pub threshold: Threshold,
    /// The evaluation window in milliseconds.
    pub time_window_ms: i64,
    /// Number of trailing samples that must all satisfy the operator
    /// before the rule fires. `None` or `Some(1)` means the latest sample
    /// alone decides.
    pub consecutive_failures: Option<u32>,
}

impl AlertCondition {
    /// Creates a new condition with no consecutive-failure requirement.
    #[must_use]
    pub const fn new(
        metric: MetricName,
        operator: Comparison,
        threshold: Threshold,
        time_window_ms: i64,
    ) -> Self {
        Self {
            metric,
            operator,
            threshold,
            time_window_ms,
            consecutive_failures: None,
        }
    }

    /// Sets the required consecutive-failure count.
    #[must_use]
    pub const fn consecutive(mut self, count: u32) -> Self {
        self.consecutive_failures = Some(count);
        self
    }

    /// Evaluates this condition against a single value.
    #[must_use]
    pub fn evaluate(&self, value: f64) -> bool {
        self.operator.evaluate(value, &self.threshold)
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.metric, self.operator, self.threshold)
    }
}

/// The kind of notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Slack incoming webhook.
    Slack,
    /// Email delivery endpoint.
    Email,
    /// SMS delivery endpoint.
    Sms,
    /// Arbitrary webhook URL.
    Webhook,
    /// PagerDuty Events v2.
    Pagerduty,
}

impl ChannelKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Webhook => "webhook",
            Self::Pagerduty => "pagerduty",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A notification target: channel kind plus kind-specific configuration.
///
/// Immutable value object passed at dispatch time; the alerting core does
/// not persist channels itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Optional stable identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The channel kind.
    pub kind: ChannelKind,
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Kind-specific configuration (webhook url, recipients, routing key, ...).
    #[serde(default)]
    pub config: HashMap<String, Value>,
    /// Whether this channel should receive notifications.
    pub enabled: bool,
}

impl ChannelConfig {
    /// Creates an enabled channel of the given kind with empty configuration.
    #[must_use]
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            id: None,
            kind,
            name: None,
            config: HashMap::new(),
            enabled: true,
        }
    }

    /// Creates a Slack channel targeting the given channel name.
    #[must_use]
    pub fn slack(channel: impl Into<String>) -> Self {
        Self::new(ChannelKind::Slack).option("channel", Value::String(channel.into()))
    }

    /// Adds a configuration entry.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }

    /// Sets the channel name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns a string configuration entry, if present.
    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// Returns a string-array configuration entry, if present.
    #[must_use]
    pub fn config_str_list(&self, key: &str) -> Vec<String> {
        self.config
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A rule that defines when and how to trigger an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Stable identifier for the rule's lifetime.
    pub id: String,
    /// Human-readable name (becomes the alert title).
    pub name: String,
    /// What this rule watches for.
    pub description: String,
    /// Category of alerts generated by this rule.
    pub category: AlertCategory,
    /// Severity of alerts generated by this rule.
    pub severity: Severity,
    /// The condition that triggers this rule.
    pub condition: AlertCondition,
    /// Whether this rule is evaluated.
    pub enabled: bool,
    /// Minimum time between two firings of this rule, in milliseconds.
    pub cooldown_ms: i64,
    /// Delay before an unresolved alert from this rule escalates, in
    /// milliseconds. Zero disables escalation.
    pub escalation_delay_ms: i64,
    /// Notification targets for alerts from this rule.
    pub channels: Vec<ChannelConfig>,
}

impl AlertRule {
    /// Maximum allowed length for rule names.
    pub const MAX_NAME_LENGTH: usize = 256;

    /// Creates a new alert rule builder.
    pub fn builder(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: AlertCondition,
    ) -> AlertRuleBuilder {
        AlertRuleBuilder::new(id, name, condition)
    }
}

/// Builder for creating [`AlertRule`] instances.
#[derive(Debug)]
pub struct AlertRuleBuilder {
    id: String,
    name: String,
    description: String,
    category: AlertCategory,
    severity: Severity,
    condition: AlertCondition,
    enabled: bool,
    cooldown_ms: i64,
    escalation_delay_ms: i64,
    channels: Vec<ChannelConfig>,
}

impl AlertRuleBuilder {
    /// Default cooldown: 5 minutes.
    pub const DEFAULT_COOLDOWN_MS: i64 = 300_000;

    fn new(id: impl Into<String>, name: impl Into<String>, condition: AlertCondition) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: AlertCategory::SystemHealth,
            severity: Severity::Warning,
            condition,
            enabled: true,
            cooldown_ms: Self::DEFAULT_COOLDOWN_MS,
            escalation_delay_ms: 0,
            channels: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the category.
    #[must_use]
    pub const fn category(mut self, category: AlertCategory) -> Self {
        self.category = category;
        self
    }

    /// Sets the severity.
    #[must_use]
    pub const fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets whether the rule is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the cooldown period in milliseconds.
    #[must_use]
    pub const fn cooldown_ms(mut self, cooldown_ms: i64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Sets the escalation delay in milliseconds.
    #[must_use]
    pub const fn escalation_delay_ms(mut self, delay_ms: i64) -> Self {
        self.escalation_delay_ms = delay_ms;
        self
    }

    /// Adds a notification channel.
    #[must_use]
    pub fn channel(mut self, channel: ChannelConfig) -> Self {
        self.channels.push(channel);
        self
    }

    /// Builds the [`AlertRule`].
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRule` if the id or name is empty, the
    /// name exceeds the maximum length, or the cooldown is negative.
    pub fn build(self) -> Result<AlertRule> {
        if self.id.is_empty() {
            return Err(AlertError::InvalidRule {
                reason: "rule id cannot be empty".to_string(),
            });
        }

        if self.name.is_empty() {
            return Err(AlertError::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }

        if self.name.len() > AlertRule::MAX_NAME_LENGTH {
            return Err(AlertError::InvalidRule {
                reason: format!(
                    "rule name exceeds maximum length of {} characters",
                    AlertRule::MAX_NAME_LENGTH
                ),
            });
        }

        if self.cooldown_ms < 0 {
            return Err(AlertError::InvalidRule {
                reason: "cooldown cannot be negative".to_string(),
            });
        }

        Ok(AlertRule {
            id: self.id,
            name: self.name,
            description: self.description,
            category: self.category,
            severity: self.severity,
            condition: self.condition,
            enabled: self.enabled,
            cooldown_ms: self.cooldown_ms,
            escalation_delay_ms: self.escalation_delay_ms,
            channels: self.channels,
        })
    }
}

/// The lifecycle status of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    /// Live and unhandled.
    Active,
    /// Resolved by an operator or the system.
    Resolved,
    /// Suppressed until a deadline.
    Suppressed,
    /// Promoted to the escalation notification path.
    Escalated,
}

impl AlertStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Suppressed => "suppressed",
            Self::Escalated => "escalated",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Well-known metadata keys carried by rule-triggered alerts.
pub mod metadata {
    /// Id of the rule that produced the alert.
    pub const RULE_ID: &str = "rule_id";
    /// Metric name the rule watches.
    pub const METRIC: &str = "metric";
    /// The sample value that triggered the alert.
    pub const VALUE: &str = "value";
    /// The rule threshold at trigger time.
    pub const THRESHOLD: &str = "threshold";
    /// The rule operator at trigger time.
    pub const OPERATOR: &str = "operator";
    /// Reason given when an alert is suppressed.
    pub const SUPPRESS_REASON: &str = "suppress_reason";
}

/// A single triggered notification of a threshold breach or manual report.
///
/// Severity is fixed at creation; lifecycle moves only through
/// [`Alert::resolve`], [`Alert::suppress`] and [`Alert::escalate`], each of
/// which is a one-way transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier (`{rule_id}_{timestamp}` or `manual_{timestamp}_{suffix}`).
    pub id: String,
    /// Short title (the rule name for rule-triggered alerts).
    pub title: String,
    /// Human-readable description including value and threshold.
    pub description: String,
    /// Severity, fixed at creation.
    pub severity: Severity,
    /// Category used for incident correlation.
    pub category: AlertCategory,
    /// Where the alert came from (rule engine, "Manual", ...).
    pub source: String,
    /// Trigger time, epoch milliseconds.
    pub timestamp: i64,
    /// Free-form metadata; see [`metadata`] for the well-known keys.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Current lifecycle status.
    pub status: AlertStatus,
    /// Whether the alert has been resolved.
    pub resolved: bool,
    /// When the alert was resolved.
    pub resolved_at: Option<i64>,
    /// Who resolved the alert.
    pub resolved_by: Option<String>,
    /// Whether the alert has been escalated.
    pub escalated: bool,
    /// When the alert was escalated.
    pub escalated_at: Option<i64>,
    /// Suppression deadline, if any.
    pub suppressed_until: Option<i64>,
}

impl Alert {
    /// Synthesizes an alert from a triggered rule.
    ///
    /// The id is derived from the rule id and the trigger timestamp, and
    /// the metadata carries the well-known trigger keys.
    #[must_use]
    pub fn from_rule(rule: &AlertRule, value: f64, timestamp: i64) -> Self {
        let mut meta = HashMap::new();
        meta.insert(
            metadata::RULE_ID.to_string(),
            Value::String(rule.id.clone()),
        );
        meta.insert(
            metadata::METRIC.to_string(),
            Value::String(rule.condition.metric.as_str().to_string()),
        );
        if let Some(num) = serde_json::Number::from_f64(value) {
            meta.insert(metadata::VALUE.to_string(), Value::Number(num));
        }
        meta.insert(
            metadata::THRESHOLD.to_string(),
            Value::String(rule.condition.threshold.render()),
        );
        meta.insert(
            metadata::OPERATOR.to_string(),
            Value::String(rule.condition.operator.as_str().to_string()),
        );

        Self {
            id: format!("{}_{timestamp}", rule.id),
            title: rule.name.clone(),
            description: format!(
                "{}: current value {value} breaches threshold {} ({})",
                rule.description, rule.condition.threshold, rule.condition.operator
            ),
            severity: rule.severity,
            category: rule.category,
            source: rule.condition.metric.as_str().to_string(),
            timestamp,
            metadata: meta,
            status: AlertStatus::Active,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
            escalated: false,
            escalated_at: None,
            suppressed_until: None,
        }
    }

    /// Synthesizes a manual alert outside the rule system.
    #[must_use]
    pub fn manual(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        category: AlertCategory,
        timestamp: i64,
    ) -> Self {
        let suffix: u32 = rand::random();
        Self {
            id: format!("manual_{timestamp}_{suffix:08x}"),
            title: title.into(),
            description: description.into(),
            severity,
            category,
            source: "Manual".to_string(),
            timestamp,
            metadata: HashMap::new(),
            status: AlertStatus::Active,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
            escalated: false,
            escalated_at: None,
            suppressed_until: None,
        }
    }

    /// Resolves the alert.
    ///
    /// Returns `false` when the alert is already resolved.
    pub fn resolve(&mut self, resolved_by: Option<&str>, now: i64) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        self.resolved_at = Some(now);
        self.resolved_by = resolved_by.map(str::to_string);
        self.status = AlertStatus::Resolved;
        true
    }

    /// Escalates the alert.
    ///
    /// Returns `false` when the alert is already resolved or escalated.
    pub fn escalate(&mut self, now: i64) -> bool {
        if self.resolved || self.escalated {
            return false;
        }
        self.escalated = true;
        self.escalated_at = Some(now);
        self.status = AlertStatus::Escalated;
        true
    }

    /// Suppresses the alert until the given deadline.
    ///
    /// Returns `false` when the alert is resolved or a suppression window
    /// is already in force at `now`.
    pub fn suppress(&mut self, until: i64, reason: Option<&str>, now: i64) -> bool {
        if self.resolved {
            return false;
        }
        if self.suppressed_until.is_some_and(|u| u > now) {
            return false;
        }
        self.suppressed_until = Some(until);
        self.status = AlertStatus::Suppressed;
        if let Some(reason) = reason {
            self.metadata.insert(
                metadata::SUPPRESS_REASON.to_string(),
                Value::String(reason.to_string()),
            );
        }
        true
    }

    /// Returns true when the alert should be treated as active at `now`:
    /// not resolved, not escalated, and either never suppressed or past
    /// its suppression deadline.
    #[must_use]
    pub fn is_active_at(&self, now: i64) -> bool {
        if self.resolved || self.escalated {
            return false;
        }
        match self.status {
            AlertStatus::Active => true,
            AlertStatus::Suppressed => self.suppressed_until.is_some_and(|u| u <= now),
            AlertStatus::Resolved | AlertStatus::Escalated => false,
        }
    }
}
