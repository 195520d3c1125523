//! Rule evaluation engine.
//!
//! The [`RuleEngine`] holds the set of standing [`AlertRule`]s and turns
//! incoming metric samples into [`Alert`]s. Evaluation is driven per sample:
//! every rule bound to the sample's metric runs through the cooldown gate,
//! the operator check, and the optional consecutive-failure gate, in that
//! order.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vigil_metrics::{MetricName, MetricStore};

use crate::types::{
    Alert, AlertCategory, AlertCondition, AlertRule, Comparison, Severity, Threshold,
};

/// Evaluates alert rules against metric samples.
///
/// Cheap to clone; all clones share the same rule set and cooldown ledger.
#[derive(Debug)]
pub struct RuleEngine {
    rules: Arc<RwLock<HashMap<String, AlertRule>>>,
    last_trigger: Arc<RwLock<HashMap<String, i64>>>,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(HashMap::new())),
            last_trigger: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a rule engine seeded with the given rules.
    #[must_use]
    pub fn with_rules(rules: impl IntoIterator<Item = AlertRule>) -> Self {
        let engine = Self::new();
        for rule in rules {
            engine.upsert_rule(rule);
        }
        engine
    }

    /// Adds a rule, replacing any existing rule with the same id.
    ///
    /// Replacing a rule does not reset its cooldown ledger entry.
    pub fn upsert_rule(&self, rule: AlertRule) {
        info!(rule_id = %rule.id, metric = %rule.condition.metric, "added alert rule");
        self.rules.write().insert(rule.id.clone(), rule);
    }

    /// Removes a rule and its cooldown ledger entry.
    ///
    /// Returns the removed rule, if any.
    pub fn remove_rule(&self, rule_id: &str) -> Option<AlertRule> {
        let removed = self.rules.write().remove(rule_id);
        if removed.is_some() {
            self.last_trigger.write().remove(rule_id);
            info!(rule_id = %rule_id, "removed alert rule");
        }
        removed
    }

    /// Returns a rule by id.
    #[must_use]
    pub fn get_rule(&self, rule_id: &str) -> Option<AlertRule> {
        self.rules.read().get(rule_id).cloned()
    }

    /// Returns all rules.
    #[must_use]
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().values().cloned().collect()
    }

    /// Returns all rules bound to the given metric.
    #[must_use]
    pub fn rules_for_metric(&self, metric: &MetricName) -> Vec<AlertRule> {
        self.rules
            .read()
            .values()
            .filter(|r| r.condition.metric == *metric)
            .cloned()
            .collect()
    }

    /// Returns all enabled rules.
    #[must_use]
    pub fn enabled_rules(&self) -> Vec<AlertRule> {
        self.rules
            .read()
            .values()
            .filter(|r| r.enabled)
            .cloned()
            .collect()
    }

    /// Returns all rules in the given category.
    #[must_use]
    pub fn rules_by_category(&self, category: AlertCategory) -> Vec<AlertRule> {
        self.rules
            .read()
            .values()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }

    /// Returns all rules of the given severity.
    #[must_use]
    pub fn rules_by_severity(&self, severity: Severity) -> Vec<AlertRule> {
        self.rules
            .read()
            .values()
            .filter(|r| r.severity == severity)
            .cloned()
            .collect()
    }

    /// Enables or disables a rule.
    ///
    /// Returns `false` when no rule with the given id exists.
    pub fn set_enabled(&self, rule_id: &str, enabled: bool) -> bool {
        let mut rules = self.rules.write();
        let Some(rule) = rules.get_mut(rule_id) else {
            return false;
        };
        rule.enabled = enabled;
        info!(rule_id = %rule_id, enabled, "toggled alert rule");
        true
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns true when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Evaluates all rules bound to `metric` against a freshly recorded
    /// sample, returning the alerts that fired.
    ///
    /// A rule fires when it is enabled, out of cooldown at `timestamp`,
    /// its operator matches `value`, and (when configured) the trailing
    /// consecutive samples inside the rule's window all breach the
    /// operator. Firing records `timestamp` in the cooldown ledger.
    pub fn evaluate(
        &self,
        store: &MetricStore,
        metric: &MetricName,
        value: f64,
        timestamp: i64,
    ) -> Vec<Alert> {
        let candidates = self.rules_for_metric(metric);
        let mut fired = Vec::new();

        for rule in candidates {
            if !rule.enabled {
                continue;
            }

            if self.in_cooldown(&rule, timestamp) {
                debug!(rule_id = %rule.id, "rule in cooldown, skipping");
                continue;
            }

            if !rule.condition.evaluate(value) {
                continue;
            }

            if !self.consecutive_gate(store, &rule, timestamp) {
                debug!(rule_id = %rule.id, "consecutive-failure gate not met");
                continue;
            }

            self.last_trigger.write().insert(rule.id.clone(), timestamp);
            let alert = Alert::from_rule(&rule, value, timestamp);
            info!(
                rule_id = %rule.id,
                alert_id = %alert.id,
                severity = %alert.severity,
                value,
                "alert rule fired"
            );
            fired.push(alert);
        }

        fired
    }

    fn in_cooldown(&self, rule: &AlertRule, now: i64) -> bool {
        self.last_trigger
            .read()
            .get(&rule.id)
            .is_some_and(|&last| now - last < rule.cooldown_ms)
    }

    fn consecutive_gate(&self, store: &MetricStore, rule: &AlertRule, now: i64) -> bool {
        let required = rule.condition.consecutive_failures.unwrap_or(1);
        if required <= 1 {
            return true;
        }

        let window = u64::try_from(rule.condition.time_window_ms)
            .ok()
            .filter(|&w| w > 0)
            .map(Duration::from_millis);
        let condition = rule.condition.clone();
        store.consecutive_matches(
            &rule.condition.metric,
            move |v| condition.evaluate(v),
            required as usize,
            window,
            now,
        )
    }

    /// Clears the cooldown ledger entry for one rule, allowing it to fire
    /// again immediately.
    pub fn clear_cooldown(&self, rule_id: &str) {
        self.last_trigger.write().remove(rule_id);
    }

    /// Clears the whole cooldown ledger.
    pub fn clear_cooldowns(&self) {
        self.last_trigger.write().clear();
    }

    /// Returns counts over the current rule set.
    #[must_use]
    pub fn statistics(&self) -> RuleStats {
        let rules = self.rules.read();
        let enabled = rules.values().filter(|r| r.enabled).count();
        let mut by_severity = HashMap::new();
        let mut by_category = HashMap::new();
        for rule in rules.values() {
            *by_severity.entry(rule.severity).or_insert(0) += 1;
            *by_category.entry(rule.category).or_insert(0) += 1;
        }
        RuleStats {
            total: rules.len(),
            enabled,
            disabled: rules.len() - enabled,
            by_severity,
            by_category,
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RuleEngine {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            last_trigger: Arc::clone(&self.last_trigger),
        }
    }
}

/// Counts over a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStats {
    /// Total number of rules.
    pub total: usize,
    /// Number of enabled rules.
    pub enabled: usize,
    /// Number of disabled rules.
    pub disabled: usize,
    /// Rule counts per severity.
    pub by_severity: HashMap<Severity, usize>,
    /// Rule counts per category.
    pub by_category: HashMap<AlertCategory, usize>,
}

fn metric(name: &str) -> MetricName {
    MetricName::new(name).unwrap_or_else(|_| unreachable!("seed metric names are valid"))
}

/// The built-in seed rule set covering API latency, database health,
/// AI success rate and error rate.
#[must_use]
pub fn default_rules() -> Vec<AlertRule> {
    let rules = [
        AlertRule::builder(
            "critical_api_response_time",
            "Critical API Response Time",
            AlertCondition::new(
                metric("api_response_time"),
                Comparison::Gt,
                Threshold::Number(15_000.0),
                180_000,
            )
            .consecutive(2),
        )
        .description("API response time critically high")
        .category(AlertCategory::ApiPerformance)
        .severity(Severity::Critical)
        .cooldown_ms(300_000)
        .escalation_delay_ms(600_000),
        AlertRule::builder(
            "elevated_api_response_time",
            "Elevated API Response Time",
            AlertCondition::new(
                metric("api_response_time"),
                Comparison::Gt,
                Threshold::Number(8_000.0),
                300_000,
            )
            .consecutive(3),
        )
        .description("API response time above comfort level")
        .category(AlertCategory::ApiPerformance)
        .severity(Severity::Warning)
        .cooldown_ms(600_000),
        AlertRule::builder(
            "database_unhealthy",
            "Database Unhealthy",
            AlertCondition::new(
                metric("database_health"),
                Comparison::Lt,
                Threshold::Number(1.0),
                60_000,
            ),
        )
        .description("Database health check failing")
        .category(AlertCategory::Database)
        .severity(Severity::Critical)
        .cooldown_ms(120_000)
        .escalation_delay_ms(300_000),
        AlertRule::builder(
            "low_ai_success_rate",
            "Low AI Success Rate",
            AlertCondition::new(
                metric("ai_success_rate"),
                Comparison::Lt,
                Threshold::Number(0.9),
                600_000,
            )
            .consecutive(2),
        )
        .description("AI request success rate below 90%")
        .category(AlertCategory::AiService)
        .severity(Severity::Error)
        .cooldown_ms(600_000),
        AlertRule::builder(
            "high_error_rate",
            "High Error Rate",
            AlertCondition::new(
                metric("error_rate"),
                Comparison::Gt,
                Threshold::Number(0.05),
                300_000,
            )
            .consecutive(2),
        )
        .description("Request error rate above 5%")
        .category(AlertCategory::SystemHealth)
        .severity(Severity::Error)
        .cooldown_ms(300_000),
    ];

    rules
        .into_iter()
        .filter_map(|b| b.build().ok())
        .collect()
}
