//! Alert data model and rule evaluation engine for the Vigil alerting core.
//!
//! `vigil-alerts` defines the alert and rule types shared across the
//! workspace and the [`RuleEngine`] that turns incoming metric samples into
//! alerts, subject to per-rule cooldown and consecutive-failure gating.
//!
//! # Example
//!
//! ```rust
//! use vigil_alerts::{
//!     AlertCategory, AlertCondition, AlertRule, Comparison, RuleEngine, Severity, Threshold,
//! };
//! use vigil_metrics::{MetricName, MetricStore};
//!
//! let store = MetricStore::default();
//! let engine = RuleEngine::new();
//!
//! let metric = MetricName::new("api_response_time").unwrap();
//! let rule = AlertRule::builder(
//!     "high_latency",
//!     "High API latency",
//!     AlertCondition::new(metric.clone(), Comparison::Gt, Threshold::Number(5000.0), 300_000),
//! )
//! .category(AlertCategory::ApiPerformance)
//! .severity(Severity::Warning)
//! .build()
//! .unwrap();
//!
//! engine.upsert_rule(rule);
//!
//! store.record_at(&metric, 9000.0, 1_000);
//! let alerts = engine.evaluate(&store, &metric, 9000.0, 1_000);
//! assert_eq!(alerts.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod engine;
pub mod error;
pub mod types;

// Re-export main types at crate root
pub use engine::{RuleEngine, RuleStats, default_rules};
pub use error::{AlertError, Result};
pub use types::{
    Alert, AlertCategory, AlertCondition, AlertRule, AlertRuleBuilder, AlertStatus, ChannelConfig,
    ChannelKind, Comparison, Severity, Threshold, metadata,
};
