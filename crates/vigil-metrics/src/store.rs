//! In-memory metric storage bounded by count and age.
//!
//! This module provides the [`MetricStore`], an append-only map of
//! per-metric-name sample series. Each series is FIFO-truncated to a
//! configured maximum length on every append, and a separate age-based
//! sweep drops samples older than the configured retention.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::types::{Aggregate, MetricName, MetricSample, now_millis};

/// Configuration for the metric store.
#[derive(Debug, Clone)]
pub struct MetricStoreConfig {
    /// Maximum number of samples retained per series (FIFO truncation).
    pub max_history_size: usize,
    /// Maximum age of a sample before the periodic sweep drops it.
    pub max_sample_age: Duration,
    /// How often the owning orchestrator should run [`MetricStore::sweep_expired`].
    pub cleanup_interval: Duration,
}

impl Default for MetricStoreConfig {
    fn default() -> Self {
        Self {
            max_history_size: 1000,
            max_sample_age: Duration::from_secs(24 * 3600),
            cleanup_interval: Duration::from_secs(3600),
        }
    }
}

/// Thread-safe in-memory storage for metric time series.
///
/// Series are keyed by exact [`MetricName`] match. All operations are
/// thread-safe; clones share the same underlying data.
#[derive(Debug)]
pub struct MetricStore {
    config: MetricStoreConfig,
    series: Arc<RwLock<HashMap<MetricName, Vec<MetricSample>>>>,
}

impl MetricStore {
    /// Creates a new metric store with the given configuration.
    #[must_use]
    pub fn new(config: MetricStoreConfig) -> Self {
        Self {
            config,
            series: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &MetricStoreConfig {
        &self.config
    }

    /// Records a sample stamped with the current time.
    pub fn record(&self, name: &MetricName, value: f64) {
        self.record_at(name, value, now_millis());
    }

    /// Records a sample at an explicit timestamp.
    ///
    /// The sample is inserted in timestamp order and the series is truncated
    /// to the most recent `max_history_size` entries, oldest dropped first.
    pub fn record_at(&self, name: &MetricName, value: f64, timestamp: i64) {
        let mut series = self.series.write();
        let samples = series.entry(name.clone()).or_default();

        let insert_pos = samples
            .binary_search_by_key(&timestamp, |s| s.timestamp)
            .unwrap_or_else(|pos| pos);
        samples.insert(insert_pos, MetricSample::new(timestamp, value));

        if samples.len() > self.config.max_history_size {
            let overflow = samples.len() - self.config.max_history_size;
            samples.drain(..overflow);
        }

        debug!(
            metric = %name,
            samples = samples.len(),
            "recorded metric sample"
        );
    }

    /// Returns all samples in `[end - window, end]` for the named series,
    /// in insertion order.
    ///
    /// Returns an empty vector when the metric has no series.
    #[must_use]
    pub fn window(&self, name: &MetricName, window: Duration, end: i64) -> Vec<MetricSample> {
        let start = end - window.as_millis() as i64;
        let series = self.series.read();

        series.get(name).map_or_else(Vec::new, |samples| {
            samples
                .iter()
                .filter(|s| s.timestamp >= start && s.timestamp <= end)
                .copied()
                .collect()
        })
    }

    /// Returns all samples in the trailing window ending now.
    #[must_use]
    pub fn window_now(&self, name: &MetricName, window: Duration) -> Vec<MetricSample> {
        self.window(name, window, now_millis())
    }

    /// Aggregates the samples in `[end - window, end]`.
    ///
    /// Returns `None` when the window is empty.
    #[must_use]
    pub fn aggregate(
        &self,
        name: &MetricName,
        window: Duration,
        agg: Aggregate,
        end: i64,
    ) -> Option<f64> {
        let values: Vec<f64> = self
            .window(name, window, end)
            .iter()
            .map(|s| s.value)
            .collect();
        agg.apply(&values)
    }

    /// Aggregates the trailing window ending now.
    #[must_use]
    pub fn aggregate_now(&self, name: &MetricName, window: Duration, agg: Aggregate) -> Option<f64> {
        self.aggregate(name, window, agg, now_millis())
    }

    /// Checks whether the last `count` samples in scope all satisfy `predicate`.
    ///
    /// Scope is the whole series, or the trailing `window` ending at `end`
    /// when a window is given. Returns `false` when fewer than `count`
    /// samples exist in scope.
    pub fn consecutive_matches(
        &self,
        name: &MetricName,
        predicate: impl Fn(f64) -> bool,
        count: usize,
        window: Option<Duration>,
        end: i64,
    ) -> bool {
        if count == 0 {
            return true;
        }

        let in_scope: Vec<MetricSample> = match window {
            Some(w) => self.window(name, w, end),
            None => {
                let series = self.series.read();
                series.get(name).cloned().unwrap_or_default()
            }
        };

        if in_scope.len() < count {
            return false;
        }

        in_scope[in_scope.len() - count..]
            .iter()
            .all(|s| predicate(s.value))
    }

    /// Drops samples older than `max_sample_age` from every series.
    ///
    /// Independent of the count-based truncation. Empty series are removed.
    /// Returns the number of samples dropped.
    pub fn sweep_expired(&self, now: i64) -> usize {
        let cutoff = now - self.config.max_sample_age.as_millis() as i64;
        let mut series = self.series.write();
        let mut dropped = 0;

        for samples in series.values_mut() {
            let before = samples.len();
            samples.retain(|s| s.timestamp >= cutoff);
            dropped += before - samples.len();
        }
        series.retain(|_, samples| !samples.is_empty());

        if dropped > 0 {
            debug!(dropped, "swept expired metric samples");
        }
        dropped
    }

    /// Returns the names of all series currently held.
    #[must_use]
    pub fn metric_names(&self) -> Vec<MetricName> {
        let series = self.series.read();
        series.keys().cloned().collect()
    }

    /// Returns the number of samples held for a metric (0 if unknown).
    #[must_use]
    pub fn sample_count(&self, name: &MetricName) -> usize {
        let series = self.series.read();
        series.get(name).map_or(0, Vec::len)
    }

    /// Returns the number of series held.
    #[must_use]
    pub fn len(&self) -> usize {
        let series = self.series.read();
        series.len()
    }

    /// Returns true when no series are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all series.
    pub fn clear(&self) {
        let mut series = self.series.write();
        series.clear();
    }

    /// Returns a snapshot of every series for an external persister.
    #[must_use]
    pub fn export(&self) -> HashMap<String, Vec<MetricSample>> {
        let series = self.series.read();
        series
            .iter()
            .map(|(name, samples)| (name.as_str().to_string(), samples.clone()))
            .collect()
    }

    /// Replaces the store contents with a previously exported snapshot.
    ///
    /// Each imported series is re-truncated to `max_history_size`.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::InvalidMetricName` if a snapshot key is not a
    /// valid metric name, or `MetricsError::InvalidSnapshot` if a series is
    /// not in timestamp order.
    pub fn import(&self, snapshot: HashMap<String, Vec<MetricSample>>) -> Result<()> {
        let mut validated = HashMap::with_capacity(snapshot.len());

        for (raw_name, mut samples) in snapshot {
            let name = MetricName::new(raw_name)?;

            if samples.windows(2).any(|w| w[0].timestamp > w[1].timestamp) {
                return Err(MetricsError::InvalidSnapshot {
                    reason: format!("series '{name}' is not in timestamp order"),
                });
            }

            if samples.len() > self.config.max_history_size {
                let overflow = samples.len() - self.config.max_history_size;
                samples.drain(..overflow);
            }
            validated.insert(name, samples);
        }

        let mut series = self.series.write();
        *series = validated;
        Ok(())
    }
}

impl Clone for MetricStore {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            series: Arc::clone(&self.series),
        }
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new(MetricStoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_store() -> MetricStore {
        MetricStore::default()
    }

    fn test_name() -> MetricName {
        MetricName::new("test_metric").unwrap()
    }

    mod record_tests {
        use super::*;

        #[test]
        fn record_single_sample() {
            let store = test_store();
            let name = test_name();

            store.record(&name, 42.0);
            assert_eq!(store.sample_count(&name), 1);
        }

        #[test]
        fn record_maintains_timestamp_order() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 3.0, 3000);
            store.record_at(&name, 1.0, 1000);
            store.record_at(&name, 2.0, 2000);

            let samples = store.window(&name, Duration::from_secs(60), 3000);
            assert_eq!(samples.len(), 3);
            assert_eq!(samples[0].timestamp, 1000);
            assert_eq!(samples[1].timestamp, 2000);
            assert_eq!(samples[2].timestamp, 3000);
        }

        #[test]
        fn record_truncates_to_max_history() {
            let store = MetricStore::new(MetricStoreConfig {
                max_history_size: 5,
                ..Default::default()
            });
            let name = test_name();

            for i in 0..10 {
                store.record_at(&name, i as f64, 1000 + i);
            }

            assert_eq!(store.sample_count(&name), 5);

            // Oldest dropped first: surviving samples are 5..10
            let samples = store.window(&name, Duration::from_secs(60), 2000);
            assert!((samples[0].value - 5.0).abs() < f64::EPSILON);
            assert!((samples[4].value - 9.0).abs() < f64::EPSILON);
        }

        #[test]
        fn distinct_names_keep_distinct_series() {
            let store = test_store();
            let a = MetricName::new("metric_a").unwrap();
            let b = MetricName::new("metric_b").unwrap();

            store.record_at(&a, 1.0, 1000);
            store.record_at(&b, 2.0, 1000);

            assert_eq!(store.sample_count(&a), 1);
            assert_eq!(store.sample_count(&b), 1);
            assert_eq!(store.len(), 2);
        }
    }

    mod window_tests {
        use super::*;

        #[test]
        fn window_unknown_metric_is_empty() {
            let store = test_store();
            let samples = store.window(&test_name(), Duration::from_secs(60), 1000);
            assert!(samples.is_empty());
        }

        #[test]
        fn window_excludes_samples_before_start() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 1.0, 1000);
            store.record_at(&name, 2.0, 5000);
            store.record_at(&name, 3.0, 9000);

            // Window [4000, 9000]
            let samples = store.window(&name, Duration::from_millis(5000), 9000);
            assert_eq!(samples.len(), 2);
            assert_eq!(samples[0].timestamp, 5000);
            assert_eq!(samples[1].timestamp, 9000);
        }

        #[test]
        fn window_excludes_samples_after_end() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 1.0, 1000);
            store.record_at(&name, 2.0, 5000);

            let samples = store.window(&name, Duration::from_millis(5000), 3000);
            assert_eq!(samples.len(), 1);
            assert_eq!(samples[0].timestamp, 1000);
        }

        proptest! {
            #[test]
            fn window_never_returns_out_of_range(
                timestamps in proptest::collection::vec(0i64..100_000, 1..50),
                window_ms in 1i64..50_000,
                end in 0i64..100_000,
            ) {
                let store = test_store();
                let name = test_name();
                for (i, ts) in timestamps.iter().enumerate() {
                    store.record_at(&name, i as f64, *ts);
                }

                let samples = store.window(&name, Duration::from_millis(window_ms as u64), end);
                for s in samples {
                    prop_assert!(s.timestamp >= end - window_ms);
                    prop_assert!(s.timestamp <= end);
                }
            }
        }
    }

    mod aggregate_tests {
        use super::*;

        #[test]
        fn aggregate_avg() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 10.0, 1000);
            store.record_at(&name, 20.0, 2000);
            store.record_at(&name, 30.0, 3000);

            let avg = store.aggregate(&name, Duration::from_secs(60), Aggregate::Avg, 3000);
            assert!(avg.is_some());
            assert!((avg.unwrap() - 20.0).abs() < f64::EPSILON);
        }

        #[test]
        fn aggregate_latest() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 10.0, 1000);
            store.record_at(&name, 55.0, 2000);

            let latest = store.aggregate(&name, Duration::from_secs(60), Aggregate::Latest, 2000);
            assert!((latest.unwrap() - 55.0).abs() < f64::EPSILON);
        }

        #[test]
        fn aggregate_empty_window_is_none() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 10.0, 1000);

            // Window well past the sample
            let result = store.aggregate(&name, Duration::from_millis(100), Aggregate::Avg, 90_000);
            assert!(result.is_none());
        }

        #[test]
        fn aggregate_unknown_metric_is_none() {
            let store = test_store();
            let result =
                store.aggregate(&test_name(), Duration::from_secs(60), Aggregate::Max, 1000);
            assert!(result.is_none());
        }
    }

    mod consecutive_tests {
        use super::*;

        #[test]
        fn consecutive_all_match() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 150.0, 1000);
            store.record_at(&name, 150.0, 2000);
            store.record_at(&name, 150.0, 3000);

            assert!(store.consecutive_matches(&name, |v| v > 100.0, 3, None, 3000));
        }

        #[test]
        fn consecutive_broken_run_fails() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 150.0, 1000);
            store.record_at(&name, 50.0, 2000);
            store.record_at(&name, 150.0, 3000);

            assert!(!store.consecutive_matches(&name, |v| v > 100.0, 3, None, 3000));
        }

        #[test]
        fn consecutive_only_tail_counts() {
            let store = test_store();
            let name = test_name();

            // Early breach does not matter; only the last 2 samples are checked
            store.record_at(&name, 50.0, 1000);
            store.record_at(&name, 150.0, 2000);
            store.record_at(&name, 150.0, 3000);

            assert!(store.consecutive_matches(&name, |v| v > 100.0, 2, None, 3000));
        }

        #[test]
        fn consecutive_too_few_samples_fails() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 150.0, 1000);

            assert!(!store.consecutive_matches(&name, |v| v > 100.0, 2, None, 1000));
        }

        #[test]
        fn consecutive_respects_window() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 150.0, 1000);
            store.record_at(&name, 150.0, 50_000);

            // Only one sample inside the trailing 10s window
            let window = Some(Duration::from_secs(10));
            assert!(!store.consecutive_matches(&name, |v| v > 100.0, 2, window, 50_000));
        }

        #[test]
        fn consecutive_zero_count_is_true() {
            let store = test_store();
            assert!(store.consecutive_matches(&test_name(), |_| false, 0, None, 1000));
        }
    }

    mod sweep_tests {
        use super::*;

        #[test]
        fn sweep_drops_old_samples() {
            let store = MetricStore::new(MetricStoreConfig {
                max_sample_age: Duration::from_secs(10),
                ..Default::default()
            });
            let name = test_name();

            store.record_at(&name, 1.0, 1000);
            store.record_at(&name, 2.0, 50_000);

            let dropped = store.sweep_expired(55_000);
            assert_eq!(dropped, 1);
            assert_eq!(store.sample_count(&name), 1);
        }

        #[test]
        fn sweep_removes_empty_series() {
            let store = MetricStore::new(MetricStoreConfig {
                max_sample_age: Duration::from_secs(1),
                ..Default::default()
            });
            let name = test_name();

            store.record_at(&name, 1.0, 1000);
            store.sweep_expired(100_000);

            assert!(store.is_empty());
        }

        #[test]
        fn sweep_is_independent_of_count_cap() {
            let store = MetricStore::new(MetricStoreConfig {
                max_history_size: 3,
                max_sample_age: Duration::from_secs(3600),
                ..Default::default()
            });
            let name = test_name();

            for i in 0..5 {
                store.record_at(&name, i as f64, 1000 + i);
            }
            assert_eq!(store.sample_count(&name), 3);

            // All survivors are recent, sweep drops nothing
            assert_eq!(store.sweep_expired(2000), 0);
            assert_eq!(store.sample_count(&name), 3);
        }
    }

    mod snapshot_tests {
        use super::*;

        #[test]
        fn export_import_roundtrip() {
            let store = test_store();
            let name = test_name();

            store.record_at(&name, 1.0, 1000);
            store.record_at(&name, 2.0, 2000);

            let snapshot = store.export();
            assert_eq!(snapshot.len(), 1);

            let restored = MetricStore::default();
            restored.import(snapshot).unwrap();
            assert_eq!(restored.sample_count(&name), 2);
        }

        #[test]
        fn import_rejects_bad_name() {
            let store = test_store();
            let mut snapshot = HashMap::new();
            snapshot.insert("bad-name".to_string(), vec![MetricSample::new(1000, 1.0)]);

            assert!(store.import(snapshot).is_err());
        }

        #[test]
        fn import_rejects_unordered_series() {
            let store = test_store();
            let mut snapshot = HashMap::new();
            snapshot.insert(
                "metric".to_string(),
                vec![MetricSample::new(2000, 1.0), MetricSample::new(1000, 2.0)],
            );

            let result = store.import(snapshot);
            assert!(matches!(
                result,
                Err(MetricsError::InvalidSnapshot { .. })
            ));
        }
    }

    mod sharing_tests {
        use super::*;

        #[test]
        fn clones_share_data() {
            let store1 = test_store();
            let store2 = store1.clone();
            let name = test_name();

            store1.record_at(&name, 1.0, 1000);
            assert_eq!(store2.sample_count(&name), 1);
        }
    }
}
