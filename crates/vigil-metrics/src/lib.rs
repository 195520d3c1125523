//! In-memory metric time series store for the Vigil alerting core.
//!
//! `vigil-metrics` holds per-metric-name series of `(value, timestamp)`
//! samples, bounded both by count and by age, and answers the windowed
//! queries the rule engine needs: aggregation over a trailing time window
//! and consecutive-run checks over the most recent samples.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use vigil_metrics::{Aggregate, MetricName, MetricStore};
//!
//! let store = MetricStore::default();
//! let name = MetricName::new("api_response_time").unwrap();
//!
//! store.record(&name, 120.0);
//! store.record(&name, 340.0);
//!
//! let avg = store.aggregate_now(&name, Duration::from_secs(60), Aggregate::Avg);
//! assert!(avg.is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use error::{MetricsError, Result};
pub use store::{MetricStore, MetricStoreConfig};
pub use types::{Aggregate, MetricName, MetricSample, now_millis};
