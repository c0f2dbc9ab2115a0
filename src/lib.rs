//! Loadwatch - windowed metric-sample aggregation for cluster load monitoring
//!
//! This library is the in-memory core a cluster load monitor is built on:
//! - Concurrent ingestion of per-entity metric samples into fixed-width
//!   time windows
//! - Bounded sliding history with generation-tracked mutation
//! - Per-entity aggregated time series with extrapolation for
//!   under-sampled windows
//! - Completeness analysis under pluggable coverage thresholds

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregation;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// Re-export main types
pub use aggregation::{
    AggregationOptions, AggregationResult, Completeness, Extrapolation, Granularity,
    SampleAggregator, ValuesAndExtrapolations,
};
pub use config::AggregatorConfig;
pub use error::{Error, Result};
pub use metrics::{AggregationStrategy, MetricRegistry};
pub use types::{Entity, Sample, SampleValidator};
