//! Windowed Multi-Entity Sample Aggregation
//!
//! This module is the core of the load monitor: it buckets metric samples
//! into fixed-width time windows per entity, retains a bounded sliding
//! history, and produces per-entity aggregated time series together with a
//! completeness verdict.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Sample Producers             │
//! │  entity + timestamp + metric values │
//! └─────────────────────────────────────┘
//!                  ↓ add
//! ┌─────────────────────────────────────┐
//! │           Raw Store                 │
//! │  window → (entity → accumulator)    │
//! └─────────────────────────────────────┘
//!                  ↓ aggregate / completeness
//! ┌─────────────────────────────────────┐
//! │    Completeness + Extrapolation     │
//! │  valid windows, gap filling         │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │       Aggregation Result            │
//! │  per-entity value vectors, tagged   │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Key Components
//!
//! - **`SampleAggregator`**: orchestrates ingestion, window rollover,
//!   eviction gating, caching, and the query paths
//! - **`WindowAccumulator`**: per-(entity, window) running reductions
//! - **`Extrapolation`**: fallback chain for under-sampled cells
//! - **`Completeness`**: per-window coverage ratios and validity sets under
//!   caller-supplied thresholds

pub mod accumulator;
pub mod aggregator;
pub mod completeness;
pub mod extrapolation;
pub mod result;
pub mod state;
pub mod window;

mod store;

// Re-export main types
pub use accumulator::{WindowAccumulator, WindowValues};
pub use aggregator::{AggregatorStats, AggregatorStatsSnapshot, SampleAggregator};
pub use completeness::{AggregationOptions, Completeness, Granularity};
pub use extrapolation::Extrapolation;
pub use result::{AggregationResult, MetricValues, ValuesAndExtrapolations};
pub use state::{AggregatorStateSnapshot, WindowState};
pub use window::{window_index, window_start_ms};
