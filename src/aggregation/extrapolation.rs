//! Extrapolation: substitute values for under-sampled (entity, window) cells
//!
//! When an entity lacks enough samples in a window, a fallback chain picks a
//! stand-in value. Strategies are tried in order and the first success wins:
//!
//! 1. **AvgAvailable**: the window has at least half the required samples;
//!    use its own partial reduction.
//! 2. **AvgAdjacent**: both neighbor windows are fully sampled; use their
//!    arithmetic mean.
//! 3. **PrevPeriod**: the window one period (N windows) earlier is fully
//!    sampled; reuse its values, stamped at the current window.
//! 4. **ForcedInsufficient / ForcedUnknown**: only when the caller asked to
//!    include invalid entities, use whatever partial data exists, or zeros.
//!
//! Donor lookups (neighbors, previous period) accept fully sampled windows
//! only and never extrapolate themselves, bounding the search to one level.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregation::accumulator::{WindowAccumulator, WindowValues};
use crate::aggregation::store::WindowMap;
use crate::config::AggregatorConfig;
use crate::metrics::MetricRegistry;
use crate::types::{Entity, WindowIndex};

/// How a missing or under-sampled cell was filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extrapolation {
    /// The window's own partial data was used (at least half the required
    /// samples)
    AvgAvailable,

    /// Arithmetic mean of the two fully sampled neighbor windows
    AvgAdjacent,

    /// Values reused from the window one period earlier
    PrevPeriod,

    /// Partial data used regardless of sample count (invalid entities
    /// requested)
    ForcedInsufficient,

    /// No data at all; zero values synthesized (invalid entities requested)
    ForcedUnknown,
}

/// A resolved (entity, window) cell
#[derive(Debug, Clone)]
pub(crate) struct ResolvedCell {
    /// The sealed values for the cell
    pub values: WindowValues,

    /// The extrapolation applied, if the cell was not fully sampled
    pub extrapolation: Option<Extrapolation>,
}

/// Accumulator for (entity, window) if it is fully sampled
fn fully_sampled_donor<E: Entity>(
    windows: &WindowMap<E>,
    entity: &E,
    window: WindowIndex,
    min_samples: u64,
) -> Option<Arc<WindowAccumulator>> {
    windows
        .get(&window)
        .and_then(|bucket| bucket.get(entity))
        .filter(|acc| acc.has_enough_samples(min_samples))
}

/// Resolve the value vector for an (entity, window) cell
///
/// Returns `None` when no strategy applies; the entity is then invalid for
/// this window. `allow_forced` enables the two forced fallbacks.
pub(crate) fn resolve_cell<E: Entity>(
    windows: &WindowMap<E>,
    registry: &MetricRegistry,
    config: &AggregatorConfig,
    entity: &E,
    window: WindowIndex,
    allow_forced: bool,
) -> Option<ResolvedCell> {
    let min_samples = config.min_samples_per_window;
    let accumulator = windows.get(&window).and_then(|bucket| bucket.get(entity));

    if let Some(acc) = &accumulator {
        if acc.has_enough_samples(min_samples) {
            return Some(ResolvedCell {
                values: acc.snapshot(registry),
                extrapolation: None,
            });
        }
        if acc.has_enough_samples(config.min_samples_for_extrapolation()) {
            return Some(ResolvedCell {
                values: acc.snapshot(registry),
                extrapolation: Some(Extrapolation::AvgAvailable),
            });
        }
    }

    let prev = fully_sampled_donor(windows, entity, window - 1, min_samples);
    let next = fully_sampled_donor(windows, entity, window + 1, min_samples);
    if let (Some(prev), Some(next)) = (prev, next) {
        return Some(ResolvedCell {
            values: WindowValues::mean_of(&prev.snapshot(registry), &next.snapshot(registry)),
            extrapolation: Some(Extrapolation::AvgAdjacent),
        });
    }

    let period = window - config.num_windows as i64;
    if let Some(donor) = fully_sampled_donor(windows, entity, period, min_samples) {
        return Some(ResolvedCell {
            values: donor.snapshot(registry),
            extrapolation: Some(Extrapolation::PrevPeriod),
        });
    }

    if allow_forced {
        return Some(match accumulator {
            Some(acc) => ResolvedCell {
                values: acc.snapshot(registry),
                extrapolation: Some(Extrapolation::ForcedInsufficient),
            },
            None => ResolvedCell {
                values: WindowValues::zeros(registry.len()),
                extrapolation: Some(Extrapolation::ForcedUnknown),
            },
        });
    }

    None
}

/// Whether an entity counts as present in a window
///
/// Present means some non-forced strategy would yield a value: the window is
/// fully or half sampled for the entity, or a donor window qualifies. This is
/// the predicate completeness analysis is built on.
pub(crate) fn is_present<E: Entity>(
    windows: &WindowMap<E>,
    config: &AggregatorConfig,
    entity: &E,
    window: WindowIndex,
) -> bool {
    let min_samples = config.min_samples_per_window;
    if let Some(acc) = windows.get(&window).and_then(|bucket| bucket.get(entity)) {
        // Fully sampled, or enough for the half-window fallback
        if acc.has_enough_samples(config.min_samples_for_extrapolation()) {
            return true;
        }
    }
    if fully_sampled_donor(windows, entity, window - 1, min_samples).is_some()
        && fully_sampled_donor(windows, entity, window + 1, min_samples).is_some()
    {
        return true;
    }
    fully_sampled_donor(windows, entity, window - config.num_windows as i64, min_samples).is_some()
}
