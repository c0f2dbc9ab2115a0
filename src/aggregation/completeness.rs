//! Completeness analysis: which windows, entities, and groups carry enough
//! evidence to act on
//!
//! Callers supply coverage thresholds through `AggregationOptions`; the
//! analyzer reports per-window coverage ratios and the sets of valid windows,
//! entities, and entity groups. Validity is computed at either entity or
//! entity-group granularity.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{Entity, WindowIndex};

/// Granularity at which per-window validity is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// Each entity qualifies on its own
    Entity,

    /// An entity only qualifies when its whole group is present
    EntityGroup,
}

/// Coverage thresholds and scope for aggregation and completeness queries
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOptions<E: Entity> {
    /// Minimum fraction of interested entities that must be present for a
    /// window to be valid, in `[0, 1]`
    pub min_valid_entity_ratio: f64,

    /// Minimum fraction of entity groups that must be fully present for a
    /// window to be valid, in `[0, 1]`
    pub min_valid_entity_group_ratio: f64,

    /// Number of windows an aggregation must return
    pub num_windows: usize,

    /// Entities the caller cares about; empty means every entity observed in
    /// the store
    pub interested_entities: HashSet<E>,

    /// Validity granularity
    pub granularity: Granularity,

    /// Whether aggregation results should include entities that fail
    /// validity, filled via forced extrapolations
    pub include_invalid_entities: bool,
}

impl<E: Entity> AggregationOptions<E> {
    /// Create options with the given thresholds and scope
    pub fn new(
        min_valid_entity_ratio: f64,
        min_valid_entity_group_ratio: f64,
        num_windows: usize,
        interested_entities: HashSet<E>,
        granularity: Granularity,
        include_invalid_entities: bool,
    ) -> Self {
        Self {
            min_valid_entity_ratio,
            min_valid_entity_group_ratio,
            num_windows,
            interested_entities,
            granularity,
            include_invalid_entities,
        }
    }
}

/// Result of a completeness analysis over a window range
///
/// Ratio maps cover every window of the queried range, valid or not; validity
/// sets honor the thresholds and granularity of the options the analysis ran
/// with.
#[derive(Debug, Clone)]
pub struct Completeness<E: Entity> {
    generation: u64,
    valid_window_indexes: BTreeSet<WindowIndex>,
    valid_entities: HashSet<E>,
    valid_entity_groups: HashSet<E::Group>,
    valid_entity_ratio_by_window: BTreeMap<WindowIndex, f64>,
    valid_entity_group_ratio_by_window: BTreeMap<WindowIndex, f64>,
    valid_entity_ratio_with_group_granularity_by_window: BTreeMap<WindowIndex, f64>,
}

impl<E: Entity> Completeness<E> {
    /// An analysis over an empty range
    pub(crate) fn empty(generation: u64) -> Self {
        Self {
            generation,
            valid_window_indexes: BTreeSet::new(),
            valid_entities: HashSet::new(),
            valid_entity_groups: HashSet::new(),
            valid_entity_ratio_by_window: BTreeMap::new(),
            valid_entity_group_ratio_by_window: BTreeMap::new(),
            valid_entity_ratio_with_group_granularity_by_window: BTreeMap::new(),
        }
    }

    /// Generation the analysis was computed at
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Windows meeting both coverage thresholds, ascending
    pub fn valid_window_indexes(&self) -> &BTreeSet<WindowIndex> {
        &self.valid_window_indexes
    }

    /// Entities present in every valid window (per the options' granularity)
    pub fn valid_entities(&self) -> &HashSet<E> {
        &self.valid_entities
    }

    /// Groups whose interested entities are all valid
    pub fn valid_entity_groups(&self) -> &HashSet<E::Group> {
        &self.valid_entity_groups
    }

    /// Fraction of interested entities present, per window
    pub fn valid_entity_ratio_by_window(&self) -> &BTreeMap<WindowIndex, f64> {
        &self.valid_entity_ratio_by_window
    }

    /// Fraction of groups fully present, per window
    pub fn valid_entity_group_ratio_by_window(&self) -> &BTreeMap<WindowIndex, f64> {
        &self.valid_entity_group_ratio_by_window
    }

    /// Fraction of interested entities belonging to fully present groups,
    /// per window
    pub fn valid_entity_ratio_with_group_granularity_by_window(
        &self,
    ) -> &BTreeMap<WindowIndex, f64> {
        &self.valid_entity_ratio_with_group_granularity_by_window
    }
}

/// Compute completeness over the given windows
///
/// `coverage` maps each window of the range to the entities present in it
/// (already extrapolation-aware); `interested` is the resolved entity scope
/// (never empty unless the store itself is empty).
pub(crate) fn analyze<E: Entity>(
    range: &[WindowIndex],
    coverage: &BTreeMap<WindowIndex, HashSet<E>>,
    interested: &HashSet<E>,
    options: &AggregationOptions<E>,
    generation: u64,
) -> Completeness<E> {
    if range.is_empty() || interested.is_empty() {
        return Completeness::empty(generation);
    }

    // Interested entities per group; group count is the denominator of the
    // group ratio.
    let mut groups: HashMap<E::Group, Vec<&E>> = HashMap::new();
    for entity in interested {
        groups.entry(entity.group()).or_default().push(entity);
    }
    let num_entities = interested.len() as f64;
    let num_groups = groups.len() as f64;

    let mut result = Completeness::empty(generation);
    let mut fully_present_groups: BTreeMap<WindowIndex, HashSet<E::Group>> = BTreeMap::new();

    for &window in range {
        let empty = HashSet::new();
        let present = coverage.get(&window).unwrap_or(&empty);

        let num_present = interested.iter().filter(|e| present.contains(e)).count();
        let present_groups: HashSet<E::Group> = groups
            .iter()
            .filter(|(_, members)| members.iter().all(|e| present.contains(*e)))
            .map(|(group, _)| group.clone())
            .collect();
        let entities_in_present_groups: usize = present_groups
            .iter()
            .map(|group| groups[group].len())
            .sum();

        let entity_ratio = num_present as f64 / num_entities;
        let group_ratio = present_groups.len() as f64 / num_groups;
        let group_granularity_ratio = entities_in_present_groups as f64 / num_entities;

        let gating_entity_ratio = match options.granularity {
            Granularity::Entity => entity_ratio,
            Granularity::EntityGroup => group_granularity_ratio,
        };
        if gating_entity_ratio >= options.min_valid_entity_ratio
            && group_ratio >= options.min_valid_entity_group_ratio
        {
            result.valid_window_indexes.insert(window);
        }

        result
            .valid_entity_ratio_by_window
            .insert(window, entity_ratio);
        result
            .valid_entity_group_ratio_by_window
            .insert(window, group_ratio);
        result
            .valid_entity_ratio_with_group_granularity_by_window
            .insert(window, group_granularity_ratio);
        fully_present_groups.insert(window, present_groups);
    }

    // An entity (or group) must qualify in every valid window. No valid
    // windows means nothing qualifies.
    if result.valid_window_indexes.is_empty() {
        return result;
    }

    for entity in interested {
        let valid = match options.granularity {
            Granularity::Entity => result.valid_window_indexes.iter().all(|window| {
                coverage
                    .get(window)
                    .map(|present| present.contains(entity))
                    .unwrap_or(false)
            }),
            Granularity::EntityGroup => {
                let group = entity.group();
                result
                    .valid_window_indexes
                    .iter()
                    .all(|window| fully_present_groups[window].contains(&group))
            }
        };
        if valid {
            result.valid_entities.insert(entity.clone());
        }
    }

    for (group, members) in &groups {
        if members
            .iter()
            .all(|entity| result.valid_entities.contains(*entity))
        {
            result.valid_entity_groups.insert(group.clone());
        }
    }

    result
}
