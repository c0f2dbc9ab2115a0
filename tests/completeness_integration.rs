//! Integration tests for completeness analysis
//!
//! A shared environment exercises the option matrix: entity vs group
//! granularity, ratio thresholds, and the per-window ratio maps.
//!
//! Environment (N = 20, W = 1000ms, K = 4):
//! - ENTITY1 (group g1) fully sampled in windows 1..=21 (21 is active)
//! - ENTITY3 (group g2) fully sampled in windows 1, 2 and 5..=19
//! - ENTITY2 (group g1) never observed
//!
//! Windows 3, 4, and 20 therefore miss ENTITY3 with no fallback donor.

use std::collections::HashSet;
use std::sync::Arc;

use loadwatch::aggregation::{AggregationOptions, Completeness, Granularity, SampleAggregator};
use loadwatch::config::AggregatorConfig;
use loadwatch::metrics::{AggregationStrategy, MetricRegistry};
use loadwatch::types::{Entity, Sample};

const EPSILON: f64 = 0.01;
const NUM_WINDOWS: usize = 20;
const WINDOW_MS: i64 = 1000;
const MIN_SAMPLES_PER_WINDOW: u64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IntEntity {
    group: &'static str,
    id: u32,
}

impl IntEntity {
    const fn new(group: &'static str, id: u32) -> Self {
        Self { group, id }
    }
}

impl Entity for IntEntity {
    type Group = &'static str;

    fn group(&self) -> &'static str {
        self.group
    }
}

const ENTITY1: IntEntity = IntEntity::new("g1", 1234);
const ENTITY2: IntEntity = IntEntity::new("g1", 5678);
const ENTITY3: IntEntity = IntEntity::new("g2", 1234);

fn test_registry() -> Arc<MetricRegistry> {
    let mut registry = MetricRegistry::new();
    registry
        .register("latency", AggregationStrategy::Latest)
        .unwrap();
    registry.register("peak", AggregationStrategy::Max).unwrap();
    registry.register("load", AggregationStrategy::Avg).unwrap();
    registry
        .register("requests", AggregationStrategy::Sum)
        .unwrap();
    Arc::new(registry)
}

fn populate(
    aggregator: &SampleAggregator<IntEntity>,
    entity: &IntEntity,
    starting_index: i64,
    num_windows: i64,
    samples_per_window: u64,
) {
    for i in starting_index..starting_index + num_windows {
        let window = i + 1;
        for j in 0..samples_per_window {
            let value = (i * 10) as f64 + j as f64;
            let mut values = std::collections::HashMap::new();
            for id in 0..4 {
                values.insert(id, value);
            }
            assert!(aggregator.add(Sample::new(
                entity.clone(),
                window * WINDOW_MS + j as i64,
                values
            )));
        }
    }
}

fn prepare_env() -> SampleAggregator<IntEntity> {
    let config = AggregatorConfig {
        num_windows: NUM_WINDOWS,
        window_ms: WINDOW_MS,
        min_samples_per_window: MIN_SAMPLES_PER_WINDOW,
        max_extra_windows: 0,
        ..AggregatorConfig::default()
    };
    let aggregator = SampleAggregator::new(config, test_registry()).unwrap();
    populate(&aggregator, &ENTITY1, 0, NUM_WINDOWS as i64 + 1, MIN_SAMPLES_PER_WINDOW);
    populate(&aggregator, &ENTITY3, 0, 2, MIN_SAMPLES_PER_WINDOW);
    populate(&aggregator, &ENTITY3, 4, NUM_WINDOWS as i64 - 5, MIN_SAMPLES_PER_WINDOW);
    aggregator
}

fn options(
    min_entity_ratio: f64,
    min_group_ratio: f64,
    granularity: Granularity,
) -> AggregationOptions<IntEntity> {
    let interested: HashSet<IntEntity> =
        [ENTITY1, ENTITY2, ENTITY3].into_iter().collect();
    AggregationOptions::new(
        min_entity_ratio,
        min_group_ratio,
        NUM_WINDOWS,
        interested,
        granularity,
        true,
    )
}

/// Ratio maps are independent of the thresholds: windows 3, 4, and 20 miss
/// ENTITY3, every other window has ENTITY1 and ENTITY3 present.
fn assert_ratios_by_window(completeness: &Completeness<IntEntity>) {
    for window in 1..=NUM_WINDOWS as i64 {
        let entity_ratio = completeness.valid_entity_ratio_by_window()[&window];
        let group_ratio = completeness.valid_entity_group_ratio_by_window()[&window];
        let group_granularity_ratio =
            completeness.valid_entity_ratio_with_group_granularity_by_window()[&window];
        if window == 3 || window == 4 || window == 20 {
            assert!((entity_ratio - 1.0 / 3.0).abs() < EPSILON, "window {}", window);
            assert!(group_granularity_ratio.abs() < EPSILON, "window {}", window);
            assert!(group_ratio.abs() < EPSILON, "window {}", window);
        } else {
            assert!((entity_ratio - 2.0 / 3.0).abs() < EPSILON, "window {}", window);
            assert!(
                (group_granularity_ratio - 1.0 / 3.0).abs() < EPSILON,
                "window {}",
                window
            );
            assert!((group_ratio - 0.5).abs() < EPSILON, "window {}", window);
        }
    }
}

#[test]
fn test_full_group_coverage_required() {
    let aggregator = prepare_env();
    // g1 is never fully present (ENTITY2 has no data), so a group ratio of 1
    // disqualifies every window.
    let completeness =
        aggregator.completeness(-1, i64::MAX, &options(0.5, 1.0, Granularity::Entity));
    assert!(completeness.valid_window_indexes().is_empty());
    assert!(completeness.valid_entities().is_empty());
    assert!(completeness.valid_entity_groups().is_empty());
    assert_ratios_by_window(&completeness);
}

#[test]
fn test_entity_ratio_excludes_sparse_windows() {
    let aggregator = prepare_env();
    let completeness =
        aggregator.completeness(-1, i64::MAX, &options(0.5, 0.0, Granularity::Entity));
    assert_eq!(completeness.valid_window_indexes().len(), 17);
    assert!(!completeness.valid_window_indexes().contains(&3));
    assert!(!completeness.valid_window_indexes().contains(&4));
    assert!(!completeness.valid_window_indexes().contains(&20));
    assert_eq!(completeness.valid_entities().len(), 2);
    assert!(completeness.valid_entities().contains(&ENTITY1));
    assert!(completeness.valid_entities().contains(&ENTITY3));
    assert_eq!(completeness.valid_entity_groups().len(), 1);
    assert!(completeness.valid_entity_groups().contains(&ENTITY3.group()));
    assert_ratios_by_window(&completeness);
}

#[test]
fn test_group_ratio_excludes_sparse_windows() {
    let aggregator = prepare_env();
    let completeness =
        aggregator.completeness(-1, i64::MAX, &options(0.0, 0.5, Granularity::Entity));
    assert_eq!(completeness.valid_window_indexes().len(), 17);
    assert!(!completeness.valid_window_indexes().contains(&3));
    assert!(!completeness.valid_window_indexes().contains(&4));
    assert!(!completeness.valid_window_indexes().contains(&20));
    assert_eq!(completeness.valid_entities().len(), 2);
    assert!(completeness.valid_entities().contains(&ENTITY1));
    assert!(completeness.valid_entities().contains(&ENTITY3));
    assert_eq!(completeness.valid_entity_groups().len(), 1);
    assert!(completeness.valid_entity_groups().contains(&ENTITY3.group()));
    assert_ratios_by_window(&completeness);
}

#[test]
fn test_zero_thresholds_accept_all_windows() {
    let aggregator = prepare_env();
    let completeness =
        aggregator.completeness(-1, i64::MAX, &options(0.0, 0.0, Granularity::Entity));
    assert_eq!(completeness.valid_window_indexes().len(), NUM_WINDOWS);
    // ENTITY3 misses windows 3, 4, and 20, which now count as valid
    assert_eq!(completeness.valid_entities().len(), 1);
    assert!(completeness.valid_entities().contains(&ENTITY1));
    assert!(completeness.valid_entity_groups().is_empty());
    assert_ratios_by_window(&completeness);
}

#[test]
fn test_group_granularity_disqualifies_partial_groups() {
    let aggregator = prepare_env();
    // Under group granularity the gating entity ratio is 1/3 (only g2 is
    // ever fully present), below the 0.5 threshold: no valid windows.
    let completeness = aggregator.completeness(
        -1,
        i64::MAX,
        &options(0.5, 0.0, Granularity::EntityGroup),
    );
    assert!(completeness.valid_window_indexes().is_empty());
    assert!(completeness.valid_entities().is_empty());
    assert!(completeness.valid_entity_groups().is_empty());
    assert_ratios_by_window(&completeness);
}

#[test]
fn test_group_granularity_with_lower_threshold() {
    let aggregator = prepare_env();
    let completeness = aggregator.completeness(
        -1,
        i64::MAX,
        &options(0.3, 0.0, Granularity::EntityGroup),
    );
    assert_eq!(completeness.valid_window_indexes().len(), 17);
    assert!(!completeness.valid_window_indexes().contains(&3));
    assert!(!completeness.valid_window_indexes().contains(&4));
    assert!(!completeness.valid_window_indexes().contains(&20));
    // Only ENTITY3's group is fully present in every valid window
    assert_eq!(completeness.valid_entities().len(), 1);
    assert!(completeness.valid_entities().contains(&ENTITY3));
    assert_eq!(completeness.valid_entity_groups().len(), 1);
    assert!(completeness.valid_entity_groups().contains(&ENTITY3.group()));
    assert_ratios_by_window(&completeness);
}

#[test]
fn test_completeness_never_fails_on_empty_store() {
    let config = AggregatorConfig {
        num_windows: NUM_WINDOWS,
        window_ms: WINDOW_MS,
        min_samples_per_window: MIN_SAMPLES_PER_WINDOW,
        ..AggregatorConfig::default()
    };
    let aggregator: SampleAggregator<IntEntity> =
        SampleAggregator::new(config, test_registry()).unwrap();
    let completeness =
        aggregator.completeness(-1, i64::MAX, &options(0.0, 0.0, Granularity::Entity));
    assert!(completeness.valid_window_indexes().is_empty());
    assert!(completeness.valid_entities().is_empty());
    assert!(completeness.valid_entity_ratio_by_window().is_empty());
}

#[test]
fn test_completeness_cache() {
    let aggregator = prepare_env();
    let query = options(0.5, 0.0, Granularity::Entity);
    let first = aggregator.completeness(-1, i64::MAX, &query);
    let second = aggregator.completeness(-1, i64::MAX, &query);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(aggregator.stats().completeness_cache_hits, 1);
    assert_eq!(first.generation(), aggregator.generation());

    // A different option set computes fresh
    let other = aggregator.completeness(-1, i64::MAX, &query_with_lower_ratio());
    assert!(!Arc::ptr_eq(&first, &other));
}

fn query_with_lower_ratio() -> AggregationOptions<IntEntity> {
    let interested: HashSet<IntEntity> =
        [ENTITY1, ENTITY2, ENTITY3].into_iter().collect();
    AggregationOptions::new(
        0.1,
        0.0,
        NUM_WINDOWS,
        interested,
        Granularity::Entity,
        true,
    )
}
