use std::collections::HashMap;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use loadwatch::aggregation::SampleAggregator;
use loadwatch::config::AggregatorConfig;
use loadwatch::metrics::{AggregationStrategy, MetricRegistry};
use loadwatch::types::{Entity, Sample};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BenchEntity(u32);

impl Entity for BenchEntity {
    type Group = u32;

    fn group(&self) -> u32 {
        self.0 / 16
    }
}

fn bench_registry() -> Arc<MetricRegistry> {
    let mut registry = MetricRegistry::new();
    registry.register("cpu", AggregationStrategy::Avg).unwrap();
    registry
        .register("bytes_in", AggregationStrategy::Avg)
        .unwrap();
    registry
        .register("bytes_out", AggregationStrategy::Avg)
        .unwrap();
    registry.register("disk", AggregationStrategy::Latest).unwrap();
    Arc::new(registry)
}

fn bench_ingestion(c: &mut Criterion) {
    let config = AggregatorConfig {
        num_windows: 20,
        window_ms: 60_000,
        min_samples_per_window: 4,
        ..AggregatorConfig::default()
    };
    let registry = bench_registry();

    c.bench_function("add_sample", |b| {
        let aggregator = SampleAggregator::new(config.clone(), registry.clone()).unwrap();
        let mut time_ms: i64 = 60_000;
        b.iter(|| {
            time_ms += 50;
            let entity = BenchEntity((time_ms % 64) as u32);
            let mut values = HashMap::with_capacity(4);
            for id in 0..4 {
                values.insert(id, time_ms as f64 * 0.001);
            }
            black_box(aggregator.add(Sample::new(entity, time_ms, values)))
        });
    });
}

criterion_group!(benches, bench_ingestion);
criterion_main!(benches);
