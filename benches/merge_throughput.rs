#![allow(dead_code, clippy::useless_vec)]

use bitemporal::core::batch::{merge_batch, parse_fact};
use bitemporal::core::sqlite_store::SqliteStore;
use bitemporal::core::time::Instant;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

fn facts_for_entity(entity_id: &str, count: usize) -> Vec<bitemporal::core::store::Fact> {
    (0..count)
        .map(|i| {
            let record = json!({
                "entity_id": entity_id,
                "event_time": format!("2025-01-{:02}T00:00:00Z", (i % 28) + 1),
                "status": if i % 2 == 0 { "ACTIVE" } else { "INACTIVE" },
            });
            parse_fact(record.as_object().unwrap()).unwrap()
        })
        .collect()
}

fn bench_merge_single_entity(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_single_entity_revisions");
    group.measurement_time(Duration::from_secs(10));

    for size in [10usize, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let dir = TempDir::new().unwrap();
                let mut store =
                    SqliteStore::open(dir.path().join("bench.sqlite"), "event_time").unwrap();
                let facts = facts_for_entity("EQ1", size);
                let summary = merge_batch(&mut store, facts, Instant::now(), true).unwrap();
                black_box(summary);
            });
        });
    }
    group.finish();
}

fn bench_merge_many_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_many_entities_single_batch");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("1000_entities_one_fact_each", |b| {
        b.iter(|| {
            let dir = TempDir::new().unwrap();
            let mut store =
                SqliteStore::open(dir.path().join("bench.sqlite"), "event_time").unwrap();
            let facts = (0..1000)
                .map(|i| facts_for_entity(&format!("EQ{i}"), 1).remove(0))
                .collect();
            let summary = merge_batch(&mut store, facts, Instant::now(), true).unwrap();
            black_box(summary);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_merge_single_entity,
    bench_merge_many_entities
);
criterion_main!(benches);
