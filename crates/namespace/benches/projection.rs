//! Benchmarks for listing projection.
//!
//! Compares rescanning the snapshot per cursor against a prebuilt index.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use namespace::{children_at, NamespaceIndex, PathCursor, StoredObject};

fn snapshot(count: usize) -> Vec<StoredObject> {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            let key = format!("dept{}/team{}/project{}/file{}.bin", i % 7, i % 31, i % 97, i);
            StoredObject::new(format!("obj{}", i), key, i as u64, created)
        })
        .collect()
}

fn bench_projection(c: &mut Criterion) {
    let mut group = c.benchmark_group("children_at");
    let cursor = PathCursor::parse("dept3/team10");

    for count in [1_000usize, 10_000, 50_000] {
        let objects = snapshot(count);

        group.bench_with_input(BenchmarkId::new("scan", count), &objects, |b, objects| {
            b.iter(|| children_at(black_box(objects), black_box(&cursor)).len())
        });

        let index = NamespaceIndex::build(&objects);
        group.bench_with_input(BenchmarkId::new("index", count), &index, |b, index| {
            b.iter(|| index.children_at(black_box(&cursor)).len())
        });
    }

    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let objects = snapshot(10_000);
    c.bench_function("index_build_10k", |b| {
        b.iter(|| NamespaceIndex::build(black_box(&objects)).len())
    });
}

criterion_group!(benches, bench_projection, bench_index_build);
criterion_main!(benches);
