//! B+tree benchmarks for TwigDB.
//!
//! The tree caps at 32 pages, so workloads stay small; the interesting
//! numbers are per-operation costs of slotted-cell inserts and of
//! descending through split-built levels.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use twigdb::BPlusTree;

fn scenario_keys(count: u64) -> Vec<u64> {
    // fixed pseudo-random order, unique keys
    (1..=count).map(|i| i * 13 % (count + 1)).collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_insert");

    for count in [10u64, 40].iter() {
        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(BenchmarkId::new("random", count), count, |b, &count| {
            let keys = scenario_keys(count);
            b.iter(|| {
                let mut tree = BPlusTree::create(5).unwrap();
                for &key in &keys {
                    tree.insert(key, b"bench-payload").unwrap();
                }
                black_box(tree)
            });
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_get");

    let keys = scenario_keys(40);
    let mut tree = BPlusTree::create(5).unwrap();
    for &key in &keys {
        tree.insert(key, b"bench-payload").unwrap();
    }

    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("point_reads", |b| {
        b.iter(|| {
            for &key in &keys {
                black_box(tree.get(black_box(key)).unwrap());
            }
        });
    });

    group.bench_function("range_scan", |b| {
        b.iter(|| black_box(tree.range_search(0, u64::MAX).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get);
criterion_main!(benches);
