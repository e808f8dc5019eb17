//! Benchmarks for the position-vector store's append/read hot path
//! (spec.md §4.3), across corpus sizes that mirror realistic indexing
//! runs.
//!
//! Run with: cargo bench --bench pv_bench

use std::fs::OpenOptions;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;

use archer::pv::Pv;

const POSTING_COUNTS: &[usize] = &[100, 1_000, 10_000];

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("pv_append");
    for &count in POSTING_COUNTS {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let dir = tempdir().unwrap();
                let mut blob = OpenOptions::new()
                    .create(true)
                    .read(true)
                    .write(true)
                    .truncate(true)
                    .open(dir.path().join("pv"))
                    .unwrap();
                let mut pv = Pv::init(&mut blob, 8).unwrap();
                for i in 0..count {
                    pv.append(&mut blob, black_box(i as i32), &[], 0).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_read_next(c: &mut Criterion) {
    let mut group = c.benchmark_group("pv_read_next");
    for &count in POSTING_COUNTS {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let dir = tempdir().unwrap();
            let mut blob = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(true)
                .open(dir.path().join("pv"))
                .unwrap();
            let mut pv = Pv::init(&mut blob, 8).unwrap();
            for i in 0..count {
                pv.append(&mut blob, i as i32, &[], 0).unwrap();
            }
            b.iter(|| {
                pv.rewind(&mut blob).unwrap();
                while let Some(p) = pv.read_next(&mut blob).unwrap() {
                    black_box(p);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_append, bench_read_next);
criterion_main!(benches);
