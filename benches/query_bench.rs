//! Benchmarks for the query executor's doc-at-a-time merge (spec.md
//! §4.8), across corpus sizes mirroring realistic indexed collections.
//!
//! Run with: cargo bench --bench query_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;

use archer::engine::Index;
use archer::indexer::index_document;
use archer::query::{execute, parse};

const CORPUS_SIZES: &[usize] = &[50, 500, 2_000];

const VOCAB: &[&str] = &[
    "rust", "search", "index", "query", "proximity", "field", "vector", "posting", "term", "doc",
];

fn build_corpus(doc_count: usize) -> (tempfile::TempDir, Index) {
    let dir = tempdir().unwrap();
    let mut index = Index::create(dir.path()).unwrap();
    for i in 0..doc_count {
        let text: String = (0..80)
            .map(|j| VOCAB[(i * 31 + j) % VOCAB.len()])
            .collect::<Vec<_>>()
            .join(" ");
        index_document(&mut index, &format!("doc-{i}"), &text).unwrap();
    }
    (dir, index)
}

fn bench_ranking_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_ranking");
    for &doc_count in CORPUS_SIZES {
        let (_dir, mut index) = build_corpus(doc_count);
        group.throughput(Throughput::Elements(doc_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &doc_count, |b, _| {
            let query = parse("rust search").unwrap();
            b.iter(|| black_box(execute(&mut index, &query).unwrap()));
        });
    }
    group.finish();
}

fn bench_phrase_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_phrase");
    for &doc_count in CORPUS_SIZES {
        let (_dir, mut index) = build_corpus(doc_count);
        group.throughput(Throughput::Elements(doc_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &doc_count, |b, _| {
            let query = parse("\"rust search index\"").unwrap();
            b.iter(|| black_box(execute(&mut index, &query).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ranking_query, bench_phrase_query);
criterion_main!(benches);
