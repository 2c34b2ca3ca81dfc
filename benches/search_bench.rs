//! Criterion benchmarks for Glaive.
//!
//! Covers text analysis, batch indexing, search with highlighting and
//! reader refresh.

use std::hint::black_box;
use std::sync::Arc;

use ahash::AHashSet;
use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use glaive::analysis::analyzer::Analyzer;
use glaive::analysis::analyzer::standard::StandardAnalyzer;
use glaive::config::EngineConfig;
use glaive::document::ContentRecord;
use glaive::engine::ContentIndex;
use glaive::search::highlight::Highlighter;
use glaive::storage::MemoryStorage;

const WORDS: [&str; 24] = [
    "search", "engine", "full", "text", "index", "query", "document", "field", "term", "segment",
    "manifest", "snapshot", "reader", "writer", "commit", "merge", "score", "ranking",
    "filter", "category", "author", "highlight", "fragment", "recovery",
];

/// Generate records with pseudo-random bodies of varying length.
fn generate_records(count: usize) -> Vec<ContentRecord> {
    let categories = ["news", "blog", "docs", "release"];
    let authors = ["alice", "bob", "carol"];

    (0..count)
        .map(|i| {
            let length = 40 + (i % 120);
            let body: Vec<&str> = (0..length)
                .map(|j| WORDS[(i * 7 + j * 13) % WORDS.len()])
                .collect();
            ContentRecord::new(
                format!("{} {}", WORDS[i % WORDS.len()], WORDS[(i * 5) % WORDS.len()]),
                body.join(" "),
            )
            .with_id(i as i64 + 1)
            .with_category(categories[i % categories.len()])
            .with_author(authors[i % authors.len()])
        })
        .collect()
}

fn create_index(records: &[ContentRecord]) -> ContentIndex {
    let index = ContentIndex::with_storage(
        Arc::new(MemoryStorage::new_default()),
        EngineConfig::default(),
    )
    .unwrap();
    index.reindex_all(&records.to_vec()).unwrap();
    index
}

fn bench_text_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_analysis");
    let analyzer = StandardAnalyzer::new();
    let records = generate_records(100);

    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("analyze_bodies", |b| {
        b.iter(|| {
            for record in &records {
                black_box(analyzer.terms(black_box(&record.body)).unwrap());
            }
        })
    });

    group.finish();
}

fn bench_indexing(c: &mut Criterion) {
    let mut group = c.benchmark_group("indexing");
    group.sample_size(20);
    let records = generate_records(500);

    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("reindex_500", |b| {
        b.iter_batched(
            || {
                ContentIndex::with_storage(
                    Arc::new(MemoryStorage::new_default()),
                    EngineConfig::default(),
                )
                .unwrap()
            },
            |index| black_box(index.reindex_all(&records).unwrap()),
            BatchSize::PerIteration,
        )
    });

    group.sample_size(10);
    group.bench_function("upsert_one_commit_each", |b| {
        let index = create_index(&records);
        let mut next = 0;
        b.iter(|| {
            let record = &records[next % records.len()];
            next += 1;
            index.index_content(black_box(record)).unwrap();
        })
    });

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let index = create_index(&generate_records(2000));

    group.bench_function("free_text", |b| {
        b.iter(|| black_box(index.search(Some("segment merge"), None, None, 20).unwrap()))
    });

    group.bench_function("free_text_with_filters", |b| {
        b.iter(|| {
            black_box(
                index
                    .search(Some("snapshot"), Some("docs"), Some("alice"), 20)
                    .unwrap(),
            )
        })
    });

    group.bench_function("filters_only", |b| {
        b.iter(|| black_box(index.search(None, Some("news"), None, 50).unwrap()))
    });

    group.bench_function("refresh_unchanged", |b| {
        b.iter(|| black_box(index.refresh().unwrap()))
    });

    group.finish();
}

fn bench_highlight(c: &mut Criterion) {
    let mut group = c.benchmark_group("highlight");
    let highlighter = Highlighter::new(Arc::new(StandardAnalyzer::new()));
    let body = generate_records(1)[0].body.repeat(5);
    let terms: AHashSet<String> = ["merge".to_string(), "recovery".to_string()]
        .into_iter()
        .collect();

    group.bench_function("best_fragment", |b| {
        b.iter(|| black_box(highlighter.highlight_body(black_box(&body), &terms)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_text_analysis,
    bench_indexing,
    bench_search,
    bench_highlight
);
criterion_main!(benches);
