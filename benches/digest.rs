//! Performance benchmarks for streaming fixity digests.
//!
//! Run with: `cargo bench --bench digest`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | md5 accumulate | >400 MB/s | Bound by the hash, not the chunking |
//! | sha256 accumulate | >200 MB/s | Software implementation |
//! | In-memory content digest | <5ms for 1 MiB | Through the `ContentStore` stream |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use fixity_spider::{
    FixityAlgorithm, FixityAuditor, InMemoryCatalog, InMemoryContentStore, ObjectRecord,
};

const SIZES: [usize; 3] = [4 * 1024, 256 * 1024, 4 * 1024 * 1024];

fn bench_accumulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulate");

    for algorithm in [FixityAlgorithm::Md5, FixityAlgorithm::Sha256] {
        for size in SIZES {
            let data = vec![0x5au8; size];
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(algorithm.name(), size),
                &data,
                |b, data| {
                    b.iter(|| {
                        let mut acc = algorithm.accumulator();
                        // Feed in network-sized pieces, as a response body would arrive.
                        for piece in data.chunks(16 * 1024) {
                            acc.update(black_box(piece));
                        }
                        acc.finalize_hex()
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_content_digest(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let size = 1024 * 1024;
    let catalog = Arc::new(InMemoryCatalog::new());
    let content = Arc::new(InMemoryContentStore::with_chunk_size(64 * 1024));
    catalog.add_object("obj-1", ObjectRecord::new("obj-1").with_fixity("md5", "0".repeat(32)));
    content.insert("obj-1", vec![1u8; size]);
    let auditor = FixityAuditor::new(catalog, content);

    let mut group = c.benchmark_group("content_digest");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("stream_1mib", |b| {
        b.iter(|| runtime.block_on(auditor.compute_digest(black_box("obj-1"))).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_accumulate, bench_content_digest);
criterion_main!(benches);
