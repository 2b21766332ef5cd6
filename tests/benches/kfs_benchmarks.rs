//! # KFS Benchmarks
//!
//! | Benchmark | Measures |
//! |-----------|----------|
//! | write_file | Chunking and store writes per backend |
//! | read_file | Chunk reads per backend |
//! | sbucket_index_for_key | Key hashing and routing |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kfs::{BTable, KfsOptions, StoreBackend};
use rand::RngCore;
use std::time::Duration;

const SIZES: [usize; 3] = [4 * 1024, 128 * 1024, 1024 * 1024];

fn open(backend: StoreBackend) -> (tempfile::TempDir, BTable) {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = KfsOptions::new()
        .with_backend(backend)
        .with_lock_table(false);
    let table = BTable::open(dir.path().join("bench"), options).expect("open");
    (dir, table)
}

fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

fn bench_write_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_file");
    group.measurement_time(Duration::from_secs(5));

    for backend in [StoreBackend::Memory, StoreBackend::Log] {
        let (_dir, table) = open(backend);
        for size in SIZES {
            let data = random_bytes(size);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", backend), size),
                &data,
                |b, data| {
                    let mut i = 0u64;
                    b.iter(|| {
                        i += 1;
                        table.write_file(&format!("key-{}", i % 64), data).expect("write");
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_read_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_file");

    for backend in [StoreBackend::Memory, StoreBackend::Log] {
        let (_dir, table) = open(backend);
        for size in SIZES {
            let key = format!("read-{}", size);
            table.write_file(&key, &random_bytes(size)).expect("seed");
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_function(BenchmarkId::new(format!("{:?}", backend), size), |b| {
                b.iter(|| black_box(table.read_file(&key).expect("read")))
            });
        }
    }
    group.finish();
}

fn bench_routing(c: &mut Criterion) {
    let (_dir, table) = open(StoreBackend::Memory);
    c.bench_function("sbucket_index_for_key", |b| {
        b.iter(|| black_box(table.sbucket_index_for_key(black_box("some-file-name.bin"))))
    });
}

criterion_group!(benches, bench_write_file, bench_read_file, bench_routing);
criterion_main!(benches);
