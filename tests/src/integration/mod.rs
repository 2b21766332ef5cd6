//! Cross-module flows exercised through the public `kfs` API.

pub mod concurrency;
pub mod flows;

use kfs::{BTable, KfsOptions, StoreBackend};
use rand::{Rng, SeedableRng};

/// Deterministic pseudo-random payload.
pub fn payload(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// A log-backed table in a fresh temp directory.
pub fn log_table(chunk_size: usize) -> (tempfile::TempDir, BTable) {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = KfsOptions::for_testing()
        .with_backend(StoreBackend::Log)
        .with_chunk_size(chunk_size);
    let table = BTable::open(dir.path().join("store"), options).expect("open table");
    (dir, table)
}
