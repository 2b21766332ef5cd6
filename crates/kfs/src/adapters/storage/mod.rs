//! Storage Adapters
//!
//! Implementations of the `KeyValueStore` trait and backend selection.

mod log;
mod memory;
#[cfg(feature = "rocksdb")]
mod rocks;

pub use log::LogStore;
pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use rocks::{RocksDbConfig, RocksDbStore};

use std::path::Path;

use crate::domain::{KVStoreError, StoreBackend};
use crate::ports::KeyValueStore;

/// Opens the store for one S-bucket directory.
pub fn open_store(
    backend: StoreBackend,
    path: &Path,
    sync_writes: bool,
) -> Result<Box<dyn KeyValueStore>, KVStoreError> {
    Ok(match backend {
        StoreBackend::Log => Box::new(LogStore::open(path, sync_writes)?),
        StoreBackend::Memory => Box::new(InMemoryKVStore::new()),
        #[cfg(feature = "rocksdb")]
        StoreBackend::RocksDb => {
            Box::new(RocksDbStore::open(RocksDbConfig::new(path, sync_writes))?)
        }
    })
}
