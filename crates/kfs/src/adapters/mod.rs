//! # Adapters Module
//!
//! ## Modules
//!
//! - `storage`: `KeyValueStore` implementations backing S-buckets
//! - `lock`: table directory locking (singleton guard)

#[cfg(feature = "locking")]
pub mod lock;
pub mod storage;

#[cfg(feature = "locking")]
pub use lock::{LockError, TableLock};
pub use storage::{open_store, InMemoryKVStore, LogStore};
#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbStore};
