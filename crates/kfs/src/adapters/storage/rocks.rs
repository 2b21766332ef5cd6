//! # RocksDB Storage Adapter
//!
//! RocksDB implementation of the KeyValueStore trait, one database per
//! S-bucket directory.
//!
//! ## Configuration
//!
//! Tuned for large sequential values (file chunks):
//! - Compression off (chunks are usually already compressed)
//! - Bloom filters (10 bits per key) for `exists` checks
//! - Optional fsync on write

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::path::{Path, PathBuf};

/// RocksDB configuration for one S-bucket.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: PathBuf,
    /// Block cache size in bytes (default: 8MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 4MB)
    pub write_buffer_size: usize,
    /// Enable fsync after each write
    pub sync_writes: bool,
}

impl RocksDbConfig {
    pub fn new(path: impl AsRef<Path>, sync_writes: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes,
        }
    }
}

/// RocksDB-backed key-value store implementing the KeyValueStore trait
pub struct RocksDbStore {
    db: DB,
    config: RocksDbConfig,
}

fn io_error(context: &str, err: rocksdb::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: format!("RocksDB {} failed: {}", context, err),
    }
}

impl RocksDbStore {
    /// Open or create a RocksDB database
    pub fn open(config: RocksDbConfig) -> Result<Self, KVStoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::None);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, &config.path).map_err(|e| io_error("open", e))?;
        Ok(Self { db, config })
    }

    fn write_options(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.db.get(key).map_err(|e| io_error("get", e))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| io_error("put", e))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(|e| io_error("delete", e))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut batch = WriteBatch::default();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => batch.put(&key, &value),
                BatchOperation::Delete { key } => batch.delete(&key),
            }
        }
        self.db
            .write_opt(batch, &self.write_options())
            .map_err(|e| io_error("batch write", e))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.db
            .get_pinned(key)
            .map(|v| v.is_some())
            .map_err(|e| io_error("exists check", e))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        let mut results = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(|e| io_error("scan", e))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }

    fn prefix_sizes(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, u64)>, KVStoreError> {
        // Raw iterator: values are borrowed from RocksDB, never copied out.
        let mut sizes = Vec::new();
        let mut iter = self.db.raw_iterator();
        iter.seek(prefix);
        while iter.valid() {
            let (Some(key), Some(value)) = (iter.key(), iter.value()) else {
                break;
            };
            if !key.starts_with(prefix) {
                break;
            }
            sizes.push((key.to_vec(), value.len() as u64));
            iter.next();
        }
        iter.status().map_err(|e| io_error("size scan", e))?;
        Ok(sizes)
    }

    fn approximate_size(&self) -> Result<u64, KVStoreError> {
        let live = self
            .db
            .property_int_value("rocksdb.estimate-live-data-size")
            .map_err(|e| io_error("size estimate", e))?;
        let unflushed = self
            .db
            .property_int_value("rocksdb.cur-size-all-mem-tables")
            .map_err(|e| io_error("size estimate", e))?;
        Ok(live.unwrap_or(0) + unflushed.unwrap_or(0))
    }

    fn compact(&mut self) -> Result<(), KVStoreError> {
        self.db.compact_range(None::<&[u8]>, None::<&[u8]>);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rocksdb_basic_operations() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RocksDbStore::open(RocksDbConfig::new(temp_dir.path(), false)).unwrap();

        store.put(b"key1", b"value1").unwrap();
        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));

        assert!(store.exists(b"key1").unwrap());
        assert!(!store.exists(b"nonexistent").unwrap());

        store.delete(b"key1").unwrap();
        assert!(!store.exists(b"key1").unwrap());
    }

    #[test]
    fn test_rocksdb_prefix_scan() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RocksDbStore::open(RocksDbConfig::new(temp_dir.path(), false)).unwrap();

        let ops = vec![
            BatchOperation::put(b"k1 000001", b"data1"),
            BatchOperation::put(b"k1 000002", b"data2"),
            BatchOperation::put(b"tx:0001", b"tx_data"),
        ];
        store.atomic_batch_write(ops).unwrap();

        let results = store.prefix_scan(b"k1 ").unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_rocksdb_prefix_sizes_match_values() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = RocksDbStore::open(RocksDbConfig::new(temp_dir.path(), false)).unwrap();

        store.put(b"k1 000000", &[0u8; 4096]).unwrap();
        store.put(b"k1 000001", &[1u8; 17]).unwrap();
        store.put(b"k2 000000", b"other").unwrap();

        let sizes = store.prefix_sizes(b"k1 ").unwrap();
        assert_eq!(
            sizes,
            vec![(b"k1 000000".to_vec(), 4096), (b"k1 000001".to_vec(), 17)]
        );
        assert_eq!(store.prefix_sizes(b"").unwrap().len(), 3);
        assert!(store.prefix_sizes(b"zz").unwrap().is_empty());
    }
}
