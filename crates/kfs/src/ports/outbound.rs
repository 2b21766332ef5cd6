//! # Outbound Ports (Driven Ports)
//!
//! Storage an S-bucket requires from its host.

use crate::domain::errors::KVStoreError;

/// Key/value pairs returned by a scan, ordered by key.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Abstract interface for key-value database operations.
///
/// Production: `LogStore` or `RocksDbStore`
/// Testing: `InMemoryKVStore`
///
/// Keys are compared as raw bytes; scans return entries in ascending key
/// order.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch succeed, or NONE are applied.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError>;

    /// Iterate over keys with a prefix.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError>;

    /// Keys with a prefix and the length of their values.
    ///
    /// Used for listing without reading values back.
    fn prefix_sizes(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, u64)>, KVStoreError> {
        Ok(self
            .prefix_scan(prefix)?
            .into_iter()
            .map(|(k, v)| (k, v.len() as u64))
            .collect())
    }

    /// Bytes of live keys and values held by the store.
    fn approximate_size(&self) -> Result<u64, KVStoreError>;

    /// Reclaim space held by overwritten and deleted entries.
    fn compact(&mut self) -> Result<(), KVStoreError> {
        Ok(())
    }
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
        }
    }
}
