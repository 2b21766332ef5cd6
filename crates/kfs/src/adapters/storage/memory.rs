use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;

/// In-memory key-value store.
///
/// Backs [`StoreBackend::Memory`](crate::StoreBackend::Memory) S-buckets and
/// unit tests. Ordered so scans match the on-disk stores.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    size: u64,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let added = (key.len() + value.len()) as u64;
        if let Some(old) = self.data.insert(key.clone(), value) {
            self.size -= (key.len() + old.len()) as u64;
        }
        self.size += added;
    }

    fn remove(&mut self, key: &[u8]) {
        if let Some(old) = self.data.remove(key) {
            self.size -= (key.len() + old.len()) as u64;
        }
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => self.insert(key, value),
                BatchOperation::Delete { key } => self.remove(&key),
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, KVStoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn prefix_sizes(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, u64)>, KVStoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.len() as u64))
            .collect())
    }

    fn approximate_size(&self) -> Result<u64, KVStoreError> {
        Ok(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_kv_store() {
        let mut store = InMemoryKVStore::new();

        store.put(b"key1", b"value1").unwrap();
        store.put(b"key2", b"value2").unwrap();

        assert_eq!(store.get(b"key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get(b"key2").unwrap(), Some(b"value2".to_vec()));
        assert_eq!(store.get(b"key3").unwrap(), None);

        assert!(store.exists(b"key1").unwrap());
        assert!(!store.exists(b"key3").unwrap());
    }

    #[test]
    fn test_in_memory_kv_batch_write() {
        let mut store = InMemoryKVStore::new();

        let ops = vec![
            BatchOperation::put(b"a", b"1"),
            BatchOperation::put(b"b", b"2"),
            BatchOperation::put(b"c", b"3"),
            BatchOperation::delete(b"b"),
        ];

        store.atomic_batch_write(ops).unwrap();

        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), None);
        assert_eq!(store.get(b"c").unwrap(), Some(b"3".to_vec()));
    }

    #[test]
    fn test_prefix_scan_is_ordered() {
        let mut store = InMemoryKVStore::new();

        store.put(b"k1 2", b"data2").unwrap();
        store.put(b"k1 1", b"data1").unwrap();
        store.put(b"k2 1", b"other").unwrap();

        let chunks = store.prefix_scan(b"k1 ").unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].0, b"k1 1".to_vec());

        assert_eq!(store.prefix_scan(b"").unwrap().len(), 3);
    }

    #[test]
    fn test_size_tracks_overwrites_and_deletes() {
        let mut store = InMemoryKVStore::new();

        store.put(b"k", b"1234").unwrap();
        assert_eq!(store.approximate_size().unwrap(), 5);

        store.put(b"k", b"12").unwrap();
        assert_eq!(store.approximate_size().unwrap(), 3);

        store.delete(b"k").unwrap();
        store.delete(b"missing").unwrap();
        assert_eq!(store.approximate_size().unwrap(), 0);
    }
}
