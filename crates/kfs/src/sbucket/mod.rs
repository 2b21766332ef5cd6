//! # S-Bucket
//!
//! One column of the B-table: a key-value store holding the chunks of every
//! file whose key routes to this column.
//!
//! The backing store is opened lazily and may be closed while idle; every
//! operation reopens it on demand, so a closed S-bucket is never an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::adapters::open_store;
use crate::blockstream::{ReadableFileStream, WritableFileStream};
use crate::constants::{ITEM_KEY_SEPARATOR, MAX_ITEM_INDEX};
use crate::domain::{KeyStat, KfsError, KfsOptions, Result, SBucketStats};
use crate::ports::{BatchOperation, KeyValueStore};
use crate::utils::{create_item_key_from_index, item_key_prefix};

#[cfg(test)]
mod tests;

pub struct SBucket {
    index: usize,
    path: PathBuf,
    options: Arc<KfsOptions>,
    store: RwLock<Option<Box<dyn KeyValueStore>>>,
    last_used: Mutex<Instant>,
}

impl std::fmt::Debug for SBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SBucket")
            .field("index", &self.index)
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

impl SBucket {
    /// Creates a closed S-bucket rooted at `path`.
    pub fn new(index: usize, path: impl Into<PathBuf>, options: Arc<KfsOptions>) -> Self {
        Self {
            index,
            path: path.into(),
            options,
            store: RwLock::new(None),
            last_used: Mutex::new(Instant::now()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &KfsOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.store.read().is_some()
    }

    /// Opens the backing store. Opening an open S-bucket is a no-op.
    pub fn open(&self) -> Result<()> {
        let mut store = self.store.write();
        if store.is_some() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.path)?;
        *store = Some(open_store(
            self.options.backend,
            &self.path,
            self.options.sync_writes,
        )?);
        self.touch();
        debug!("[kfs] Opened S-bucket {} at {}", self.index, self.path.display());
        Ok(())
    }

    /// Releases the backing store.
    ///
    /// Memory-backed S-buckets keep their store, since it is their only copy.
    pub fn close(&self) -> Result<()> {
        if !self.options.backend.is_persistent() {
            return Ok(());
        }
        if self.store.write().take().is_some() {
            debug!("[kfs] Closed S-bucket {}", self.index);
        }
        Ok(())
    }

    /// Time since the last operation.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_used.lock())
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&dyn KeyValueStore) -> std::result::Result<T, crate::KVStoreError>,
    ) -> Result<T> {
        self.touch();
        loop {
            {
                let guard = self.store.read();
                if let Some(store) = guard.as_deref() {
                    return Ok(f(store)?);
                }
            }
            self.open()?;
        }
    }

    fn with_store_mut<T>(
        &self,
        f: impl FnOnce(&mut dyn KeyValueStore) -> std::result::Result<T, crate::KVStoreError>,
    ) -> Result<T> {
        self.touch();
        loop {
            {
                let mut guard = self.store.write();
                if let Some(store) = guard.as_deref_mut() {
                    return Ok(f(store)?);
                }
            }
            self.open()?;
        }
    }

    /// Whether a file is stored under `key`.
    pub fn exists(&self, key: &str) -> Result<bool> {
        let item_key = create_item_key_from_index(key, 0)?;
        self.with_store(|store| store.exists(item_key.as_bytes()))
    }

    /// Deletes every chunk of the file stored under `key`.
    pub fn unlink(&self, key: &str) -> Result<()> {
        let prefix = item_key_prefix(key);
        self.with_store_mut(|store| {
            let deletes: Vec<_> = store
                .prefix_sizes(prefix.as_bytes())?
                .into_iter()
                .map(|(item_key, _)| BatchOperation::delete(item_key))
                .collect();
            if deletes.is_empty() {
                return Ok(());
            }
            trace!("[kfs] Unlinking {} chunks of {}", deletes.len(), prefix.trim_end());
            store.atomic_batch_write(deletes)
        })
    }

    /// Chunk `index` of the file under `key`, if present.
    pub fn read_chunk(&self, key: &str, index: u64) -> Result<Option<Vec<u8>>> {
        if index > MAX_ITEM_INDEX {
            return Ok(None);
        }
        let item_key = create_item_key_from_index(key, index)?;
        self.with_store(|store| store.get(item_key.as_bytes()))
    }

    /// Stores chunk `index` of the file under `key`.
    ///
    /// Fails with [`KfsError::SBucketFull`] if the S-bucket would exceed its
    /// configured capacity.
    pub fn write_chunk(&self, key: &str, index: u64, chunk: &[u8]) -> Result<()> {
        let item_key = create_item_key_from_index(key, index)?;
        let requested = (item_key.len() + chunk.len()) as u64;
        let max = self.options.max_sbucket_size;
        let sbucket_index = self.index;

        self.with_store_mut(|store| {
            let used = store.approximate_size()?;
            if used.saturating_add(requested) > max {
                return Ok(Err(KfsError::SBucketFull {
                    index: sbucket_index,
                    used,
                    requested,
                    max,
                }));
            }
            store.put(item_key.as_bytes(), chunk).map(Ok)
        })?
    }

    /// Reads the whole file stored under `key`.
    pub fn read_file(self: &Arc<Self>, key: &str) -> Result<Vec<u8>> {
        let mut stream = self.create_read_stream(key)?;
        let mut data = Vec::new();
        while let Some(chunk) = stream.next_chunk()? {
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    /// Replaces the file stored under `key` with `data`.
    pub fn write_file(self: &Arc<Self>, key: &str, data: &[u8]) -> Result<()> {
        let mut stream = self.create_write_stream(key)?;
        if let Err(err) = stream.push(data) {
            stream.destroy()?;
            return Err(err);
        }
        stream.finish()?;
        Ok(())
    }

    /// Streams the file stored under `key`.
    pub fn create_read_stream(self: &Arc<Self>, key: &str) -> Result<ReadableFileStream> {
        if !self.exists(key)? {
            return Err(KfsError::not_found(key));
        }
        Ok(ReadableFileStream::new(Arc::clone(self), key))
    }

    /// Opens a stream that replaces the file stored under `key`.
    pub fn create_write_stream(self: &Arc<Self>, key: &str) -> Result<WritableFileStream> {
        self.unlink(key)?;
        Ok(WritableFileStream::new(
            Arc::clone(self),
            key,
            self.options.chunk_size,
            self.options.pad_last_chunk,
        ))
    }

    /// Used and free bytes.
    pub fn stat(&self) -> Result<SBucketStats> {
        let used = self.with_store(|store| store.approximate_size())?;
        Ok(SBucketStats {
            used,
            free: self.options.max_sbucket_size.saturating_sub(used),
        })
    }

    /// Files stored in this S-bucket, sorted by key.
    pub fn list(&self) -> Result<Vec<KeyStat>> {
        let sizes = self.with_store(|store| store.prefix_sizes(b""))?;

        let mut files: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
        for (item_key, size) in sizes {
            let base = item_key
                .split(|b| *b == ITEM_KEY_SEPARATOR)
                .next()
                .unwrap_or_default();
            *files.entry(base.to_vec()).or_default() += size;
        }

        Ok(files
            .into_iter()
            .map(|(base_key, approximate_size)| KeyStat {
                base_key: String::from_utf8_lossy(&base_key).into_owned(),
                approximate_size,
            })
            .collect())
    }

    /// Compacts the backing store.
    pub fn flush(&self) -> Result<()> {
        self.with_store_mut(|store| store.compact())
    }
}
