//! # Table Configuration
//!
//! All values have defaults matching the table geometry in
//! [`constants`](crate::constants).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{C, S, SBUCKET_IDLE};

/// Backing store used for each S-bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Append-only record log per S-bucket (default).
    #[default]
    Log,
    /// Process memory only. Contents are lost when the table is dropped.
    Memory,
    /// RocksDB database per S-bucket.
    #[cfg(feature = "rocksdb")]
    RocksDb,
}

impl StoreBackend {
    /// Whether closing an S-bucket releases its data to disk.
    ///
    /// A non-persistent bucket is never closed by the idle reaper.
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StoreBackend::Memory)
    }
}

/// Configuration for a B-table and its S-buckets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KfsOptions {
    /// Reference id for a new table (default: random).
    ///
    /// Ignored when opening an existing table; its `r.id` wins.
    pub reference_id: Option<String>,

    /// Maximum bytes per S-bucket (default: 32 GiB).
    pub max_sbucket_size: u64,

    /// Bytes per chunk (default: 128 KiB).
    pub chunk_size: usize,

    /// Zero-pad the last chunk of a file to `chunk_size` (default: false).
    pub pad_last_chunk: bool,

    /// Idle time before an open S-bucket is closed (default: 60s).
    ///
    /// `Duration::ZERO` disables idle closing.
    pub sbucket_idle: Duration,

    /// Backing store for S-buckets.
    pub backend: StoreBackend,

    /// fsync each write (default: false).
    pub sync_writes: bool,

    /// Hold an exclusive lock on the table directory (default: true).
    pub lock_table: bool,
}

impl Default for KfsOptions {
    fn default() -> Self {
        Self {
            reference_id: None,
            max_sbucket_size: S,
            chunk_size: C as usize,
            pad_last_chunk: false,
            sbucket_idle: SBUCKET_IDLE,
            backend: StoreBackend::default(),
            sync_writes: false,
            lock_table: true,
        }
    }
}

impl KfsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small chunks, memory-backed, no lock: for tests.
    pub fn for_testing() -> Self {
        Self {
            chunk_size: 16,
            backend: StoreBackend::Memory,
            lock_table: false,
            ..Self::default()
        }
    }

    pub fn with_reference_id(mut self, rid: impl Into<String>) -> Self {
        self.reference_id = Some(rid.into());
        self
    }

    pub fn with_max_sbucket_size(mut self, bytes: u64) -> Self {
        self.max_sbucket_size = bytes;
        self
    }

    /// Set the chunk size. Zero is clamped to one byte.
    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn with_pad_last_chunk(mut self, pad: bool) -> Self {
        self.pad_last_chunk = pad;
        self
    }

    pub fn with_sbucket_idle(mut self, idle: Duration) -> Self {
        self.sbucket_idle = idle;
        self
    }

    pub fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    pub fn with_lock_table(mut self, lock: bool) -> Self {
        self.lock_table = lock;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_geometry() {
        let opts = KfsOptions::default();
        assert_eq!(opts.max_sbucket_size, 32 * 1024 * 1024 * 1024);
        assert_eq!(opts.chunk_size, 131_072);
        assert_eq!(opts.sbucket_idle, Duration::from_secs(60));
        assert_eq!(opts.backend, StoreBackend::Log);
        assert!(!opts.pad_last_chunk);
        assert!(opts.lock_table);
    }

    #[test]
    fn test_builder_chain() {
        let opts = KfsOptions::new()
            .with_chunk_size(0)
            .with_pad_last_chunk(true)
            .with_backend(StoreBackend::Memory)
            .with_sbucket_idle(Duration::ZERO);
        assert_eq!(opts.chunk_size, 1);
        assert!(opts.pad_last_chunk);
        assert!(!opts.backend.is_persistent());
        assert!(opts.sbucket_idle.is_zero());
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(serde_json::to_string(&StoreBackend::Log).unwrap(), "\"log\"");
        let backend: StoreBackend = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(backend, StoreBackend::Memory);
    }
}
