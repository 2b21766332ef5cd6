//! # B-Table
//!
//! The top level of the store: `B` S-buckets under one directory. A file key
//! routes to the S-bucket whose index is the XOR of the first byte of the
//! key and the first byte of the table's reference id.
//!
//! ## Layout
//!
//! ```text
//! store.kfs/
//! ├── r.id        reference id (40 hex characters)
//! ├── LOCK        process lock (feature "locking")
//! ├── 000.s/      S-bucket 0
//! └── 0a7.s/ ...
//! ```
//!
//! S-buckets are created on first use and cached. Idle ones can be closed
//! with [`BTable::close_idle`] or a background [`IdleReaper`].

mod reaper;


pub use reaper::IdleReaper;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

#[cfg(feature = "locking")]
use crate::adapters::lock::{TableLock, DEFAULT_LOCK_TIMEOUT};
use crate::blockstream::{ReadableFileStream, WritableFileStream};
use crate::constants::{B, REFERENCE_ID_FILE};
use crate::domain::{
    KfsError, KfsOptions, Result, SBucketList, SBucketSelector, SBucketStat,
};
use crate::sbucket::SBucket;
use crate::utils::{
    coerce_key_bytes, coerce_table_path, create_reference_id, create_sbucket_name_from_index,
    existing_sbucket_indexes, file_does_exist, init_btable_directory, read_reference_id,
    validate_table_path,
};

pub struct BTable {
    table_path: PathBuf,
    reference_id: String,
    rid_prefix: u8,
    options: Arc<KfsOptions>,
    sbuckets: RwLock<HashMap<usize, Arc<SBucket>>>,
    #[cfg(feature = "locking")]
    _lock: Option<TableLock>,
}

impl std::fmt::Debug for BTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BTable")
            .field("table_path", &self.table_path)
            .field("reference_id", &self.reference_id)
            .field("cached_sbuckets", &self.sbuckets.read().len())
            .finish()
    }
}

impl BTable {
    /// Opens the table at `table_path`, creating it if needed.
    ///
    /// A `.kfs` extension is appended when missing. A new table gets its
    /// reference id from `options.reference_id`, or a random one.
    pub fn open(table_path: impl AsRef<Path>, options: KfsOptions) -> Result<Self> {
        let table_path = coerce_table_path(table_path);

        if file_does_exist(table_path.join(REFERENCE_ID_FILE)) {
            validate_table_path(&table_path)?;
        } else {
            if table_path.exists() && !table_path.is_dir() {
                return Err(KfsError::TablePathNotADirectory { path: table_path });
            }
            let rid = create_reference_id(options.reference_id.as_deref())?;
            init_btable_directory(&table_path, &rid)?;
            debug!("[kfs] Initialized table {}", table_path.display());
        }

        let reference_id = read_reference_id(&table_path)?;
        if let Some(requested) = options.reference_id.as_deref() {
            if !requested.eq_ignore_ascii_case(&reference_id) {
                warn!(
                    "[kfs] Ignoring reference id {}: {} already uses {}",
                    requested,
                    table_path.display(),
                    reference_id
                );
            }
        }

        #[cfg(feature = "locking")]
        let lock = if options.lock_table {
            Some(TableLock::acquire(&table_path, DEFAULT_LOCK_TIMEOUT)?)
        } else {
            None
        };

        info!(
            "[kfs] Opened table {} (rid {}, backend {:?})",
            table_path.display(),
            reference_id,
            options.backend
        );

        Ok(Self {
            rid_prefix: coerce_key_bytes(&reference_id)[0],
            table_path,
            reference_id,
            options: Arc::new(options),
            sbuckets: RwLock::new(HashMap::new()),
            #[cfg(feature = "locking")]
            _lock: lock,
        })
    }

    /// Opens a table that must already exist.
    ///
    /// Fails instead of creating a new table when `table_path` (after `.kfs`
    /// coercion) is missing or lacks an `r.id`.
    pub fn open_existing(table_path: impl AsRef<Path>, options: KfsOptions) -> Result<Self> {
        let table_path = coerce_table_path(table_path);
        validate_table_path(&table_path)?;
        Self::open(table_path, options)
    }

    pub fn path(&self) -> &Path {
        &self.table_path
    }

    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    pub fn options(&self) -> &KfsOptions {
        &self.options
    }

    /// Index of the S-bucket that stores `key`.
    pub fn sbucket_index_for_key(&self, key: &str) -> usize {
        (coerce_key_bytes(key)[0] ^ self.rid_prefix) as usize
    }

    /// The S-bucket that stores `key`.
    pub fn get_sbucket_for_key(&self, key: &str) -> Result<Arc<SBucket>> {
        self.get_sbucket_at_index(self.sbucket_index_for_key(key))
    }

    /// The S-bucket at `index`, opening it on first use.
    pub fn get_sbucket_at_index(&self, index: usize) -> Result<Arc<SBucket>> {
        if index >= B {
            return Err(KfsError::SBucketIndexOutOfRange { index, max: B });
        }
        if let Some(sbucket) = self.sbuckets.read().get(&index) {
            return Ok(Arc::clone(sbucket));
        }

        let mut sbuckets = self.sbuckets.write();
        if let Some(sbucket) = sbuckets.get(&index) {
            return Ok(Arc::clone(sbucket));
        }
        let sbucket = Arc::new(SBucket::new(
            index,
            self.table_path.join(create_sbucket_name_from_index(index)),
            Arc::clone(&self.options),
        ));
        sbucket.open()?;
        sbuckets.insert(index, Arc::clone(&sbucket));
        Ok(sbucket)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        self.get_sbucket_for_key(key)?.exists(key)
    }

    pub fn unlink(&self, key: &str) -> Result<()> {
        self.get_sbucket_for_key(key)?.unlink(key)
    }

    pub fn read_file(&self, key: &str) -> Result<Vec<u8>> {
        self.get_sbucket_for_key(key)?.read_file(key)
    }

    pub fn write_file(&self, key: &str, data: &[u8]) -> Result<()> {
        self.get_sbucket_for_key(key)?.write_file(key, data)
    }

    pub fn create_read_stream(&self, key: &str) -> Result<ReadableFileStream> {
        self.get_sbucket_for_key(key)?.create_read_stream(key)
    }

    pub fn create_write_stream(&self, key: &str) -> Result<WritableFileStream> {
        self.get_sbucket_for_key(key)?.create_write_stream(key)
    }

    /// Space used by the selected S-buckets, in index order.
    pub fn stat(&self, selector: SBucketSelector<'_>) -> Result<Vec<SBucketStat>> {
        self.selected_indexes(selector)?
            .into_iter()
            .map(|index| {
                let stats = self.get_sbucket_at_index(index)?.stat()?;
                Ok(SBucketStat {
                    sbucket_index: index,
                    stats,
                })
            })
            .collect()
    }

    /// Files stored in the selected S-buckets, in index order.
    pub fn list(&self, selector: SBucketSelector<'_>) -> Result<Vec<SBucketList>> {
        self.selected_indexes(selector)?
            .into_iter()
            .map(|index| {
                let keys = self.get_sbucket_at_index(index)?.list()?;
                Ok(SBucketList {
                    sbucket_index: index,
                    keys,
                })
            })
            .collect()
    }

    /// Compacts every S-bucket in the table.
    pub fn flush(&self) -> Result<()> {
        for index in self.selected_indexes(SBucketSelector::All)? {
            self.get_sbucket_at_index(index)?.flush()?;
        }
        Ok(())
    }

    /// Closes S-buckets idle for at least `sbucket_idle` as of `now`.
    ///
    /// S-buckets referenced by a live stream are skipped. Returns how many
    /// were closed.
    pub fn close_idle(&self, now: Instant) -> Result<usize> {
        if !self.options.backend.is_persistent() || self.options.sbucket_idle.is_zero() {
            return Ok(0);
        }

        let mut sbuckets = self.sbuckets.write();
        let idle: Vec<usize> = sbuckets
            .iter()
            .filter(|(_, sbucket)| {
                Arc::strong_count(sbucket) == 1
                    && sbucket.idle_for(now) >= self.options.sbucket_idle
            })
            .map(|(index, _)| *index)
            .collect();

        for index in &idle {
            if let Some(sbucket) = sbuckets.remove(index) {
                sbucket.close()?;
            }
        }
        if !idle.is_empty() {
            debug!("[kfs] Closed {} idle S-buckets", idle.len());
        }
        Ok(idle.len())
    }

    /// Closes every cached S-bucket.
    pub fn close(&self) -> Result<()> {
        for sbucket in self.sbuckets.read().values() {
            sbucket.close()?;
        }
        debug!("[kfs] Closed table {}", self.table_path.display());
        Ok(())
    }

    /// Number of S-buckets currently cached.
    pub fn cached_sbuckets(&self) -> usize {
        self.sbuckets.read().len()
    }

    fn selected_indexes(&self, selector: SBucketSelector<'_>) -> Result<Vec<usize>> {
        match selector {
            SBucketSelector::Key(key) => Ok(vec![self.sbucket_index_for_key(key)]),
            SBucketSelector::Index(index) if index >= B => {
                Err(KfsError::SBucketIndexOutOfRange { index, max: B })
            }
            SBucketSelector::Index(index) => Ok(vec![index]),
            SBucketSelector::All => {
                let mut indexes: BTreeSet<usize> = existing_sbucket_indexes(&self.table_path)?
                    .into_iter()
                    .filter(|index| *index < B)
                    .collect();
                indexes.extend(self.sbuckets.read().keys().copied());
                Ok(indexes.into_iter().collect())
            }
        }
    }
}
