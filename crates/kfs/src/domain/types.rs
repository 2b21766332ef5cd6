//! # Report Types
//!
//! Values returned by `stat` and `list`.

use serde::{Deserialize, Serialize};

/// Space accounting for one S-bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SBucketStats {
    /// Bytes of keys and values stored.
    pub used: u64,
    /// Bytes left before the S-bucket is full.
    pub free: u64,
}

/// [`SBucketStats`] tagged with the S-bucket's position in the B-table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SBucketStat {
    pub sbucket_index: usize,
    pub stats: SBucketStats,
}

/// One stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStat {
    /// File key (40 hex characters).
    pub base_key: String,
    /// Sum of the file's chunk sizes, including padding.
    pub approximate_size: u64,
}

/// Files stored in one S-bucket, sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SBucketList {
    pub sbucket_index: usize,
    pub keys: Vec<KeyStat>,
}

/// Which S-buckets a `stat` or `list` call covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SBucketSelector<'a> {
    /// The S-bucket a file key routes to.
    Key(&'a str),
    /// A specific S-bucket.
    Index(usize),
    /// Every S-bucket present on disk or open in memory.
    All,
}
