//! # Kademlia File Store
//!
//! A local file store that shards files across a **B-table** of `B = 256`
//! **S-buckets**. Each file key is a 160-bit id; the S-bucket holding it is
//! chosen by XOR distance from the table's reference id, so a node stores
//! keys close to itself together.
//!
//! ## Architecture
//!
//! ```text
//! BTable ──sbucket_index_for_key──→ SBucket ──chunks──→ KeyValueStore
//!   │                                  │                  ├─ LogStore (default)
//!   │ r.id, LOCK                       │ "<key> <index>"  ├─ InMemoryKVStore
//!   │                                  │                  └─ RocksDbStore (feature)
//!   └─ IdleReaper (closes idle S-buckets)
//! ```
//!
//! Files are split into `C = 128 KiB` chunks and stored under item keys
//! `"<40 hex key> <6-digit index>"`. Keys that are not 40 hex characters are
//! hashed with RIPEMD-160 first.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Errors, options and report types
//! - `ports/` - The `KeyValueStore` trait S-buckets are written against
//! - `adapters/` - Store implementations and the table lock
//! - `btable/`, `sbucket/`, `blockstream/` - The store itself
//! - `utils/` - Key, naming and path helpers
//!
//! ## Usage
//!
//! ```no_run
//! use kfs::{KfsOptions, SBucketSelector};
//!
//! let table = kfs::open("/tmp/store", KfsOptions::default())?;
//! table.write_file("my-file", b"hello")?;
//! assert_eq!(table.read_file("my-file")?, b"hello");
//!
//! for stat in table.stat(SBucketSelector::All)? {
//!     println!("{}: {} bytes", stat.sbucket_index, stat.stats.used);
//! }
//! # Ok::<(), kfs::KfsError>(())
//! ```

pub mod adapters;
pub mod blockstream;
pub mod btable;
pub mod constants;
pub mod domain;
pub mod ports;
pub mod probe;
pub mod sbucket;
pub mod utils;

use std::path::Path;

pub use blockstream::{ReadableFileStream, WritableFileStream};
pub use btable::{BTable, IdleReaper};
pub use domain::{
    KVStoreError, KeyStat, KfsError, KfsOptions, Result, SBucketList,
    SBucketSelector, SBucketStat, SBucketStats, StoreBackend,
};
pub use ports::{BatchOperation, KeyValueStore};
pub use sbucket::SBucket;
pub use utils::{
    coerce_key, coerce_table_path, create_item_key_from_index, create_reference_id,
    create_sbucket_name_from_index, existing_sbucket_indexes, file_does_exist, hash_key,
    init_btable_directory, is_not_found_error, is_valid_key, parse_sbucket_index_from_path,
    to_human_readable_size, validate_sbucket_path, validate_table_path,
};

/// Opens (or creates) the table at `path`.
pub fn open(path: impl AsRef<Path>, options: KfsOptions) -> Result<BTable> {
    BTable::open(path, options)
}
