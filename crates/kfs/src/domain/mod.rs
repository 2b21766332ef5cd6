//! # Domain Layer
//!
//! Errors, configuration and report types. No I/O lives here.

pub mod config;
pub mod errors;
pub mod types;

pub use config::{KfsOptions, StoreBackend};
pub use errors::{is_not_found_error, KVStoreError, KfsError};
pub use types::{KeyStat, SBucketList, SBucketSelector, SBucketStat, SBucketStats};

/// Result alias for store operations.
pub type Result<T, E = KfsError> = std::result::Result<T, E>;
