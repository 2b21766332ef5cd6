//! # Table Directory Locking
//!
//! Prevents multiple processes from opening the same table.
//!
//! ## Modules
//!
//! - `flock`: TableLock implementation using fs2

mod flock;

pub use flock::{LockError, TableLock, DEFAULT_LOCK_TIMEOUT};
