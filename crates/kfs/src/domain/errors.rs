//! # Domain Errors
//!
//! Error types for the store, one enum per layer:
//!
//! - [`KfsError`]: table, S-bucket and helper failures
//! - [`KVStoreError`]: backing key-value store failures
//! - [`LockError`](crate::adapters::LockError): table directory locking

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[cfg(feature = "locking")]
use crate::adapters::LockError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum KfsError {
    /// No file is stored under this key.
    #[error("NotFound: no file stored under key {key}")]
    NotFound { key: String },

    /// Chunk index does not fit in the item key format.
    #[error("Chunk index {index} is out of bounds (max {max})")]
    IndexOutOfBounds { index: u64, max: u64 },

    /// Reference id is not a 160-bit hex string.
    #[error("Invalid reference id {rid:?}: expected 40 hex characters")]
    InvalidReferenceId { rid: String },

    /// S-bucket index outside the B-table.
    #[error("S-bucket index {index} is out of range (B = {max})")]
    SBucketIndexOutOfRange { index: usize, max: usize },

    /// Write would push the S-bucket past its capacity.
    #[error("S-bucket {index} is full: {used} bytes used, {requested} requested, {max} max")]
    SBucketFull {
        index: usize,
        used: u64,
        requested: u64,
        max: u64,
    },

    /// Table path exists but is not a directory.
    #[error("Table path is not a folder: {}", path.display())]
    TablePathNotADirectory { path: PathBuf },

    /// Table directory lacks a readable `r.id`.
    #[error("Table path does not contain a valid r.id: {}", path.display())]
    TablePathInvalid { path: PathBuf },

    /// Backing store failure.
    #[error(transparent)]
    Store(#[from] KVStoreError),

    /// Table directory lock failure.
    #[cfg(feature = "locking")]
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl KfsError {
    pub(crate) fn not_found(key: impl Into<String>) -> Self {
        KfsError::NotFound { key: key.into() }
    }

    /// Whether this error means "nothing stored here".
    pub fn is_not_found(&self) -> bool {
        match self {
            KfsError::NotFound { .. } => true,
            KfsError::Store(err) => err.is_not_found(),
            KfsError::Io(err) => err.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<KfsError> for io::Error {
    fn from(err: KfsError) -> Self {
        match err {
            KfsError::Io(inner) => inner,
            other if other.is_not_found() => io::Error::new(io::ErrorKind::NotFound, other),
            other => io::Error::other(other),
        }
    }
}

/// Key-value store errors.
#[derive(Debug, Clone, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },

    /// Key not found.
    #[error("Key NotFound in KV store")]
    NotFound,
}

impl KVStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, KVStoreError::NotFound)
    }
}

impl From<io::Error> for KVStoreError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            return KVStoreError::NotFound;
        }
        KVStoreError::IOError {
            message: err.to_string(),
        }
    }
}

/// Walks an error and its sources looking for a not-found condition.
///
/// Recognises [`KfsError`], [`KVStoreError`] and [`io::Error`]; any other
/// error is classified by its message containing `NotFound`.
pub fn is_not_found_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        let found = if let Some(kfs) = err.downcast_ref::<KfsError>() {
            kfs.is_not_found()
        } else if let Some(kv) = err.downcast_ref::<KVStoreError>() {
            kv.is_not_found()
        } else if let Some(io) = err.downcast_ref::<io::Error>() {
            io.kind() == io::ErrorKind::NotFound
                || io
                    .get_ref()
                    .is_some_and(|inner| is_not_found_error(inner))
        } else {
            err.to_string().contains("NotFound")
        };
        if found {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KfsError::IndexOutOfBounds {
            index: 1_000_000,
            max: 999_999,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1000000"));
        assert!(msg.contains("out of bounds"));
    }

    #[test]
    fn test_kv_error_conversion() {
        let kv_err = KVStoreError::IOError {
            message: "disk failure".to_string(),
        };
        let err: KfsError = kv_err.into();

        match err {
            KfsError::Store(KVStoreError::IOError { message }) => {
                assert!(message.contains("disk failure"));
            }
            _ => panic!("Expected Store(IOError)"),
        }
    }

    #[test]
    fn test_not_found_classification() {
        assert!(is_not_found_error(&KfsError::not_found("abc")));
        assert!(is_not_found_error(&KVStoreError::NotFound));
        assert!(is_not_found_error(&io::Error::from(io::ErrorKind::NotFound)));
        assert!(is_not_found_error(&KfsError::Store(KVStoreError::NotFound)));

        assert!(!is_not_found_error(&KVStoreError::IOError {
            message: "boom".to_string()
        }));
        assert!(!is_not_found_error(&KfsError::InvalidReferenceId {
            rid: "zz".to_string()
        }));
        assert!(!is_not_found_error(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
    }

    #[test]
    fn test_not_found_in_source_chain() {
        let wrapped = io::Error::other(KfsError::not_found("abc"));
        assert!(is_not_found_error(&wrapped));
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let io_err: io::Error = KfsError::not_found("abc").into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);

        let io_err: io::Error = KfsError::SBucketIndexOutOfRange { index: 300, max: 256 }.into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
    }
}
