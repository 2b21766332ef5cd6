//! # File Lock Implementation
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on Windows).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::debug;

/// Default time to wait for another process to release a table.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from table locking
#[derive(Debug)]
pub enum LockError {
    /// Lock file could not be created
    CreateFailed(io::Error),
    /// Table is already locked by another process
    AlreadyLocked { pid: Option<u32>, path: PathBuf },
    /// Failed to write PID to lock file
    WriteFailed(io::Error),
}

impl std::fmt::Display for LockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockError::CreateFailed(e) => write!(f, "Failed to create lock file: {}", e),
            LockError::AlreadyLocked { pid, path } => {
                if let Some(p) = pid {
                    write!(
                        f,
                        "Table already in use by process {} ({})",
                        p,
                        path.display()
                    )
                } else {
                    write!(f, "Table already in use ({})", path.display())
                }
            }
            LockError::WriteFailed(e) => write!(f, "Failed to write PID to lock file: {}", e),
        }
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LockError::CreateFailed(e) | LockError::WriteFailed(e) => Some(e),
            LockError::AlreadyLocked { .. } => None,
        }
    }
}

/// Exclusive lock on a table directory.
///
/// Acquired when a B-table opens, released on drop (RAII).
///
/// # Example
///
/// ```ignore
/// let lock = TableLock::acquire(Path::new("/data/store.kfs"), DEFAULT_LOCK_TIMEOUT)?;
/// // Lock is held until `lock` goes out of scope
/// ```
pub struct TableLock {
    /// The lock file handle (kept open to maintain lock)
    file: File,
    /// Path to the lock file
    path: PathBuf,
    /// PID of this process
    pid: u32,
}

impl TableLock {
    /// Lock file name
    pub const LOCK_FILE: &'static str = "LOCK";

    /// Acquire an exclusive lock on the table directory.
    ///
    /// Retries with exponential backoff until `timeout` expires. The kernel
    /// drops a flock when its holder exits, so a `LOCK` file left by a
    /// crashed process is simply locked again; the file itself is never
    /// removed.
    pub fn acquire(table_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let lock_path = table_dir.join(Self::LOCK_FILE);
        let mut retry_delay = Duration::from_millis(50);

        loop {
            // No truncate: the holder's PID must stay readable until we own the lock.
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)
                .map_err(LockError::CreateFailed)?;

            if file.try_lock_exclusive().is_ok() {
                let pid = std::process::id();
                let mut locked_file = file;
                locked_file.set_len(0).map_err(LockError::WriteFailed)?;
                writeln!(locked_file, "{}", pid).map_err(LockError::WriteFailed)?;
                locked_file.sync_all().map_err(LockError::WriteFailed)?;

                debug!("[kfs] Locked {}", lock_path.display());
                return Ok(Self {
                    file: locked_file,
                    path: lock_path,
                    pid,
                });
            }

            if Instant::now() >= deadline {
                return Err(LockError::AlreadyLocked {
                    pid: Self::read_existing_pid(&lock_path),
                    path: lock_path,
                });
            }

            // Retry with exponential backoff (capped at 500ms)
            drop(file);
            std::thread::sleep(retry_delay);
            retry_delay = (retry_delay * 2).min(Duration::from_millis(500));
        }
    }

    /// Get the PID of the process holding the lock
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Get the path to the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read PID from existing lock file (for error messages)
    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for TableLock {
    fn drop(&mut self) {
        // Release the flock only; the file stays in place.
        #[allow(clippy::incompatible_msrv)]
        let _ = FileExt::unlock(&self.file);
        debug!("[kfs] Unlocked {}", self.path.display());
    }
}
