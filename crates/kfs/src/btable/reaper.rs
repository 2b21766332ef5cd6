use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::BTable;
use crate::domain::Result;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Background thread that closes idle S-buckets.
///
/// Stops when dropped or when the table is dropped.
pub struct IdleReaper {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BTable {
    /// Starts an [`IdleReaper`] sweeping every half `sbucket_idle`.
    ///
    /// Returns `None` when idle closing is off: memory-backed tables, or a
    /// zero `sbucket_idle`.
    pub fn spawn_idle_reaper(self: &Arc<Self>) -> Result<Option<IdleReaper>> {
        if !self.options.backend.is_persistent() || self.options.sbucket_idle.is_zero() {
            return Ok(None);
        }

        let interval = (self.options.sbucket_idle / 2).max(MIN_SWEEP_INTERVAL);
        let table = Arc::downgrade(self);
        let (shutdown, signal) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("kfs-idle-reaper".to_string())
            .spawn(move || run(table, signal, interval))?;

        Ok(Some(IdleReaper {
            shutdown: Some(shutdown),
            handle: Some(handle),
        }))
    }
}

fn run(table: Weak<BTable>, signal: mpsc::Receiver<()>, interval: Duration) {
    loop {
        match signal.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        let Some(table) = table.upgrade() else {
            break;
        };
        if let Err(err) = table.close_idle(Instant::now()) {
            warn!("[kfs] Idle sweep of {} failed: {}", table.path().display(), err);
        }
    }
    debug!("[kfs] Idle reaper stopped");
}

impl Drop for IdleReaper {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
