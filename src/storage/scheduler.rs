//! Flush schedulers
//!
//! A scheduler holds at most one pending flush job. Arming replaces (and
//! cancels) whatever was pending, so a burst of mutations coalesces into one
//! flush that runs after the burst goes quiet.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::errors::{StorageError, StorageResult};

/// Deferred flush work handed to a scheduler.
pub type FlushJob = Box<dyn FnOnce() + Send + 'static>;

/// Arm/cancel interface for the debounced flush.
pub trait FlushScheduler: Send + Sync {
    /// Replaces any pending job with `job` and restarts the window.
    fn arm(&self, job: FlushJob);

    /// Drops the pending job, if any.
    fn cancel(&self);
}

/// Scheduler whose pending job only runs when `fire` is called.
#[derive(Default)]
pub struct ManualScheduler {
    pending: Mutex<Option<FlushJob>>,
    arms: AtomicUsize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the pending job. Returns false if nothing was armed.
    pub fn fire(&self) -> bool {
        let job = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Total number of `arm` calls
    pub fn arm_count(&self) -> usize {
        self.arms.load(Ordering::SeqCst)
    }
}

impl FlushScheduler for ManualScheduler {
    fn arm(&self, job: FlushJob) {
        self.arms.fetch_add(1, Ordering::SeqCst);
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(job);
    }

    fn cancel(&self) {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

/// Timer-based debouncer on a tokio runtime.
///
/// Each `arm` aborts the sleeping task and spawns a new one; the job runs on
/// the blocking pool once `window` elapses without another `arm`.
pub struct DebouncedScheduler {
    window: Duration,
    runtime: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebouncedScheduler {
    pub fn new(window: Duration, runtime: Handle) -> Self {
        Self {
            window,
            runtime,
            pending: Mutex::new(None),
        }
    }

    /// Uses the runtime of the calling context.
    pub fn from_current(window: Duration) -> StorageResult<Self> {
        let runtime = Handle::try_current().map_err(|_| StorageError::NoRuntime)?;
        Ok(Self::new(window, runtime))
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl FlushScheduler for DebouncedScheduler {
    fn arm(&self, job: FlushJob) {
        let window = self.window;
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Err(e) = tokio::task::spawn_blocking(job).await {
                tracing::error!(error = %e, "flush task panicked");
            }
        }));
    }

    fn cancel(&self) {
        if let Some(previous) = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take() {
            previous.abort();
        }
    }
}
