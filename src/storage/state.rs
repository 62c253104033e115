//! Owned in-memory state with debounced durable flush
//!
//! The in-memory snapshot is authoritative. Every mutation re-arms the flush
//! scheduler; when the window passes quietly the whole snapshot is written
//! through the backend in one piece. Data written since the last flush can
//! be lost on abrupt termination.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, error};

use super::backend::SnapshotBackend;
use super::errors::StorageResult;
use super::scheduler::FlushScheduler;
use super::snapshot::Snapshot;
use crate::observability::Event;

struct Inner {
    state: Mutex<Snapshot>,
    backend: Arc<dyn SnapshotBackend>,
    scheduler: Arc<dyn FlushScheduler>,
    /// Serialises flushes; held while capturing and writing
    io_lock: Mutex<()>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self) -> StorageResult<()> {
        let _io = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.state().clone();

        match self.backend.save(&snapshot) {
            Ok(()) => {
                debug!(
                    event = Event::FlushComplete.as_str(),
                    target_store = %self.backend.describe(),
                    studies = snapshot.studies.len(),
                    records = snapshot.record_count(),
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    event = Event::FlushFailed.as_str(),
                    target_store = %self.backend.describe(),
                    error = %e,
                );
                Err(e)
            }
        }
    }
}

/// Shared handle to the service state. Cheap to clone.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Inner>,
}

impl StateStore {
    /// Creates a store over an explicit initial snapshot.
    pub fn new(
        snapshot: Snapshot,
        backend: Arc<dyn SnapshotBackend>,
        scheduler: Arc<dyn FlushScheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(snapshot),
                backend,
                scheduler,
                io_lock: Mutex::new(()),
            }),
        }
    }

    /// Loads the persisted snapshot (empty if none) and opens a store over it.
    pub fn open(
        backend: Arc<dyn SnapshotBackend>,
        scheduler: Arc<dyn FlushScheduler>,
    ) -> StorageResult<Self> {
        let snapshot = backend.load()?;
        let loaded = snapshot.is_some();
        let snapshot = snapshot.unwrap_or_default();

        tracing::info!(
            event = Event::SnapshotLoaded.as_str(),
            source = %backend.describe(),
            existing = loaded,
            studies = snapshot.studies.len(),
            records = snapshot.record_count(),
        );

        Ok(Self::new(snapshot, backend, scheduler))
    }

    /// Runs `f` against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&self.inner.state())
    }

    /// Clones the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.state().clone()
    }

    /// Mutates the state and schedules a flush.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        let result = f(&mut self.inner.state());
        self.schedule_flush();
        result
    }

    /// Mutates the state, scheduling a flush only when `f` succeeds.
    ///
    /// `f` must leave the state untouched when it fails.
    pub fn try_mutate<R, E>(&self, f: impl FnOnce(&mut Snapshot) -> Result<R, E>) -> Result<R, E> {
        let result = f(&mut self.inner.state());
        if result.is_ok() {
            self.schedule_flush();
        }
        result
    }

    /// (Re)arms the debounced flush.
    pub fn schedule_flush(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.arm(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                // Failure is logged inside; the next mutation re-arms.
                let _ = inner.flush();
            }
        }));
    }

    /// Cancels any pending flush and writes the current state immediately.
    pub fn flush_now(&self) -> StorageResult<()> {
        self.inner.scheduler.cancel();
        self.inner.flush()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("backend", &self.inner.backend.describe())
            .finish()
    }
}
