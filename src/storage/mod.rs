//! Durable state subsystem
//!
//! All studies and records live in one in-memory [`Snapshot`] owned by a
//! [`StateStore`]. Mutations are applied in memory first and a debounced
//! flush writes the whole snapshot through a [`SnapshotBackend`].
//!
//! # Guarantees
//!
//! - In-memory state is authoritative; a failed flush never fails a mutation
//! - A burst of mutations inside the debounce window produces one write
//! - File writes are atomic (temp file, fsync, rename)
//! - A missing file starts empty; a corrupt file fails startup

mod backend;
mod errors;
mod scheduler;
mod snapshot;
mod state;

pub use backend::{FileBackend, MemoryBackend, SnapshotBackend};
pub use errors::{StorageError, StorageResult};
pub use scheduler::{DebouncedScheduler, FlushJob, FlushScheduler, ManualScheduler};
pub use snapshot::Snapshot;
pub use state::StateStore;
