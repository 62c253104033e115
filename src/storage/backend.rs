//! Durable storage backends for the snapshot document

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::errors::{StorageError, StorageResult};
use super::snapshot::Snapshot;

/// Load/save of the whole snapshot as one atomic unit.
pub trait SnapshotBackend: Send + Sync {
    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> StorageResult<Option<Snapshot>>;

    /// Replaces the persisted snapshot.
    fn save(&self, snapshot: &Snapshot) -> StorageResult<()>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Single JSON file on the local filesystem.
///
/// Writes go to `<path>.tmp`, are fsynced, then renamed over the target so a
/// crash mid-write never leaves a truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    temp_path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut temp = path.clone().into_os_string();
        temp.push(".tmp");
        Self {
            path,
            temp_path: PathBuf::from(temp),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

impl SnapshotBackend for FileBackend {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Some(Snapshot::default()));
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::corrupt(&self.path, e.to_string()))
    }

    fn save(&self, snapshot: &Snapshot) -> StorageResult<()> {
        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let content =
            serde_json::to_string_pretty(snapshot).map_err(|e| StorageError::Serialize(e.to_string()))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.temp_path)
            .map_err(|e| StorageError::io(&self.temp_path, e))?;

        file.write_all(content.as_bytes())
            .map_err(|e| StorageError::io(&self.temp_path, e))?;
        file.sync_all().map_err(|e| StorageError::io(&self.temp_path, e))?;

        fs::rename(&self.temp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        // fsync the directory so the rename itself is durable
        if let Some(parent) = self.parent_dir() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory backend that counts writes; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stored: Mutex<Option<Snapshot>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend that already holds a snapshot
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            stored: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Number of successful saves
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Last saved snapshot
    pub fn stored(&self) -> Option<Snapshot> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Makes subsequent saves fail until reset
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl SnapshotBackend for MemoryBackend {
    fn load(&self) -> StorageResult<Option<Snapshot>> {
        Ok(self.stored())
    }

    fn save(&self, snapshot: &Snapshot) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected("memory backend set to fail".into()));
        }
        *self.stored.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
