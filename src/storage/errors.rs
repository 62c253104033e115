//! Storage error types
//!
//! Persistence errors never fail the mutation that scheduled the flush; they
//! are logged and the in-memory state stays authoritative. Load errors at
//! startup are fatal to boot.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Snapshot file exists but cannot be parsed
    #[error("Corrupt snapshot at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(String),

    #[error("Debounced flush requires a running tokio runtime")]
    NoRuntime,

    #[error("Backend rejected write: {0}")]
    Rejected(String),
}

impl StorageError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn corrupt(path: &Path, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = StorageError::io(Path::new("/tmp/ecrf-data.json"), io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(err.to_string().contains("/tmp/ecrf-data.json"));
    }
}
